//! Operation and resource transformation for legacy model versions
//!
//! This module holds the runtime side of the engine: the per-call
//! [`TransformationContext`], the [`TransformedOperation`] outcome, resource
//! transformation, composite handling and the [`TransformerRegistry`] that
//! dispatches by subsystem and version. The declarative side lives in
//! [`description`].

pub mod composite;
pub mod context;
pub mod description;
pub mod operation;
pub mod path_registry;
pub mod registry;
pub mod resource;

pub use context::{
    ImmutableResourcesGuard, ModelVersion, ProcessType, RunningMode, TargetType, TransformationContext,
    TransformationTarget, IGNORED_RESOURCES_SUPPORTED,
};
pub use operation::{
    ChainedTransformedOperation, DefaultOperationTransformer, DiscardOperationTransformer, OperationRejectionPolicy,
    OperationResultTransformer, OperationTransformer, RejectOperationTransformer, RenameOperationTransformer,
    TransformedOperation,
};
pub use path_registry::PathAddressConfigRegistry;
pub use registry::{TransformerRegistry, TransformerTree};
pub use resource::{
    DefaultResourceTransformer, DiscardUndefinedAttributesTransformer, ResourceTransformationContext,
    ResourceTransformer,
};
