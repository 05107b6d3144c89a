//! Declarative transformation descriptions
//!
//! Subsystems describe how their resources and operations change for older
//! model versions with the builders in this module. Attribute-level policy
//! is expressed as discard checkers, reject checkers, converters and
//! renames; resource-level policy as child handling and operation overrides.
//!
//! # Modules
//!
//! - [`checker`]: expression detection and nested-value requirement checkers
//! - [`discard`], [`reject`], [`convert`]: the three attribute policies
//! - [`checkers_and_converter`]: one value acting as all three
//! - [`attribute`]: per-attribute descriptions and their builder
//! - [`rule`]: rules applying descriptions to operations and resources
//! - [`operation_override`]: per-operation overrides
//! - [`builder`]: the resource description tree
//! - [`chained`]: multi-hop version chains

pub mod attribute;
pub mod builder;
pub mod chained;
pub mod checker;
pub mod checkers_and_converter;
pub mod convert;
pub mod discard;
pub mod operation_override;
pub mod reject;
pub mod rule;

pub use attribute::{AttributeTransformationDescription, AttributeTransformationDescriptionBuilder};
pub use builder::{
    BasicPathAddressTransformer, DynamicDiscardPolicy, PathAddressTransformer, ResourceDescription,
    ResourceTransformationDescriptionBuilder, TransformationDescription,
};
pub use chained::ChainedTransformationDescriptionBuilder;
pub use checkers_and_converter::DefaultCheckersAndConverter;
pub use convert::{AttributeConverter, ConvertFn, DefaultValueConverter, HardcodedValueConverter};
pub use discard::{
    DiscardAlways, DiscardAttributeChecker, DiscardAttributeValueChecker, DiscardDefaultValue, DiscardFn,
    DiscardNever, DiscardUndefined,
};
pub use operation_override::{DiscardPolicy, OperationTransformationOverrideBuilder};
pub use reject::{
    ListRejectAttributeChecker, ObjectFieldsRejectAttributeChecker, RejectAttributeChecker, RejectDefined,
    RejectExpressions, RejectFn, RejectUndefined, RejectValue, RejectedAttributes,
};
pub use rule::{AttributeTransformationRule, RuleChain, TransformationRule};
