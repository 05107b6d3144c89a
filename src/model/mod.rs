//! Management model types
//!
//! - `value`: the dynamic value tree
//! - `address`: path elements and addresses
//! - `operation`: operation and response helpers
//! - `resource`: the resource tree and read-only views over it
//! - `registry`: attribute and operation metadata per resource type

pub mod address;
pub mod operation;
pub mod registry;
pub mod resource;
pub mod value;

pub use address::{PathAddress, PathElement, WILDCARD_VALUE};
pub use registry::{
    AttributeDefinition, ManagementModel, OperationDefinition, ResourceRegistration,
};
pub use resource::{Resource, ResourceView};
pub use value::{ModelType, ObjectMap, ProtectedValue, Value};
