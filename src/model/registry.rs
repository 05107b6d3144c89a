//! Resource registrations
//!
//! Attribute and operation metadata for each registered resource type, the
//! part of the management kernel's registry that transformation reads
//! (attribute defaults and operation parameter definitions).

use serde::{Deserialize, Serialize};

use crate::model::{PathAddress, Resource, Value};
use crate::transform::path_registry::PathAddressConfigRegistry;

/// Metadata for one attribute or operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,

    /// Documented default value
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Default value, undefined when none is documented
    pub fn default_or_undefined(&self) -> Value {
        self.default_value.clone().unwrap_or_default()
    }
}

/// Metadata for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<AttributeDefinition>,
}

impl OperationDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: AttributeDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&AttributeDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Attributes and operations of one resource type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRegistration {
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,

    #[serde(default)]
    pub operations: Vec<OperationDefinition>,
}

impl ResourceRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_operation(mut self, operation: OperationDefinition) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.iter().find(|o| o.name == name)
    }
}

/// The source-side model a transformation reads from
///
/// Holds the root resource and the registrations keyed by (possibly
/// wildcarded) address.
#[derive(Debug, Clone, Default)]
pub struct ManagementModel {
    root: Resource,
    registrations: PathAddressConfigRegistry<ResourceRegistration>,
}

impl ManagementModel {
    pub fn new(root: Resource) -> Self {
        Self {
            root,
            registrations: PathAddressConfigRegistry::new(),
        }
    }

    pub fn root(&self) -> &Resource {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Resource {
        &mut self.root
    }

    /// Register metadata for the resource type at `address`
    pub fn register(&mut self, address: &PathAddress, registration: ResourceRegistration) {
        self.registrations.register(address, registration);
    }

    /// Builder form of [`ManagementModel::register`]
    pub fn with_registration(mut self, address: &PathAddress, registration: ResourceRegistration) -> Self {
        self.register(address, registration);
        self
    }

    pub fn read_resource(&self, address: &PathAddress) -> Option<&Resource> {
        self.root.navigate(address)
    }

    pub fn registration(&self, address: &PathAddress) -> Option<&ResourceRegistration> {
        self.registrations.get_config(address)
    }
}
