//! Configuration management for dmr-transform
//!
//! Handles loading and validating configuration from YAML files. A config
//! declares the legacy target, the attribute and operation metadata of the
//! source model, and the subsystem transformers. Transformer declarations
//! go through the same description builders subsystem code uses.
//!
//! # Example
//!
//! ```yaml
//! target:
//!   host_name: slave
//!   core_version: "1.3.0"
//!   subsystem_versions:
//!     foo: "1.1.0"
//!
//! subsystems:
//!   - name: foo
//!     versions:
//!       - version: "1.1.0"
//!         resource:
//!           attributes:
//!             - names: [feature-x]
//!               discard: undefined
//!               reject: [defined]
//!           children:
//!             - element: "new-thing=*"
//!               policy: reject-and-warn
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::BuilderError;
use crate::model::{ManagementModel, PathAddress, PathElement, Resource, ResourceRegistration, Value};
use crate::transform::description::{
    AttributeTransformationDescriptionBuilder, ChainedTransformationDescriptionBuilder, DefaultValueConverter,
    DiscardAlways, DiscardAttributeValueChecker, DiscardDefaultValue, DiscardNever, DiscardPolicy, DiscardUndefined,
    HardcodedValueConverter, OperationTransformationOverrideBuilder, RejectDefined, RejectExpressions,
    RejectUndefined, RejectValue, ResourceTransformationDescriptionBuilder,
};
use crate::transform::{
    DiscardUndefinedAttributesTransformer, ModelVersion, TargetType, TransformationTarget, TransformerRegistry,
};

pub use crate::error::ConfigError;

/// Host name used when neither the config nor the CLI names one
pub const DEFAULT_HOST_NAME: &str = "legacy-host";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Legacy target to transform for
    #[serde(default)]
    pub target: Option<TransformationTarget>,

    /// Attribute and operation metadata of the source model
    #[serde(default)]
    pub registrations: Vec<RegistrationConfig>,

    /// Subsystem transformer declarations
    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,
}

/// Metadata registered at one (possibly wildcarded) address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub address: PathAddress,

    #[serde(flatten)]
    pub registration: ResourceRegistration,
}

/// Transformers of one subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub name: String,

    /// Single-hop descriptions, one per legacy version
    #[serde(default)]
    pub versions: Vec<VersionConfig>,

    /// Multi-hop description
    #[serde(default)]
    pub chain: Option<ChainConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    pub version: ModelVersion,

    #[serde(default)]
    pub resource: ResourceConfig,
}

/// Hops from the current version down, and the versions to register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub current_version: ModelVersion,

    pub targets: Vec<ModelVersion>,

    pub hops: Vec<HopConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopConfig {
    pub from: ModelVersion,

    pub to: ModelVersion,

    #[serde(default)]
    pub resource: ResourceConfig,
}

/// Description of one resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub attributes: Vec<AttributeRuleConfig>,

    pub discard_operations: Vec<String>,

    pub reject_operations: Vec<String>,

    pub operations: Vec<OperationOverrideConfig>,

    pub children: Vec<ChildConfig>,

    /// Attributes newer than the target; undefined values are dropped and
    /// defined ones fail or warn depending on the target
    pub discard_undefined_attributes: Vec<String>,
}

/// Built-in discard checkers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardKind {
    Always,
    Undefined,
    Never,
    DefaultValue,
}

/// Built-in reject checkers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectKind {
    Defined,
    Undefined,
    Expressions,
}

/// Rules shared by a group of attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeRuleConfig {
    pub names: Vec<String>,

    pub discard: Option<DiscardKind>,

    /// Discard when the value equals one of these
    pub discard_values: Vec<Value>,

    pub reject: Vec<RejectKind>,

    /// Reject when the value equals one of these
    pub reject_values: Vec<Value>,

    /// Fill undefined values with the registered default
    pub fill_default: bool,

    /// Always send this value
    pub hardcoded: Option<Value>,

    /// Name on the target; only valid for a single attribute
    pub rename: Option<String>,
}

/// Dedicated handling of one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOverrideConfig {
    pub name: String,

    #[serde(default)]
    pub policy: DiscardPolicy,

    /// Also apply the resource's attribute rules
    #[serde(default)]
    pub inherit: bool,

    #[serde(default)]
    pub rename: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeRuleConfig>,
}

/// Handling of one child resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildConfig {
    pub element: PathElement,

    #[serde(default)]
    pub policy: DiscardPolicy,

    /// Target element; a wildcard keeps the source value
    #[serde(default)]
    pub redirect: Option<PathElement>,

    #[serde(default)]
    pub resource: ResourceConfig,
}

// ============================================================================
// Building descriptions
// ============================================================================

impl AttributeRuleConfig {
    fn apply(&self, builder: &mut AttributeTransformationDescriptionBuilder) -> Result<(), BuilderError> {
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        match self.discard {
            Some(DiscardKind::Always) => {
                builder.set_discard(DiscardAlways, &names);
            }
            Some(DiscardKind::Undefined) => {
                builder.set_discard(DiscardUndefined, &names);
            }
            Some(DiscardKind::Never) => {
                builder.set_discard(DiscardNever, &names);
            }
            Some(DiscardKind::DefaultValue) => {
                builder.set_discard(DiscardDefaultValue, &names);
            }
            None => {}
        }
        if !self.discard_values.is_empty() {
            builder.set_discard(DiscardAttributeValueChecker::new(self.discard_values.clone()), &names);
        }
        for reject in &self.reject {
            match reject {
                RejectKind::Defined => builder.add_reject_check(RejectDefined::new(), &names),
                RejectKind::Undefined => builder.add_reject_check(RejectUndefined::new(), &names),
                RejectKind::Expressions => builder.add_reject_check(RejectExpressions::new(), &names),
            };
        }
        if !self.reject_values.is_empty() {
            builder.add_reject_check(RejectValue::new(self.reject_values.clone()), &names);
        }
        if self.fill_default {
            builder.set_value_converter(DefaultValueConverter, &names);
        }
        if let Some(value) = &self.hardcoded {
            builder.set_value_converter(HardcodedValueConverter::new(value.clone()), &names);
        }
        if let Some(new_name) = &self.rename {
            let [name] = names.as_slice() else {
                return Err(BuilderError::Invalid(format!(
                    "rename '{}' needs exactly one attribute, got {:?}",
                    new_name, names
                )));
            };
            builder.add_rename(name, new_name)?;
        }
        Ok(())
    }
}

impl OperationOverrideConfig {
    fn apply(&self, builder: &mut OperationTransformationOverrideBuilder) -> Result<(), BuilderError> {
        match self.policy {
            DiscardPolicy::Never => {}
            DiscardPolicy::Silent => {
                builder.set_discard();
            }
            DiscardPolicy::RejectAndWarn => {
                builder.set_reject();
            }
        }
        if self.inherit {
            builder.inherit_resource_attribute_definitions();
        }
        if let Some(new_name) = &self.rename {
            builder.rename_to(new_name.as_str());
        }
        for rule in &self.attributes {
            rule.apply(builder.attribute_builder())?;
        }
        Ok(())
    }
}

impl ResourceConfig {
    /// Declare this resource on `builder`
    pub fn apply(&self, builder: &mut ResourceTransformationDescriptionBuilder) -> Result<(), BuilderError> {
        for rule in &self.attributes {
            rule.apply(builder.attribute_builder())?;
        }
        let discarded: Vec<&str> = self.discard_operations.iter().map(String::as_str).collect();
        let rejected: Vec<&str> = self.reject_operations.iter().map(String::as_str).collect();
        builder.discard_operations(&discarded).reject_operations(&rejected);
        for operation in &self.operations {
            operation.apply(builder.add_operation_transformation_override(&operation.name)?)?;
        }
        if !self.discard_undefined_attributes.is_empty() {
            let attributes: Vec<&str> = self.discard_undefined_attributes.iter().map(String::as_str).collect();
            builder.set_custom_resource_transformer(DiscardUndefinedAttributesTransformer::new(&attributes));
        }
        for child in &self.children {
            match (child.policy, &child.redirect) {
                (DiscardPolicy::Silent, _) => {
                    builder.discard_child_resource(child.element.clone())?;
                }
                (DiscardPolicy::RejectAndWarn, _) => {
                    builder.reject_child_resource(child.element.clone())?;
                }
                (DiscardPolicy::Never, Some(redirect)) => {
                    let child_builder = builder.add_child_redirection(child.element.clone(), redirect.clone())?;
                    child.resource.apply(child_builder)?;
                }
                (DiscardPolicy::Never, None) => {
                    let child_builder = builder.add_child_resource(child.element.clone())?;
                    child.resource.apply(child_builder)?;
                }
            }
        }
        Ok(())
    }
}

impl SubsystemConfig {
    fn register(&self, registry: &mut TransformerRegistry) -> Result<(), ConfigError> {
        for version in &self.versions {
            let mut builder = ResourceTransformationDescriptionBuilder::for_subsystem(&self.name);
            version.resource.apply(&mut builder)?;
            registry.register_subsystem(&self.name, version.version, builder.build());
        }
        if let Some(chain) = &self.chain {
            let mut chained = ChainedTransformationDescriptionBuilder::new(self.name.clone(), chain.current_version);
            for hop in &chain.hops {
                hop.resource.apply(chained.create_builder(hop.from, hop.to))?;
            }
            registry.register_chained(chained, &chain.targets)?;
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or a declared
    /// transformer cannot be built
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for subsystem in &self.subsystems {
            if subsystem.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Subsystem name must not be empty".to_string(),
                ));
            }
            if !seen.insert(subsystem.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Subsystem '{}' is declared more than once",
                    subsystem.name
                )));
            }
            if subsystem.versions.is_empty() && subsystem.chain.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "Subsystem '{}' declares no versions",
                    subsystem.name
                )));
            }
        }
        // builder errors surface here rather than at first use
        self.build_registry()?;
        Ok(())
    }

    /// Build the transformer registry from the subsystem declarations
    pub fn build_registry(&self) -> Result<TransformerRegistry, ConfigError> {
        let mut registry = TransformerRegistry::new();
        for subsystem in &self.subsystems {
            subsystem.register(&mut registry)?;
        }
        Ok(registry)
    }

    /// Source model over `root` with the declared registrations
    pub fn build_model(&self, root: Resource) -> ManagementModel {
        self.registrations
            .iter()
            .fold(ManagementModel::new(root), |model, registration| {
                model.with_registration(&registration.address, registration.registration.clone())
            })
    }

    /// Target from the config with command-line overrides applied
    pub fn resolve_target(
        &self,
        host: Option<&str>,
        core_version: Option<ModelVersion>,
        subsystem_versions: &[(String, ModelVersion)],
    ) -> Result<TransformationTarget, ConfigError> {
        let mut target = match (&self.target, core_version) {
            (Some(target), _) => target.clone(),
            (None, Some(version)) => {
                TransformationTarget::new(host.unwrap_or(DEFAULT_HOST_NAME), version, TargetType::Host)
            }
            (None, None) => {
                return Err(ConfigError::ValidationError(
                    "No target: declare `target` in the config or pass --core-version".to_string(),
                ))
            }
        };
        if let Some(host) = host {
            target.host_name = host.to_string();
        }
        if let Some(version) = core_version {
            target.core_version = version;
        }
        for (name, version) in subsystem_versions {
            target.subsystem_versions.insert(name.clone(), *version);
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::{create_operation, ADD};
    use crate::transform::{OperationRejectionPolicy, TransformationContext};
    use std::sync::Arc;

    const CONFIG: &str = r#"
target:
  host_name: slave
  core_version: "1.3.0"
  subsystem_versions:
    foo: "1.1.0"

registrations:
  - address: /subsystem=foo
    attributes:
      - name: size
        default: 10

subsystems:
  - name: foo
    versions:
      - version: "1.1.0"
        resource:
          attributes:
            - names: [feature-x]
              discard: undefined
              reject: [defined]
            - names: [size]
              fill_default: true
            - names: [timeout]
              rename: legacy-timeout
          reject_operations: [new-op]
          children:
            - element: "new-thing=*"
              policy: reject-and-warn
            - element: "renamed=*"
              redirect: "original=*"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.target.is_none());
        assert!(config.subsystems.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_and_build() {
        let config = Config::from_yaml(CONFIG).unwrap();
        let target = config.target.clone().unwrap();
        assert_eq!(target.host_name, "slave");
        assert_eq!(target.subsystem_version("foo"), Some(ModelVersion::new(1, 1, 0)));

        let registry = config.build_registry().unwrap();
        assert!(registry.is_registered("foo", ModelVersion::new(1, 1, 0)));

        let address: PathAddress = "/subsystem=foo".parse().unwrap();
        let model = config.build_model(Resource::new());
        assert!(model.registration(&address).is_some());

        let context = TransformationContext::new(target, Arc::new(model));
        let op = create_operation(ADD, &address).with("timeout", 5);
        let transformed = registry.transform_operation(&context, op).unwrap();
        let sent = transformed.transformed_operation().unwrap();
        assert_eq!(sent.get("legacy-timeout"), Some(&Value::Int(5)));
        assert_eq!(sent.get("size"), Some(&Value::Int(10)));
        assert!(!sent.has("feature-x"));
        assert!(!transformed.reject_operation(&Value::Undefined));
    }

    #[test]
    fn test_validation_rejects_duplicate_subsystem() {
        let yaml = r#"
subsystems:
  - name: foo
    versions: [{version: "1.0.0"}]
  - name: foo
    versions: [{version: "1.1.0"}]
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_surfaces_builder_errors() {
        let yaml = r#"
subsystems:
  - name: foo
    versions:
      - version: "1.0.0"
        resource:
          children:
            - element: "bar=*"
            - element: "bar=*"
              policy: silent
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Build(BuilderError::DuplicateChild { .. })));
    }

    #[test]
    fn test_rename_needs_single_attribute() {
        let yaml = r#"
subsystems:
  - name: foo
    versions:
      - version: "1.0.0"
        resource:
          attributes:
            - names: [a, b]
              rename: c
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Build(BuilderError::Invalid(_)))));
    }

    #[test]
    fn test_chain_config() {
        let yaml = r#"
subsystems:
  - name: foo
    chain:
      current_version: "3.0.0"
      targets: ["1.0.0"]
      hops:
        - from: "3.0.0"
          to: "2.0.0"
        - from: "2.0.0"
          to: "1.0.0"
"#;
        let registry = Config::from_yaml(yaml).unwrap().build_registry().unwrap();
        assert!(registry.is_registered("foo", ModelVersion::new(1, 0, 0)));
        assert!(!registry.is_registered("foo", ModelVersion::new(2, 0, 0)));

        let broken = yaml.replace("targets: [\"1.0.0\"]", "targets: [\"0.5.0\"]");
        assert!(matches!(
            Config::from_yaml(&broken),
            Err(ConfigError::Build(BuilderError::BrokenChain { .. }))
        ));
    }

    #[test]
    fn test_resolve_target_overrides() {
        let config = Config::from_yaml(CONFIG).unwrap();
        let target = config
            .resolve_target(
                Some("other"),
                Some(ModelVersion::new(1, 4, 0)),
                &[("bar".to_string(), ModelVersion::new(2, 0, 0))],
            )
            .unwrap();
        assert_eq!(target.host_name, "other");
        assert_eq!(target.core_version, ModelVersion::new(1, 4, 0));
        assert_eq!(target.subsystem_version("foo"), Some(ModelVersion::new(1, 1, 0)));
        assert_eq!(target.subsystem_version("bar"), Some(ModelVersion::new(2, 0, 0)));

        let empty = Config::default();
        assert!(empty.resolve_target(None, None, &[]).is_err());
        let target = empty.resolve_target(None, Some(ModelVersion::new(1, 2, 0)), &[]).unwrap();
        assert_eq!(target.host_name, DEFAULT_HOST_NAME);
    }
}
