//! Transformation context
//!
//! One [`TransformationContext`] is created per top-level transformation call
//! and threaded through every rule, checker and transformer. It carries the
//! [`TransformationTarget`] being transformed for, read access to the source
//! model and its registrations, an attachment map for passing data between
//! chained steps, and the immutable-resources flag.
//!
//! The context is `!Sync`: callers serialize transformations
//! and use one context per call.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ValueError;
use crate::model::{ManagementModel, PathAddress, ResourceRegistration, ResourceView, Value};

// ============================================================================
// Versions and target
// ============================================================================

/// `major.minor.micro` model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl ModelVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for ModelVersion {
    type Err = ValueError;

    /// Parse `major[.minor[.micro]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidNumber {
            kind: "model version",
            literal: s.to_string(),
        };
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major] => Ok(Self::new(*major, 0, 0)),
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, micro] => Ok(Self::new(*major, *minor, *micro)),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for ModelVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // YAML reads `1.4` as a float, so accept any scalar
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a model version, got {:?}",
                    other
                )))
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Core model version from which targets manage ignored resources
pub const IGNORED_RESOURCES_SUPPORTED: ModelVersion = ModelVersion::new(1, 4, 0);

/// Kind of process being transformed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Server,
    #[default]
    Host,
    Domain,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Server => write!(f, "server"),
            TargetType::Host => write!(f, "host"),
            TargetType::Domain => write!(f, "domain"),
        }
    }
}

/// Kind of the process running the transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessType {
    #[default]
    HostController,
    DomainServer,
    StandaloneServer,
    EmbeddedServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunningMode {
    #[default]
    Normal,
    AdminOnly,
}

/// The legacy participant a transformation is performed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationTarget {
    pub host_name: String,

    pub core_version: ModelVersion,

    #[serde(default)]
    pub subsystem_versions: BTreeMap<String, ModelVersion>,

    #[serde(default, rename = "type")]
    pub target_type: TargetType,
}

impl TransformationTarget {
    pub fn new(host_name: impl Into<String>, core_version: ModelVersion, target_type: TargetType) -> Self {
        Self {
            host_name: host_name.into(),
            core_version,
            subsystem_versions: BTreeMap::new(),
            target_type,
        }
    }

    pub fn with_subsystem(mut self, name: impl Into<String>, version: ModelVersion) -> Self {
        self.subsystem_versions.insert(name.into(), version);
        self
    }

    pub fn subsystem_version(&self, name: &str) -> Option<ModelVersion> {
        self.subsystem_versions.get(name).copied()
    }

    /// Whether the target reports which resources it ignores
    ///
    /// Older targets may silently ignore resources, so transformation cannot
    /// know whether a resource will be used.
    pub fn is_ignored_resource_list_management_supported(&self) -> bool {
        self.core_version >= IGNORED_RESOURCES_SUPPORTED
    }
}

// ============================================================================
// Context
// ============================================================================

/// Per-call transformation state
#[derive(Debug)]
pub struct TransformationContext {
    target: TransformationTarget,
    process_type: ProcessType,
    running_mode: RunningMode,
    model: Arc<ManagementModel>,
    current_address: RefCell<PathAddress>,
    attachments: RefCell<HashMap<String, Value>>,
    immutable_resources: Cell<bool>,
    warnings: RefCell<Vec<String>>,
}

impl TransformationContext {
    pub fn new(target: TransformationTarget, model: Arc<ManagementModel>) -> Self {
        Self {
            target,
            process_type: ProcessType::default(),
            running_mode: RunningMode::default(),
            model,
            current_address: RefCell::new(PathAddress::empty()),
            attachments: RefCell::new(HashMap::new()),
            immutable_resources: Cell::new(false),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn with_process_type(mut self, process_type: ProcessType) -> Self {
        self.process_type = process_type;
        self
    }

    pub fn with_running_mode(mut self, running_mode: RunningMode) -> Self {
        self.running_mode = running_mode;
        self
    }

    pub fn target(&self) -> &TransformationTarget {
        &self.target
    }

    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }

    pub fn running_mode(&self) -> RunningMode {
        self.running_mode
    }

    pub fn model(&self) -> &ManagementModel {
        &self.model
    }

    /// Address of the operation or resource currently being transformed
    pub fn current_address(&self) -> PathAddress {
        self.current_address.borrow().clone()
    }

    pub(crate) fn set_current_address(&self, address: PathAddress) -> PathAddress {
        self.current_address.replace(address)
    }

    // ------------------------------------------------------------------
    // Resource reads
    // ------------------------------------------------------------------

    /// Read the resource at `relative`, resolved against the current address
    pub fn read_resource(&self, relative: &PathAddress) -> Option<ResourceView> {
        let absolute = self.current_address.borrow().append_address(relative);
        self.read_resource_from_root(&absolute)
    }

    /// Read the resource at the absolute `address`
    ///
    /// While resources are protected the returned view is read-only.
    pub fn read_resource_from_root(&self, address: &PathAddress) -> Option<ResourceView> {
        self.model.read_resource(address).map(|resource| {
            ResourceView::new(
                address.clone(),
                resource.clone(),
                self.immutable_resources.get(),
            )
        })
    }

    pub fn resource_registration(&self, relative: &PathAddress) -> Option<&ResourceRegistration> {
        let absolute = self.current_address.borrow().append_address(relative);
        self.model.registration(&absolute)
    }

    pub fn resource_registration_from_root(&self, address: &PathAddress) -> Option<&ResourceRegistration> {
        self.model.registration(address)
    }

    // ------------------------------------------------------------------
    // Immutable resources
    // ------------------------------------------------------------------

    pub fn is_immutable_resources(&self) -> bool {
        self.immutable_resources.get()
    }

    /// Protect every resource read through this context until the guard drops
    pub fn protect_resources(&self) -> ImmutableResourcesGuard<'_> {
        let previous = self.immutable_resources.replace(true);
        ImmutableResourcesGuard {
            context: self,
            previous,
        }
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Attach `value` under `key`, returning the previous attachment
    pub fn attach(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.attachments.borrow_mut().insert(key.into(), value)
    }

    pub fn attachment(&self, key: &str) -> Option<Value> {
        self.attachments.borrow().get(key).cloned()
    }

    pub fn detach(&self, key: &str) -> Option<Value> {
        self.attachments.borrow_mut().remove(key)
    }

    // ------------------------------------------------------------------
    // Transformers logger
    // ------------------------------------------------------------------

    /// Log a transformation warning and keep it for the caller
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(host = %self.target.host_name, "{}", message);
        self.warnings.borrow_mut().push(message);
    }

    /// Warnings collected so far
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

/// Restores the previous immutable-resources flag when dropped
#[must_use = "resources are only protected while the guard is alive"]
pub struct ImmutableResourcesGuard<'a> {
    context: &'a TransformationContext,
    previous: bool,
}

impl Drop for ImmutableResourcesGuard<'_> {
    fn drop(&mut self) {
        self.context.immutable_resources.set(self.previous);
    }
}
