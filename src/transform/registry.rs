//! Transformer registry
//!
//! The [`TransformerRegistry`] maps a subsystem name and a legacy model
//! version to the ordered hops that transform the current model down to that
//! version. Each hop is a [`TransformerTree`]: the description tree of one
//! builder compiled into a [`PathAddressConfigRegistry`] so lookups prefer a
//! literal path element over a wildcard.
//!
//! Operations and resources outside any registered subsystem, or for a
//! target that runs the current version of a subsystem, pass through
//! unchanged.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = TransformerRegistry::new();
//! registry.register_subsystem("foo", ModelVersion::new(1, 1, 0), builder.build());
//!
//! let context = TransformationContext::new(target, model);
//! let transformed = registry.transform_operation(&context, operation)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{BuildResult, TransformResult};
use crate::model::operation::{self as ops, COMPOSITE, OP_ADDR, SUBSYSTEM};
use crate::model::{PathAddress, Resource, Value};
use crate::transform::composite::transform_composite;
use crate::transform::context::{ModelVersion, TransformationContext};
use crate::transform::description::builder::{ResourceDescription, TransformationDescription};
use crate::transform::description::chained::ChainedTransformationDescriptionBuilder;
use crate::transform::description::operation_override::DiscardPolicy;
use crate::transform::operation::{
    DefaultOperationTransformer, OperationTransformer, RejectOperationTransformer, TransformedOperation,
};
use crate::transform::path_registry::PathAddressConfigRegistry;
use crate::transform::resource::{warn_not_sent, ResourceTransformationContext};

// ============================================================================
// TransformerTree
// ============================================================================

/// One hop of a subsystem's transformation, indexed by address
#[derive(Debug)]
pub struct TransformerTree {
    subsystem: String,
    descriptions: PathAddressConfigRegistry<Arc<ResourceDescription>>,
}

impl TransformerTree {
    pub fn new(description: TransformationDescription) -> Self {
        let mut descriptions = PathAddressConfigRegistry::new();
        for (address, node) in description.flatten(&PathAddress::empty()) {
            descriptions.register(&address, node);
        }
        Self {
            subsystem: description.element().value().to_string(),
            descriptions,
        }
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    /// Description of the resource at `address`
    pub fn description(&self, address: &PathAddress) -> Option<&Arc<ResourceDescription>> {
        self.descriptions.get_config(address)
    }

    /// Address `address` has on the target
    ///
    /// Each described element goes through its redirection; the first
    /// undescribed element and everything below it are kept as they are.
    pub fn transform_address(&self, address: &PathAddress) -> PathAddress {
        let mut node = &self.descriptions;
        let mut transformed = PathAddress::empty();
        for (depth, element) in address.iter().enumerate() {
            let Some(child) = node.child(element) else {
                return transformed.append_address(&address.suffix(depth));
            };
            node = child;
            transformed = match child.config() {
                Some(description) => description.transform_element(element, &transformed),
                None => transformed.append(element.clone()),
            };
        }
        transformed
    }

    /// Transform `operation` against the resource at `address`
    ///
    /// A discarding or rejecting ancestor decides for its whole subtree.
    pub fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        let along = self.descriptions.configs_along(address);
        for (depth, description) in &along {
            let prefix = address.sub_address(0, *depth);
            match description.discard_policy(context, &prefix) {
                DiscardPolicy::Never => {}
                DiscardPolicy::Silent => {
                    debug!(address = %address, discarded_at = %prefix, "Discarding operation below discarded resource");
                    return Ok(TransformedOperation::discarded());
                }
                DiscardPolicy::RejectAndWarn => {
                    debug!(address = %address, rejected_at = %prefix, "Rejecting operation below rejected resource");
                    return RejectOperationTransformer::new().transform_operation(context, address, operation);
                }
            }
        }

        let transformer: Arc<dyn OperationTransformer> = match along.last() {
            Some((depth, description)) if *depth == address.len() => {
                let name = ops::operation_name(&operation)?;
                description.operation_transformer(&name)
            }
            _ => {
                trace!(address = %address, "No description, passing operation through");
                Arc::new(DefaultOperationTransformer)
            }
        };
        let transformed = transformer.transform_operation(context, address, operation)?;

        let target = self.transform_address(address);
        if target == *address {
            return Ok(transformed);
        }
        debug!(address = %address, target = %target, "Redirecting operation");
        transformed.map_operation(|mut op| {
            op.set(OP_ADDR, target.to_value())?;
            Ok(op)
        })
    }

    /// Transform the resource at `address` and its subtree
    ///
    /// Returns `None` when the resource is discarded or rejected.
    pub fn transform_resource(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        resource: Resource,
    ) -> TransformResult<Option<Resource>> {
        for (depth, description) in self.descriptions.configs_along(address) {
            if depth == address.len() {
                continue;
            }
            let prefix = address.sub_address(0, depth);
            match description.discard_policy(context, &prefix) {
                DiscardPolicy::Never => {}
                DiscardPolicy::Silent => {
                    debug!(address = %address, discarded_at = %prefix, "Discarding resource below discarded resource");
                    return Ok(None);
                }
                DiscardPolicy::RejectAndWarn => {
                    warn_not_sent(context, address);
                    return Ok(None);
                }
            }
        }

        let target = self.transform_address(address);
        let mut resource_context = ResourceTransformationContext::new(context, self);
        resource_context.add_transformed_ancestors(&target);
        resource_context.transform_resource_at(address, resource)?;
        let mut root = resource_context.into_resource();
        let Some(element) = target.last() else {
            return Ok(Some(root));
        };
        Ok(root
            .navigate_mut(&target.parent())
            .and_then(|parent| parent.remove_child(element)))
    }
}

// ============================================================================
// TransformerRegistry
// ============================================================================

/// Per-subsystem, per-version transformation hops
#[derive(Debug, Default)]
pub struct TransformerRegistry {
    subsystems: BTreeMap<String, BTreeMap<ModelVersion, Vec<Arc<TransformerTree>>>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single-hop description for `subsystem` at `version`
    pub fn register_subsystem(&mut self, subsystem: &str, version: ModelVersion, description: TransformationDescription) {
        debug!(subsystem = %subsystem, version = %version, "Registering subsystem transformer");
        self.subsystems
            .entry(subsystem.to_string())
            .or_default()
            .insert(version, vec![Arc::new(TransformerTree::new(description))]);
    }

    /// Register the hops of `chain` for each of `targets`
    pub fn register_chained(
        &mut self,
        chain: ChainedTransformationDescriptionBuilder,
        targets: &[ModelVersion],
    ) -> BuildResult<()> {
        let subsystem = chain.subsystem().to_string();
        for (version, hops) in chain.build(targets)? {
            if hops.is_empty() {
                continue;
            }
            debug!(subsystem = %subsystem, version = %version, hops = hops.len(), "Registering chained transformer");
            let trees = hops
                .into_iter()
                .map(|hop| Arc::new(TransformerTree::new(hop)))
                .collect();
            self.subsystems
                .entry(subsystem.clone())
                .or_default()
                .insert(version, trees);
        }
        Ok(())
    }

    pub fn is_registered(&self, subsystem: &str, version: ModelVersion) -> bool {
        self.subsystems
            .get(subsystem)
            .is_some_and(|versions| versions.contains_key(&version))
    }

    /// Registered subsystem names with their legacy versions
    pub fn registrations(&self) -> Vec<(&str, Vec<ModelVersion>)> {
        self.subsystems
            .iter()
            .map(|(name, versions)| (name.as_str(), versions.keys().copied().collect()))
            .collect()
    }

    /// Hops for the subsystem owning `address`, at the version the target runs
    pub fn hops(&self, context: &TransformationContext, address: &PathAddress) -> Option<&[Arc<TransformerTree>]> {
        let subsystem = address.subsystem_name()?;
        let version = context.target().subsystem_version(subsystem)?;
        let hops = self.subsystems.get(subsystem)?.get(&version).map(Vec::as_slice);
        trace!(subsystem = %subsystem, version = %version, found = hops.is_some(), "Transformer lookup");
        hops
    }

    /// Transform `operation` for the target of `context`
    pub fn transform_operation(
        &self,
        context: &TransformationContext,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        let name = ops::operation_name(&operation)?;
        if name == COMPOSITE {
            return transform_composite(self, context, operation);
        }
        if ops::is_read_only(&name) {
            trace!(operation = %name, "Read-only operation passes through");
            return Ok(TransformedOperation::new(operation));
        }
        let address = ops::operation_address(&operation)?;
        let Some(hops) = self.hops(context, &address) else {
            return Ok(TransformedOperation::new(operation));
        };

        let previous = context.set_current_address(address.clone());
        let result = apply_hops(hops, context, address, operation);
        context.set_current_address(previous);
        result
    }

    /// Transform the subsystem resource at `address`
    ///
    /// Returns `None` when the resource must not be sent.
    pub fn transform_resource(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        resource: Resource,
    ) -> TransformResult<Option<Resource>> {
        let Some(hops) = self.hops(context, address) else {
            return Ok(Some(resource));
        };
        let mut current = resource;
        let mut current_address = address.clone();
        for hop in hops {
            let target = hop.transform_address(&current_address);
            match hop.transform_resource(context, &current_address, current)? {
                Some(transformed) => current = transformed,
                None => return Ok(None),
            }
            current_address = target;
        }
        Ok(Some(current))
    }

    /// Transform every subsystem below `root`; other children are copied
    pub fn transform_root_resource(&self, context: &TransformationContext, root: &Resource) -> TransformResult<Resource> {
        let mut transformed = Resource::with_model(root.model().clone());
        for (element, child) in root.all_children() {
            if element.key() != SUBSYSTEM {
                transformed.register_child(element, child.clone());
                continue;
            }
            let address = PathAddress::from(element.clone());
            if let Some(resource) = self.transform_resource(context, &address, child.clone())? {
                transformed.register_child(element, resource);
            }
        }
        Ok(transformed)
    }
}

/// Apply `hops` in order, each to the previous hop's output
fn apply_hops(
    hops: &[Arc<TransformerTree>],
    context: &TransformationContext,
    address: PathAddress,
    operation: Value,
) -> TransformResult<TransformedOperation> {
    let mut delegates = Vec::with_capacity(hops.len());
    let mut current = operation;
    let mut current_address = address;
    for hop in hops {
        let transformed = hop.transform_operation(context, &current_address, current)?;
        let next = transformed.transformed_operation().cloned();
        delegates.push(transformed);
        match next {
            Some(op) => {
                current_address = ops::operation_address(&op)?;
                current = op;
            }
            None => break,
        }
    }
    if delegates.len() == 1 {
        if let Some(only) = delegates.pop() {
            return Ok(only);
        }
    }
    Ok(TransformedOperation::chained(delegates))
}
