//! Resource transformation
//!
//! Resources are transformed top-down into a fresh target tree. For each
//! resource the description's attribute rules run first, then its
//! [`ResourceTransformer`] places the result in the target tree and decides
//! what happens to the children. Resources with no description are copied
//! with their whole subtree.
//!
//! Rejections found while transforming resources never fail the
//! transformation: they are logged and collected on the
//! [`TransformationContext`], and the resource is still sent. The only hard
//! failure is [`DiscardUndefinedAttributesTransformer`] meeting a target that
//! is known to not ignore the resource.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{TransformError, TransformResult};
use crate::model::operation::{self as ops, ADD, NAME, UNDEFINE_ATTRIBUTE_OPERATION, VALUE, WRITE_ATTRIBUTE_OPERATION};
use crate::model::{PathAddress, Resource, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::operation_override::DiscardPolicy;
use crate::transform::description::rule::rejected_attributes_message;
use crate::transform::operation::{OperationTransformer, TransformedOperation};
use crate::transform::registry::TransformerTree;

/// Places a resource in the target tree and processes its children
pub trait ResourceTransformer: Send + Sync {
    fn transform_resource(
        &self,
        context: &mut ResourceTransformationContext<'_>,
        address: &PathAddress,
        resource: Resource,
    ) -> TransformResult<()>;
}

impl<F> ResourceTransformer for F
where
    F: Fn(&mut ResourceTransformationContext<'_>, &PathAddress, Resource) -> TransformResult<()> + Send + Sync,
{
    fn transform_resource(
        &self,
        context: &mut ResourceTransformationContext<'_>,
        address: &PathAddress,
        resource: Resource,
    ) -> TransformResult<()> {
        self(context, address, resource)
    }
}

/// Adds the resource model at its target address, then its children
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResourceTransformer;

impl ResourceTransformer for DefaultResourceTransformer {
    fn transform_resource(
        &self,
        context: &mut ResourceTransformationContext<'_>,
        address: &PathAddress,
        resource: Resource,
    ) -> TransformResult<()> {
        context.add_transformed_resource(address, &resource)?;
        context.process_children(address, &resource)
    }
}

/// Record that the resource at `address` is withheld from the target
pub(crate) fn warn_not_sent(context: &TransformationContext, address: &PathAddress) {
    let target = context.target();
    context.warn(format!(
        "Resource at '{}' is not understood by {} '{}' and was not sent",
        address, target.target_type, target.host_name
    ));
}

// ============================================================================
// ResourceTransformationContext
// ============================================================================

/// State of one resource transformation pass over a single hop
pub struct ResourceTransformationContext<'a> {
    context: &'a TransformationContext,
    tree: &'a TransformerTree,
    root: Resource,
}

impl<'a> ResourceTransformationContext<'a> {
    pub fn new(context: &'a TransformationContext, tree: &'a TransformerTree) -> Self {
        Self {
            context,
            tree,
            root: Resource::new(),
        }
    }

    pub fn transformation_context(&self) -> &'a TransformationContext {
        self.context
    }

    /// Address `address` has on the target
    pub fn transformed_address(&self, address: &PathAddress) -> PathAddress {
        self.tree.transform_address(address)
    }

    /// Add the model of `resource`, without its children, at the target
    /// address of `address`
    pub fn add_transformed_resource(&mut self, address: &PathAddress, resource: &Resource) -> TransformResult<()> {
        let target = self.transformed_address(address);
        self.add_transformed_resource_from_root(&target, Resource::with_model(resource.model().clone()))
    }

    /// Add `resource` with its whole subtree, untransformed
    pub fn add_transformed_recursive_resource(&mut self, address: &PathAddress, resource: Resource) -> TransformResult<()> {
        let target = self.transformed_address(address);
        self.add_transformed_resource_from_root(&target, resource)
    }

    /// Add `resource` at the absolute target address `target`
    ///
    /// The parent must already be in the target tree.
    pub fn add_transformed_resource_from_root(&mut self, target: &PathAddress, resource: Resource) -> TransformResult<()> {
        let Some(element) = target.last() else {
            self.root = resource;
            return Ok(());
        };
        let parent = target.parent();
        let Some(parent_resource) = self.root.navigate_mut(&parent) else {
            return Err(TransformError::failed(format!(
                "No transformed parent at '{}' for resource '{}'",
                parent, target
            )));
        };
        trace!(target = %target, "Adding transformed resource");
        parent_resource.register_child(element.clone(), resource);
        Ok(())
    }

    /// Create empty resources for every ancestor of `target` not yet in the
    /// target tree
    pub fn add_transformed_ancestors(&mut self, target: &PathAddress) {
        let mut node = &mut self.root;
        for element in target.parent().iter() {
            if !node.has_child(element) {
                node.register_child(element.clone(), Resource::new());
            }
            node = match node.get_child_mut(element) {
                Some(child) => child,
                None => return,
            };
        }
    }

    /// Resource already placed at the absolute target address `target`
    pub fn read_transformed_resource(&self, target: &PathAddress) -> Option<&Resource> {
        self.root.navigate(target)
    }

    /// Transform every child of `resource`
    pub fn process_children(&mut self, address: &PathAddress, resource: &Resource) -> TransformResult<()> {
        for (element, child) in resource.all_children() {
            self.transform_resource_at(&address.append(element), child.clone())?;
        }
        Ok(())
    }

    /// Transform the resource at `address` and its subtree
    pub fn transform_resource_at(&mut self, address: &PathAddress, resource: Resource) -> TransformResult<()> {
        let tree = self.tree;
        let Some(description) = tree.description(address) else {
            trace!(address = %address, "No description, copying subtree");
            return self.add_transformed_recursive_resource(address, resource);
        };

        match description.discard_policy(self.context, address) {
            DiscardPolicy::Silent => {
                debug!(address = %address, "Discarding resource");
                Ok(())
            }
            DiscardPolicy::RejectAndWarn => {
                warn_not_sent(self.context, address);
                Ok(())
            }
            DiscardPolicy::Never => {
                let previous = self.context.set_current_address(address.clone());
                let mut resource = resource;
                let result = description
                    .transform_resource_model(&mut resource, address, self.context)
                    .and_then(|()| match description.resource_transformer() {
                        Some(transformer) => transformer.transform_resource(self, address, resource),
                        None => DefaultResourceTransformer.transform_resource(self, address, resource),
                    });
                self.context.set_current_address(previous);
                result
            }
        }
    }

    /// The target tree built so far
    pub fn into_resource(self) -> Resource {
        self.root
    }
}

impl fmt::Debug for ResourceTransformationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTransformationContext")
            .field("subsystem", &self.tree.subsystem())
            .finish()
    }
}

// ============================================================================
// DiscardUndefinedAttributesTransformer
// ============================================================================

/// Handles attributes added in a newer model version
///
/// Undefined values are dropped. A defined value cannot be represented on
/// the target: for resources it fails the transformation when the target is
/// known to not ignore the resource, and is only warned about otherwise;
/// operations setting it are rejected.
#[derive(Debug, Clone)]
pub struct DiscardUndefinedAttributesTransformer {
    attributes: Arc<[String]>,
}

impl DiscardUndefinedAttributesTransformer {
    pub fn new(attributes: &[&str]) -> Self {
        Self {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Remove undefined values from `target` and return the names still defined
    fn discard_undefined(&self, target: &mut Value) -> Vec<String> {
        let mut defined = Vec::new();
        for attribute in self.attributes.iter() {
            if target.has_defined(attribute) {
                defined.push(attribute.clone());
            } else {
                target.remove(attribute);
            }
        }
        defined
    }

    fn rejection_message(&self, context: &TransformationContext, address: &PathAddress, operation: &Value, defined: &[String]) -> String {
        let name = operation.get(ops::OP).and_then(Value::as_str).unwrap_or_default();
        rejected_attributes_message(
            context,
            address,
            name,
            &format!(
                "Attributes [{}] are not understood in the target model version and must be undefined",
                defined.join(", ")
            ),
        )
    }
}

impl ResourceTransformer for DiscardUndefinedAttributesTransformer {
    fn transform_resource(
        &self,
        context: &mut ResourceTransformationContext<'_>,
        address: &PathAddress,
        mut resource: Resource,
    ) -> TransformResult<()> {
        let defined = self.discard_undefined(resource.model_mut());
        if !defined.is_empty() {
            let ctx = context.transformation_context();
            let target = ctx.target();
            let subsystem = address.subsystem_name().unwrap_or_default().to_string();
            let version = ctx
                .target()
                .subsystem_version(&subsystem)
                .unwrap_or(target.core_version);
            if target.is_ignored_resource_list_management_supported() {
                return Err(TransformError::AttributesNotUnderstood {
                    host: target.host_name.clone(),
                    subsystem,
                    version: version.to_string(),
                    address: address.to_string(),
                    attributes: defined,
                });
            }
            warn!(address = %address, host = %target.host_name, attributes = ?defined, "Target may not understand attributes");
            ctx.warn(format!(
                "Attributes [{}] at '{}' are not understood by {} '{}' (subsystem '{}' version {}); \
                 the target may ignore this resource",
                defined.join(", "),
                address,
                target.target_type,
                target.host_name,
                subsystem,
                version
            ));
        }
        context.add_transformed_resource(address, &resource)?;
        context.process_children(address, &resource)
    }
}

impl OperationTransformer for DiscardUndefinedAttributesTransformer {
    fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        mut operation: Value,
    ) -> TransformResult<TransformedOperation> {
        let name = ops::operation_name(&operation)?;
        match name.as_str() {
            WRITE_ATTRIBUTE_OPERATION | UNDEFINE_ATTRIBUTE_OPERATION => {
                let attribute = operation.require(NAME)?.as_string()?;
                if !self.attributes.contains(&attribute) {
                    return Ok(TransformedOperation::new(operation));
                }
                if name == UNDEFINE_ATTRIBUTE_OPERATION || !operation.has_defined(VALUE) {
                    debug!(address = %address, attribute = %attribute, "Discarding write of undefined new attribute");
                    return Ok(TransformedOperation::discarded());
                }
                let message = self.rejection_message(context, address, &operation, &[attribute]);
                Ok(TransformedOperation::rejected(operation, message))
            }
            ADD => {
                let defined = self.discard_undefined(&mut operation);
                if defined.is_empty() {
                    return Ok(TransformedOperation::new(operation));
                }
                let message = self.rejection_message(context, address, &operation, &defined);
                Ok(TransformedOperation::rejected(operation, message))
            }
            _ => Ok(TransformedOperation::new(operation)),
        }
    }
}
