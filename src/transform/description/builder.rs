//! Resource transformation description builder
//!
//! A [`ResourceTransformationDescriptionBuilder`] declares, for one resource
//! and recursively for its children, the attribute rules, per-operation
//! overrides, discarded and rejected operations, and how each child is
//! handled: described by its own builder, discarded, rejected, redirected to
//! another address, or decided per address by a dynamic policy.
//!
//! [`build`](ResourceTransformationDescriptionBuilder::build) turns the
//! declarations into an immutable [`TransformationDescription`] tree whose
//! nodes are shared by every transformation of that subsystem version.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = ResourceTransformationDescriptionBuilder::for_subsystem("foo");
//! builder
//!     .attribute_builder()
//!     .set_discard(DiscardUndefined, &["feature-x"])
//!     .add_reject_check(RejectDefined::new(), &["feature-x"]);
//! builder.reject_child_resource(PathElement::wildcard("new-thing"))?;
//! let description = builder.build();
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BuildResult, BuilderError, TransformResult};
use crate::model::operation::{ADD, SUBSYSTEM, UNDEFINE_ATTRIBUTE_OPERATION, WRITE_ATTRIBUTE_OPERATION};
use crate::model::{PathAddress, PathElement, Resource};
use crate::transform::context::TransformationContext;
use crate::transform::description::attribute::AttributeTransformationDescriptionBuilder;
use crate::transform::description::operation_override::{DiscardPolicy, OperationTransformationOverrideBuilder};
use crate::transform::description::rule::{rule_for_operation, AttributeTransformationRule, RuleChain};
use crate::transform::operation::{
    DefaultOperationTransformer, DiscardOperationTransformer, OperationTransformer, RejectOperationTransformer,
};
use crate::transform::resource::ResourceTransformer;

// ============================================================================
// Child hooks
// ============================================================================

/// Decides per address whether a child resource is transformed, discarded
/// or rejected
pub trait DynamicDiscardPolicy: Send + Sync {
    fn check_resource(&self, context: &TransformationContext, address: &PathAddress) -> DiscardPolicy;
}

impl<F> DynamicDiscardPolicy for F
where
    F: Fn(&TransformationContext, &PathAddress) -> DiscardPolicy + Send + Sync,
{
    fn check_resource(&self, context: &TransformationContext, address: &PathAddress) -> DiscardPolicy {
        self(context, address)
    }
}

/// Maps one source element to its address on the target
pub trait PathAddressTransformer: Send + Sync {
    /// Target address of the resource at `element`, below the already
    /// transformed parent address
    fn transform(&self, element: &PathElement, transformed_parent: &PathAddress) -> PathAddress;
}

impl<F> PathAddressTransformer for F
where
    F: Fn(&PathElement, &PathAddress) -> PathAddress + Send + Sync,
{
    fn transform(&self, element: &PathElement, transformed_parent: &PathAddress) -> PathAddress {
        self(element, transformed_parent)
    }
}

/// Replaces the element with a fixed one
///
/// When the replacement is a wildcard only the key changes and the source
/// element's value is kept.
#[derive(Debug, Clone)]
pub struct BasicPathAddressTransformer {
    swap: PathElement,
}

impl BasicPathAddressTransformer {
    pub fn new(swap: PathElement) -> Self {
        Self { swap }
    }
}

impl PathAddressTransformer for BasicPathAddressTransformer {
    fn transform(&self, element: &PathElement, transformed_parent: &PathAddress) -> PathAddress {
        let replaced = if self.swap.is_wildcard() {
            PathElement::new(self.swap.key(), element.value())
        } else {
            self.swap.clone()
        };
        transformed_parent.append(replaced)
    }
}

// ============================================================================
// Built description
// ============================================================================

/// Compiled transformation behaviour of one resource
pub struct ResourceDescription {
    element: PathElement,
    policy: DiscardPolicy,
    dynamic_policy: Option<Arc<dyn DynamicDiscardPolicy>>,
    path_transformer: Option<Arc<dyn PathAddressTransformer>>,
    attributes: RuleChain,
    operations: BTreeMap<String, Arc<dyn OperationTransformer>>,
    resource_transformer: Option<Arc<dyn ResourceTransformer>>,
}

impl ResourceDescription {
    pub fn element(&self) -> &PathElement {
        &self.element
    }

    /// Policy for the resource at `address`; a dynamic policy overrides the
    /// static one
    pub fn discard_policy(&self, context: &TransformationContext, address: &PathAddress) -> DiscardPolicy {
        match &self.dynamic_policy {
            Some(policy) => policy.check_resource(context, address),
            None => self.policy,
        }
    }

    /// Target address for `element` below `transformed_parent`
    pub fn transform_element(&self, element: &PathElement, transformed_parent: &PathAddress) -> PathAddress {
        match &self.path_transformer {
            Some(transformer) => transformer.transform(element, transformed_parent),
            None => transformed_parent.append(element.clone()),
        }
    }

    pub fn is_redirected(&self) -> bool {
        self.path_transformer.is_some()
    }

    /// Transformer for `operation_name`; undeclared operations pass through
    pub fn operation_transformer(&self, operation_name: &str) -> Arc<dyn OperationTransformer> {
        self.operations
            .get(operation_name)
            .cloned()
            .unwrap_or_else(|| Arc::new(DefaultOperationTransformer))
    }

    /// Apply the resource's attribute rules to its model
    pub fn transform_resource_model(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        self.attributes.fold_resource(resource, address, context)
    }

    pub fn resource_transformer(&self) -> Option<&Arc<dyn ResourceTransformer>> {
        self.resource_transformer.as_ref()
    }
}

impl fmt::Debug for ResourceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescription")
            .field("element", &self.element)
            .field("policy", &self.policy)
            .field("dynamic_policy", &self.dynamic_policy.is_some())
            .field("redirected", &self.path_transformer.is_some())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("resource_transformer", &self.resource_transformer.is_some())
            .finish()
    }
}

/// Immutable description tree produced by the builder
#[derive(Debug, Clone)]
pub struct TransformationDescription {
    node: Arc<ResourceDescription>,
    children: Vec<TransformationDescription>,
}

impl TransformationDescription {
    pub fn element(&self) -> &PathElement {
        &self.node.element
    }

    pub fn node(&self) -> &Arc<ResourceDescription> {
        &self.node
    }

    pub fn children(&self) -> &[TransformationDescription] {
        &self.children
    }

    /// Direct child registered for exactly `element`
    pub fn child(&self, element: &PathElement) -> Option<&TransformationDescription> {
        self.children.iter().find(|c| c.element() == element)
    }

    /// Every node with its address, parents before children
    pub fn flatten(&self, parent: &PathAddress) -> Vec<(PathAddress, Arc<ResourceDescription>)> {
        let address = parent.append(self.element().clone());
        let mut nodes = vec![(address.clone(), self.node.clone())];
        for child in &self.children {
            nodes.extend(child.flatten(&address));
        }
        nodes
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Declares how one resource and its children are transformed
pub struct ResourceTransformationDescriptionBuilder {
    element: PathElement,
    path: PathAddress,
    policy: DiscardPolicy,
    dynamic_policy: Option<Arc<dyn DynamicDiscardPolicy>>,
    path_transformer: Option<Arc<dyn PathAddressTransformer>>,
    attributes: AttributeTransformationDescriptionBuilder,
    overrides: Vec<OperationTransformationOverrideBuilder>,
    discarded_operations: Vec<String>,
    rejected_operations: Vec<String>,
    children: Vec<ResourceTransformationDescriptionBuilder>,
    resource_transformer: Option<Arc<dyn ResourceTransformer>>,
}

impl ResourceTransformationDescriptionBuilder {
    /// Builder for a top-level resource at `element`
    pub fn new(element: PathElement) -> Self {
        let path = PathAddress::from(element.clone());
        Self::at(element, path, DiscardPolicy::Never)
    }

    /// Builder for the root resource of subsystem `name`
    pub fn for_subsystem(name: &str) -> Self {
        Self::new(PathElement::new(SUBSYSTEM, name))
    }

    fn at(element: PathElement, path: PathAddress, policy: DiscardPolicy) -> Self {
        Self {
            attributes: AttributeTransformationDescriptionBuilder::new(path.to_string()),
            element,
            path,
            policy,
            dynamic_policy: None,
            path_transformer: None,
            overrides: Vec::new(),
            discarded_operations: Vec::new(),
            rejected_operations: Vec::new(),
            children: Vec::new(),
            resource_transformer: None,
        }
    }

    pub fn element(&self) -> &PathElement {
        &self.element
    }

    /// Attribute rules for the resource model and its `add`,
    /// `write-attribute` and `undefine-attribute` operations
    pub fn attribute_builder(&mut self) -> &mut AttributeTransformationDescriptionBuilder {
        &mut self.attributes
    }

    /// Declare a dedicated transformation for `operation_name`
    pub fn add_operation_transformation_override(
        &mut self,
        operation_name: &str,
    ) -> BuildResult<&mut OperationTransformationOverrideBuilder> {
        if self.overrides.iter().any(|o| o.operation_name() == operation_name) {
            return Err(BuilderError::DuplicateOverride {
                path: self.path.to_string(),
                operation: operation_name.to_string(),
            });
        }
        self.overrides
            .push(OperationTransformationOverrideBuilder::new(self.path.to_string(), operation_name));
        let index = self.overrides.len() - 1;
        Ok(&mut self.overrides[index])
    }

    /// Silently discard these operations on this resource
    pub fn discard_operations(&mut self, operation_names: &[&str]) -> &mut Self {
        self.discarded_operations
            .extend(operation_names.iter().map(|name| name.to_string()));
        self
    }

    /// Reject these operations on this resource
    pub fn reject_operations(&mut self, operation_names: &[&str]) -> &mut Self {
        self.rejected_operations
            .extend(operation_names.iter().map(|name| name.to_string()));
        self
    }

    /// Replace the default resource transformer
    ///
    /// The custom transformer runs after the attribute rules and is
    /// responsible for adding the resource and processing its children.
    pub fn set_custom_resource_transformer(
        &mut self,
        transformer: impl ResourceTransformer + 'static,
    ) -> &mut Self {
        self.resource_transformer = Some(Arc::new(transformer));
        self
    }

    fn child_builder(
        &mut self,
        element: PathElement,
        policy: DiscardPolicy,
    ) -> BuildResult<&mut ResourceTransformationDescriptionBuilder> {
        if self.children.iter().any(|child| child.element == element) {
            return Err(BuilderError::DuplicateChild {
                path: self.path.to_string(),
                child: element.to_string(),
            });
        }
        let path = self.path.append(element.clone());
        self.children.push(Self::at(element, path, policy));
        let index = self.children.len() - 1;
        Ok(&mut self.children[index])
    }

    /// Describe the child at `element` with its own builder
    pub fn add_child_resource(
        &mut self,
        element: PathElement,
    ) -> BuildResult<&mut ResourceTransformationDescriptionBuilder> {
        self.child_builder(element, DiscardPolicy::Never)
    }

    /// Describe the child at `element`, letting `policy` decide per address
    /// whether it is transformed at all
    pub fn add_child_resource_with_policy(
        &mut self,
        element: PathElement,
        policy: impl DynamicDiscardPolicy + 'static,
    ) -> BuildResult<&mut ResourceTransformationDescriptionBuilder> {
        let child = self.child_builder(element, DiscardPolicy::Never)?;
        child.dynamic_policy = Some(Arc::new(policy));
        Ok(child)
    }

    /// Describe the child at `element` and move it to `new_element` on the
    /// target; a wildcard `new_element` only renames the key
    pub fn add_child_redirection(
        &mut self,
        element: PathElement,
        new_element: PathElement,
    ) -> BuildResult<&mut ResourceTransformationDescriptionBuilder> {
        self.add_child_redirection_with(element, BasicPathAddressTransformer::new(new_element))
    }

    /// Describe the child at `element` and compute its target address with
    /// `transformer`
    pub fn add_child_redirection_with(
        &mut self,
        element: PathElement,
        transformer: impl PathAddressTransformer + 'static,
    ) -> BuildResult<&mut ResourceTransformationDescriptionBuilder> {
        let child = self.child_builder(element, DiscardPolicy::Never)?;
        child.path_transformer = Some(Arc::new(transformer));
        Ok(child)
    }

    /// Drop the child subtree at `element` and every operation against it
    pub fn discard_child_resource(&mut self, element: PathElement) -> BuildResult<&mut Self> {
        self.child_builder(element, DiscardPolicy::Silent)?;
        Ok(self)
    }

    /// Reject every operation against the child subtree at `element`
    pub fn reject_child_resource(&mut self, element: PathElement) -> BuildResult<&mut Self> {
        self.child_builder(element, DiscardPolicy::RejectAndWarn)?;
        Ok(self)
    }

    /// Freeze the declarations into a description tree
    pub fn build(self) -> TransformationDescription {
        let attributes = self.attributes.build();
        let mut operations: BTreeMap<String, Arc<dyn OperationTransformer>> = BTreeMap::new();
        for name in [ADD, WRITE_ATTRIBUTE_OPERATION, UNDEFINE_ATTRIBUTE_OPERATION] {
            let chain = RuleChain::new(vec![rule_for_operation(name, attributes.clone())]);
            operations.insert(name.to_string(), Arc::new(chain));
        }
        for name in self.discarded_operations {
            operations.insert(name, Arc::new(DiscardOperationTransformer));
        }
        for name in self.rejected_operations {
            operations.insert(name, Arc::new(RejectOperationTransformer::new()));
        }
        for operation in self.overrides {
            let name = operation.operation_name().to_string();
            operations.insert(name, operation.build(&attributes));
        }

        debug!(
            path = %self.path,
            policy = ?self.policy,
            attributes = attributes.len(),
            operations = operations.len(),
            children = self.children.len(),
            "Built resource transformation description"
        );
        let node = ResourceDescription {
            element: self.element,
            policy: self.policy,
            dynamic_policy: self.dynamic_policy,
            path_transformer: self.path_transformer,
            attributes: RuleChain::new(vec![Arc::new(AttributeTransformationRule::new(attributes))]),
            operations,
            resource_transformer: self.resource_transformer,
        };
        TransformationDescription {
            node: Arc::new(node),
            children: self.children.into_iter().map(Self::build).collect(),
        }
    }
}

impl fmt::Debug for ResourceTransformationDescriptionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTransformationDescriptionBuilder")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("attributes", &self.attributes)
            .field("overrides", &self.overrides)
            .field("children", &self.children)
            .finish()
    }
}
