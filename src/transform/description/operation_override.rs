//! Per-operation overrides
//!
//! An [`OperationTransformationOverrideBuilder`] builds the transformer used
//! for one operation name at one resource. Its [`DiscardPolicy`] selects
//! between running the attribute rule chain, discarding the operation and
//! rejecting it outright.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TransformResult;
use crate::model::operation::OP;
use crate::model::{PathAddress, Resource, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::attribute::{
    merge_descriptions, AttributeTransformationDescription, AttributeTransformationDescriptionBuilder,
};
use crate::transform::description::rule::{rule_for_operation, RuleChain, TransformationRule};
use crate::transform::operation::{
    DiscardOperationTransformer, OperationTransformer, RejectOperationTransformer, TransformedOperation,
};

/// What happens to an operation or resource before any attribute rules run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardPolicy {
    /// Transform normally
    #[default]
    Never,
    /// Drop without telling anyone; operations report success
    Silent,
    /// Reject with a warning naming the address and operation
    RejectAndWarn,
}

/// Sets the operation name to a fixed value
#[derive(Debug, Clone)]
struct RenameOperationRule {
    new_name: String,
}

impl TransformationRule for RenameOperationRule {
    fn transform_operation(
        &self,
        mut operation: Value,
        _address: &PathAddress,
        _context: &TransformationContext,
    ) -> TransformResult<TransformedOperation> {
        operation.set(OP, Value::string(self.new_name.as_str()))?;
        Ok(TransformedOperation::new(operation))
    }

    fn transform_resource(&self, _: &mut Resource, _: &PathAddress, _: &TransformationContext) -> TransformResult<()> {
        Ok(())
    }
}

/// Builds the transformer for one operation at one resource
pub struct OperationTransformationOverrideBuilder {
    operation_name: String,
    attributes: AttributeTransformationDescriptionBuilder,
    inherit: bool,
    policy: DiscardPolicy,
    new_name: Option<String>,
    custom: Option<Arc<dyn OperationTransformer>>,
}

impl OperationTransformationOverrideBuilder {
    pub fn new(path: impl Into<String>, operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            attributes: AttributeTransformationDescriptionBuilder::new(path),
            inherit: false,
            policy: DiscardPolicy::Never,
            new_name: None,
            custom: None,
        }
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Attribute rules for this operation's parameters
    pub fn attribute_builder(&mut self) -> &mut AttributeTransformationDescriptionBuilder {
        &mut self.attributes
    }

    /// Also apply the resource's attribute rules; this override's own
    /// declarations replace them per attribute
    pub fn inherit_resource_attribute_definitions(&mut self) -> &mut Self {
        self.inherit = true;
        self
    }

    /// Always reject the operation with a warning
    pub fn set_reject(&mut self) -> &mut Self {
        self.policy = DiscardPolicy::RejectAndWarn;
        self
    }

    /// Always discard the operation
    pub fn set_discard(&mut self) -> &mut Self {
        self.policy = DiscardPolicy::Silent;
        self
    }

    /// Send the operation to the target under `new_name`
    pub fn rename_to(&mut self, new_name: impl Into<String>) -> &mut Self {
        self.new_name = Some(new_name.into());
        self
    }

    /// Run `transformer` after the attribute rules
    pub fn set_custom_operation_transformer(
        &mut self,
        transformer: impl OperationTransformer + 'static,
    ) -> &mut Self {
        self.custom = Some(Arc::new(transformer));
        self
    }

    pub fn policy(&self) -> DiscardPolicy {
        self.policy
    }

    /// Build against the owning resource's attribute descriptions
    pub fn build(self, resource_attributes: &[AttributeTransformationDescription]) -> Arc<dyn OperationTransformer> {
        match self.policy {
            DiscardPolicy::Silent => Arc::new(DiscardOperationTransformer),
            DiscardPolicy::RejectAndWarn => Arc::new(RejectOperationTransformer::new()),
            DiscardPolicy::Never => {
                let own = self.attributes.build();
                let descriptions = if self.inherit {
                    merge_descriptions(resource_attributes, &own)
                } else {
                    own
                };
                let mut rules = vec![rule_for_operation(&self.operation_name, descriptions)];
                if let Some(new_name) = self.new_name {
                    rules.push(Arc::new(RenameOperationRule { new_name }));
                }
                let chain = RuleChain::new(rules);
                match self.custom {
                    Some(custom) => Arc::new(chain.with_custom_transformer(custom)),
                    None => Arc::new(chain),
                }
            }
        }
    }
}

impl fmt::Debug for OperationTransformationOverrideBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTransformationOverrideBuilder")
            .field("operation_name", &self.operation_name)
            .field("inherit", &self.inherit)
            .field("policy", &self.policy)
            .field("new_name", &self.new_name)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::{self as ops, create_operation, NAME, VALUE, WRITE_ATTRIBUTE_OPERATION};
    use crate::model::ManagementModel;
    use crate::transform::context::{ModelVersion, TargetType, TransformationTarget};
    use crate::transform::description::discard::DiscardAlways;
    use crate::transform::description::reject::{RejectDefined, RejectExpressions};
    use crate::transform::operation::OperationRejectionPolicy;

    fn address() -> PathAddress {
        "/subsystem=foo".parse().unwrap()
    }

    fn context() -> TransformationContext {
        TransformationContext::new(
            TransformationTarget::new("slave", ModelVersion::new(1, 4, 0), TargetType::Host),
            Arc::new(ManagementModel::new(Resource::new())),
        )
    }

    fn resource_attributes() -> Vec<AttributeTransformationDescription> {
        let mut builder = AttributeTransformationDescriptionBuilder::new("/subsystem=foo");
        builder
            .set_discard(DiscardAlways, &["legacy"])
            .add_reject_check(RejectDefined::new(), &["new"]);
        builder.build()
    }

    fn transform(builder: OperationTransformationOverrideBuilder, op: Value) -> TransformedOperation {
        builder
            .build(&resource_attributes())
            .transform_operation(&context(), &address(), op)
            .unwrap()
    }

    #[test]
    fn test_silent_discard() {
        let mut builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", "custom-op");
        builder.set_discard();
        let transformed = transform(builder, create_operation("custom-op", &address()));
        assert!(transformed.is_discarded());
        assert!(ops::is_success(&transformed.resolve_result(Value::Undefined)));
    }

    #[test]
    fn test_reject_and_warn() {
        let mut builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", "custom-op");
        builder.set_reject();
        let transformed = transform(builder, create_operation("custom-op", &address()));
        assert!(transformed.reject_operation(&Value::Undefined));
        let description = transformed.failure_description().unwrap();
        assert!(description.contains("custom-op"));
        assert!(description.contains("/subsystem=foo"));
    }

    #[test]
    fn test_never_without_inherit_ignores_resource_rules() {
        let builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", "custom-op");
        let op = create_operation("custom-op", &address()).with("legacy", 1).with("new", 2);
        let transformed = transform(builder, op);
        assert!(!transformed.reject_operation(&Value::Undefined));
        assert!(transformed.transformed_operation().unwrap().has("legacy"));
    }

    #[test]
    fn test_inherit_merges_with_override_precedence() {
        let mut builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", "custom-op");
        builder.inherit_resource_attribute_definitions();
        // replaces the resource-level reject-if-defined for "new"
        builder
            .attribute_builder()
            .add_reject_check(RejectExpressions::new(), &["new"]);
        let op = create_operation("custom-op", &address()).with("legacy", 1).with("new", 2);
        let transformed = transform(builder, op);
        let forwarded = transformed.transformed_operation().unwrap();
        assert!(!forwarded.has("legacy"));
        assert!(!transformed.reject_operation(&Value::Undefined));
    }

    #[test]
    fn test_rename_and_custom_transformer_run_in_order() {
        let mut builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", "new-op");
        builder
            .rename_to("old-op")
            .set_custom_operation_transformer(
                |_: &TransformationContext, _: &PathAddress, op: Value| -> TransformResult<TransformedOperation> {
                    // sees the renamed operation
                    let name = ops::operation_name(&op)?;
                    Ok(TransformedOperation::new(op.with("seen", name)))
                },
            );
        let transformed = transform(builder, create_operation("new-op", &address()));
        let op = transformed.transformed_operation().unwrap();
        assert_eq!(ops::operation_name(op).unwrap(), "old-op");
        assert_eq!(op.get("seen"), Some(&Value::string("old-op")));
    }

    #[test]
    fn test_write_attribute_override_uses_named_rule() {
        let mut builder = OperationTransformationOverrideBuilder::new("/subsystem=foo", WRITE_ATTRIBUTE_OPERATION);
        builder.inherit_resource_attribute_definitions();
        let op = create_operation(WRITE_ATTRIBUTE_OPERATION, &address())
            .with(NAME, "new")
            .with(VALUE, 1);
        let transformed = transform(builder, op);
        assert!(transformed.reject_operation(&Value::Undefined));
        assert!(transformed.failure_description().unwrap().contains("[new]"));
    }
}
