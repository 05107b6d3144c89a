//! Transformation rules
//!
//! A [`TransformationRule`] applies a set of attribute descriptions to an
//! operation or a resource. [`RuleChain`] folds an ordered list of rules over
//! an operation: each rule receives the operation produced by the previous
//! one, a discard stops the chain, and the optional custom transformer runs
//! last. The per-rule outcomes are merged into one chained
//! [`TransformedOperation`].
//!
//! Attribute phases always run in this order: discard, reject, convert,
//! rename. A discarded attribute is never seen by the later phases.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::TransformResult;
use crate::model::operation::{self as ops, NAME, OP, UNDEFINE_ATTRIBUTE_OPERATION, VALUE, WRITE_ATTRIBUTE_OPERATION};
use crate::model::{PathAddress, Resource, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::attribute::AttributeTransformationDescription;
use crate::transform::description::reject::{RejectAttributeChecker, RejectedAttributes};
use crate::transform::operation::{OperationTransformer, TransformedOperation};

/// One step of a transformation chain
pub trait TransformationRule: Send + Sync {
    fn transform_operation(
        &self,
        operation: Value,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<TransformedOperation>;

    fn transform_resource(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()>;
}

// ============================================================================
// Rejection grouping
// ============================================================================

/// Rejected attributes grouped by checker message id, in first-seen order
#[derive(Default)]
struct Rejections {
    groups: Vec<(Arc<dyn RejectAttributeChecker>, RejectedAttributes)>,
}

impl Rejections {
    fn add(&mut self, checker: Arc<dyn RejectAttributeChecker>, attribute: &str, value: &Value) {
        let id = checker.rejection_log_message_id().to_string();
        match self
            .groups
            .iter_mut()
            .find(|(c, _)| c.rejection_log_message_id() == id)
        {
            Some((_, attributes)) => {
                attributes.insert(attribute.to_string(), value.clone());
            }
            None => {
                let mut attributes = RejectedAttributes::new();
                attributes.insert(attribute.to_string(), value.clone());
                self.groups.push((checker, attributes));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn messages(&self) -> String {
        self.groups
            .iter()
            .map(|(checker, attributes)| checker.rejection_log_message(attributes))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Failure description for rejected attributes of an operation
pub fn rejected_attributes_message(
    context: &TransformationContext,
    address: &PathAddress,
    operation_name: &str,
    details: &str,
) -> String {
    let target = context.target();
    let version = address
        .subsystem_name()
        .and_then(|name| target.subsystem_version(name))
        .unwrap_or(target.core_version);
    format!(
        "Operation '{}' at '{}' was rejected by {} '{}' (model version {}): {}",
        operation_name, address, target.target_type, target.host_name, version, details
    )
}

// ============================================================================
// AttributeTransformationRule
// ============================================================================

/// Applies attribute descriptions to a whole operation body or resource model
#[derive(Clone, Debug, Default)]
pub struct AttributeTransformationRule {
    descriptions: Vec<AttributeTransformationDescription>,
}

impl AttributeTransformationRule {
    pub fn new(descriptions: Vec<AttributeTransformationDescription>) -> Self {
        Self { descriptions }
    }

    pub fn descriptions(&self) -> &[AttributeTransformationDescription] {
        &self.descriptions
    }

    fn find(&self, attribute: &str) -> Option<&AttributeTransformationDescription> {
        self.descriptions.iter().find(|d| d.name() == attribute)
    }
}

/// Remove `name` and put its value back under `new_name`
fn rename(target: &mut Value, name: &str, new_name: &str) -> TransformResult<()> {
    if let Some(value) = target.remove(name) {
        target.set(new_name, value)?;
    }
    Ok(())
}

impl TransformationRule for AttributeTransformationRule {
    fn transform_operation(
        &self,
        mut operation: Value,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<TransformedOperation> {
        let original = operation.protect();
        let mut discarded = HashSet::new();
        for description in &self.descriptions {
            let value = original.get_or_undefined(description.name());
            if description.is_discarded_operation_parameter(address, value, &original, context) {
                debug!(address = %address, attribute = description.name(), "Discarding operation parameter");
                operation.remove(description.name());
                discarded.insert(description.name());
            }
        }

        let mut rejections = Rejections::default();
        for description in self.descriptions.iter().filter(|d| !discarded.contains(d.name())) {
            let value = operation.get_or_undefined(description.name());
            for checker in description.rejecting_operation_checkers(address, value, &original, context) {
                rejections.add(checker, description.name(), value);
            }
        }

        for description in self.descriptions.iter().filter(|d| !discarded.contains(d.name())) {
            if !description.has_converter() {
                continue;
            }
            let present = operation.has(description.name());
            let mut value = operation.get_or_undefined(description.name()).clone();
            description.convert_operation_parameter(address, &mut value, &original, context)?;
            if present || value.is_defined() {
                operation.set(description.name(), value)?;
            }
        }

        for description in &self.descriptions {
            if let Some(new_name) = description.new_name() {
                rename(&mut operation, description.name(), new_name)?;
            }
        }

        if rejections.is_empty() {
            return Ok(TransformedOperation::new(operation));
        }
        let name = ops::operation_name(&original)?;
        let message = rejected_attributes_message(context, address, &name, &rejections.messages());
        debug!(address = %address, operation = %name, "Operation rejected");
        Ok(TransformedOperation::rejected(operation, message))
    }

    fn transform_resource(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        let model = resource.model_mut();
        let mut discarded = HashSet::new();
        for description in &self.descriptions {
            let value = model.get_or_undefined(description.name());
            if description.is_discarded_resource_attribute(address, value, context) {
                debug!(address = %address, attribute = description.name(), "Discarding resource attribute");
                model.remove(description.name());
                discarded.insert(description.name());
            }
        }

        let mut rejections = Rejections::default();
        for description in self.descriptions.iter().filter(|d| !discarded.contains(d.name())) {
            let value = model.get_or_undefined(description.name());
            for checker in description.rejecting_resource_checkers(address, value, context) {
                rejections.add(checker, description.name(), value);
            }
        }
        if !rejections.is_empty() {
            // the resource is still sent; the target decides whether it uses it
            context.warn(format!(
                "Resource at '{}' is rejected by {} '{}': {}",
                address,
                context.target().target_type,
                context.target().host_name,
                rejections.messages()
            ));
        }

        for description in self.descriptions.iter().filter(|d| !discarded.contains(d.name())) {
            if !description.has_converter() {
                continue;
            }
            let present = model.has(description.name());
            let mut value = model.get_or_undefined(description.name()).clone();
            description.convert_resource_attribute(address, &mut value, context)?;
            if present || value.is_defined() {
                model.set(description.name(), value)?;
            }
        }

        for description in &self.descriptions {
            if let Some(new_name) = description.new_name() {
                rename(model, description.name(), new_name)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// write-attribute / undefine-attribute
// ============================================================================

/// Transforms `write-attribute`, keyed on its `name` parameter
#[derive(Clone, Debug, Default)]
pub struct WriteAttributeRule {
    attributes: AttributeTransformationRule,
}

impl WriteAttributeRule {
    pub fn new(descriptions: Vec<AttributeTransformationDescription>) -> Self {
        Self {
            attributes: AttributeTransformationRule::new(descriptions),
        }
    }
}

/// Discard, reject, convert and rename for a single named attribute of a
/// generic attribute operation
fn transform_named_attribute(
    description: &AttributeTransformationDescription,
    mut operation: Value,
    mut value: Value,
    address: &PathAddress,
    context: &TransformationContext,
) -> TransformResult<(Option<Value>, Value, Option<String>)> {
    let original = operation.protect();
    if description.is_discarded_operation_parameter(address, &value, &original, context) {
        debug!(address = %address, attribute = description.name(), "Discarding attribute operation");
        return Ok((None, value, None));
    }

    let mut rejections = Rejections::default();
    for checker in description.rejecting_operation_checkers(address, &value, &original, context) {
        rejections.add(checker, description.name(), &value);
    }
    let rejection = (!rejections.is_empty()).then(|| {
        let name = original.get(OP).and_then(Value::as_str).unwrap_or_default();
        rejected_attributes_message(context, address, name, &rejections.messages())
    });

    description.convert_operation_parameter(address, &mut value, &original, context)?;
    if let Some(new_name) = description.new_name() {
        operation.set(NAME, Value::string(new_name))?;
    }
    Ok((Some(operation), value, rejection))
}

fn finish(operation: Value, rejection: Option<String>) -> TransformedOperation {
    match rejection {
        Some(message) => TransformedOperation::rejected(operation, message),
        None => TransformedOperation::new(operation),
    }
}

impl TransformationRule for WriteAttributeRule {
    fn transform_operation(
        &self,
        operation: Value,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<TransformedOperation> {
        let name = operation.require(NAME)?.as_string()?;
        let Some(description) = self.attributes.find(&name) else {
            return Ok(TransformedOperation::new(operation));
        };
        let value = operation.get_or_undefined(VALUE).clone();
        let (operation, value, rejection) =
            transform_named_attribute(description, operation, value, address, context)?;
        let Some(mut operation) = operation else {
            return Ok(TransformedOperation::discarded());
        };
        operation.set(VALUE, value)?;
        Ok(finish(operation, rejection))
    }

    fn transform_resource(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        self.attributes.transform_resource(resource, address, context)
    }
}

/// Transforms `undefine-attribute`, keyed on its `name` parameter
///
/// When conversion turns the undefined value into a defined one the
/// operation becomes a `write-attribute` of that value.
#[derive(Clone, Debug, Default)]
pub struct UndefineAttributeRule {
    attributes: AttributeTransformationRule,
}

impl UndefineAttributeRule {
    pub fn new(descriptions: Vec<AttributeTransformationDescription>) -> Self {
        Self {
            attributes: AttributeTransformationRule::new(descriptions),
        }
    }
}

impl TransformationRule for UndefineAttributeRule {
    fn transform_operation(
        &self,
        operation: Value,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<TransformedOperation> {
        let name = operation.require(NAME)?.as_string()?;
        let Some(description) = self.attributes.find(&name) else {
            return Ok(TransformedOperation::new(operation));
        };
        let (operation, value, rejection) =
            transform_named_attribute(description, operation, Value::Undefined, address, context)?;
        let Some(mut operation) = operation else {
            return Ok(TransformedOperation::discarded());
        };
        if value.is_defined() {
            debug!(address = %address, attribute = %name, "Converting undefine-attribute to write-attribute");
            operation.set(OP, Value::string(WRITE_ATTRIBUTE_OPERATION))?;
            operation.set(VALUE, value)?;
        }
        Ok(finish(operation, rejection))
    }

    fn transform_resource(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        self.attributes.transform_resource(resource, address, context)
    }
}

/// Rule for `operation_name` over `descriptions`
///
/// `write-attribute` and `undefine-attribute` carry the attribute name as
/// data and get their dedicated rules.
pub fn rule_for_operation(
    operation_name: &str,
    descriptions: Vec<AttributeTransformationDescription>,
) -> Arc<dyn TransformationRule> {
    match operation_name {
        WRITE_ATTRIBUTE_OPERATION => Arc::new(WriteAttributeRule::new(descriptions)),
        UNDEFINE_ATTRIBUTE_OPERATION => Arc::new(UndefineAttributeRule::new(descriptions)),
        _ => Arc::new(AttributeTransformationRule::new(descriptions)),
    }
}

// ============================================================================
// RuleChain
// ============================================================================

/// Ordered rules plus an optional custom transformer that runs last
#[derive(Clone, Default)]
pub struct RuleChain {
    rules: Vec<Arc<dyn TransformationRule>>,
    custom: Option<Arc<dyn OperationTransformer>>,
}

impl RuleChain {
    pub fn new(rules: Vec<Arc<dyn TransformationRule>>) -> Self {
        Self { rules, custom: None }
    }

    pub fn with_custom_transformer(mut self, custom: Arc<dyn OperationTransformer>) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn rules(&self) -> &[Arc<dyn TransformationRule>] {
        &self.rules
    }

    /// Fold the rules over `operation`
    ///
    /// Resources read through `context` are protected for the duration.
    pub fn fold(
        &self,
        operation: Value,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<TransformedOperation> {
        let _guard = context.protect_resources();
        let mut delegates = Vec::with_capacity(self.rules.len() + 1);
        let mut current = operation;
        for rule in &self.rules {
            let transformed = rule.transform_operation(current, address, context)?;
            let next = transformed.transformed_operation().cloned();
            delegates.push(transformed);
            match next {
                Some(op) => current = op,
                None => return Ok(TransformedOperation::chained(delegates)),
            }
        }
        match &self.custom {
            Some(custom) => delegates.push(custom.transform_operation(context, address, current)?),
            None if delegates.is_empty() => delegates.push(TransformedOperation::new(current)),
            None => {}
        }
        Ok(TransformedOperation::chained(delegates))
    }

    /// Apply every rule to `resource` in order
    pub fn fold_resource(
        &self,
        resource: &mut Resource,
        address: &PathAddress,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        let _guard = context.protect_resources();
        for rule in &self.rules {
            rule.transform_resource(resource, address, context)?;
        }
        Ok(())
    }
}

impl OperationTransformer for RuleChain {
    fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        self.fold(operation, address, context)
    }
}

impl std::fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleChain")
            .field("rules", &self.rules.len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::model::operation::{create_operation, ADD, FAILURE_DESCRIPTION};
    use crate::model::{ManagementModel, PathElement};
    use crate::transform::context::{ModelVersion, TargetType, TransformationTarget};
    use crate::transform::description::attribute::AttributeTransformationDescriptionBuilder;
    use crate::transform::description::convert::{ConvertFn, HardcodedValueConverter};
    use crate::transform::description::discard::{DiscardAlways, DiscardUndefined};
    use crate::transform::description::reject::{RejectDefined, RejectExpressions};
    use crate::transform::operation::OperationRejectionPolicy;

    fn address() -> PathAddress {
        "/subsystem=foo".parse().unwrap()
    }

    fn context() -> TransformationContext {
        let root = Resource::new().with_child(
            PathElement::new("subsystem", "foo"),
            Resource::with_model(Value::object().with("a", 1)),
        );
        TransformationContext::new(
            TransformationTarget::new("slave", ModelVersion::new(1, 4, 0), TargetType::Host)
                .with_subsystem("foo", ModelVersion::new(1, 1, 0)),
            Arc::new(ManagementModel::new(root)),
        )
    }

    fn descriptions(configure: impl FnOnce(&mut AttributeTransformationDescriptionBuilder)) -> Vec<AttributeTransformationDescription> {
        let mut builder = AttributeTransformationDescriptionBuilder::new("/subsystem=foo");
        configure(&mut builder);
        builder.build()
    }

    /// Reject checker that panics if it is ever consulted
    struct MustNotReject;

    impl RejectAttributeChecker for MustNotReject {
        fn reject_attribute(&self, _: &PathAddress, name: &str, _: &Value, _: &TransformationContext) -> bool {
            panic!("reject checker consulted for discarded attribute {}", name)
        }

        fn rejection_log_message_id(&self) -> &str {
            "never"
        }

        fn rejection_log_message(&self, _: &RejectedAttributes) -> String {
            String::new()
        }
    }

    // ========================================================================
    // Attribute rule: operations
    // ========================================================================

    #[test]
    fn test_discard_precedes_reject_and_convert() {
        let rule = AttributeTransformationRule::new(descriptions(|b| {
            b.set_discard(DiscardAlways, &["x"])
                .add_reject_check(MustNotReject, &["x"])
                .set_value_converter(
                    ConvertFn::new(|_, name, _, _| panic!("converter consulted for {}", name)),
                    &["x"],
                );
        }));
        let op = create_operation(ADD, &address()).with("x", 1).with("y", 2);
        let transformed = rule.transform_operation(op, &address(), &context()).unwrap();
        let op = transformed.transformed_operation().unwrap();
        assert!(!op.has("x"));
        assert_eq!(op.get("y"), Some(&Value::Int(2)));
        assert!(!transformed.reject_operation(&Value::Undefined));
    }

    #[test]
    fn test_rejection_groups_attributes_and_names_address() {
        let rule = AttributeTransformationRule::new(descriptions(|b| {
            b.add_reject_check(RejectExpressions::new(), &["a", "b"])
                .add_reject_check(RejectDefined::new(), &["c"]);
        }));
        let op = create_operation(ADD, &address())
            .with("a", Value::expression("${x}"))
            .with("b", Value::expression("${y}"))
            .with("c", true);
        let transformed = rule.transform_operation(op, &address(), &context()).unwrap();
        assert!(transformed.reject_operation(&Value::Undefined));

        let description = transformed.failure_description().unwrap();
        assert!(description.contains("[a, b]"), "{}", description);
        assert!(description.contains("[c]"), "{}", description);
        assert!(description.contains("/subsystem=foo"));
        assert!(description.contains("'add'"));
        assert!(description.contains("1.1.0"));
        // the operation is still forwarded
        assert!(transformed.transformed_operation().is_some());
    }

    #[test]
    fn test_convert_can_add_missing_attribute_and_rename() {
        let rule = AttributeTransformationRule::new(descriptions(|b| {
            b.set_value_converter(HardcodedValueConverter::new("legacy"), &["mode"]);
            b.add_rename("new-name", "old-name").unwrap();
        }));
        let op = create_operation(ADD, &address()).with("new-name", 3);
        let transformed = rule.transform_operation(op, &address(), &context()).unwrap();
        let op = transformed.transformed_operation().unwrap();
        assert_eq!(op.get("mode"), Some(&Value::string("legacy")));
        assert_eq!(op.get("old-name"), Some(&Value::Int(3)));
        assert!(!op.has("new-name"));
    }

    // ========================================================================
    // Attribute rule: resources
    // ========================================================================

    #[test]
    fn test_resource_rejection_is_a_warning() {
        let rule = AttributeTransformationRule::new(descriptions(|b| {
            b.set_discard(DiscardUndefined, &["feature-x"])
                .add_reject_check(RejectDefined::new(), &["feature-x"]);
        }));
        let ctx = context();
        let mut resource = Resource::with_model(Value::object().with("feature-x", true));
        rule.transform_resource(&mut resource, &address(), &ctx).unwrap();
        assert_eq!(resource.model().get("feature-x"), Some(&Value::Boolean(true)));
        let warnings = ctx.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("feature-x"));

        let ctx = context();
        let mut resource = Resource::with_model(Value::object().with("feature-x", Value::Undefined));
        rule.transform_resource(&mut resource, &address(), &ctx).unwrap();
        assert!(!resource.model().has("feature-x"));
        assert!(ctx.warnings().is_empty());
    }

    // ========================================================================
    // write-attribute / undefine-attribute
    // ========================================================================

    fn write(name: &str, value: Value) -> Value {
        create_operation(WRITE_ATTRIBUTE_OPERATION, &address())
            .with(NAME, name)
            .with(VALUE, value)
    }

    #[test]
    fn test_write_attribute_keys_on_name() {
        let rule = WriteAttributeRule::new(descriptions(|b| {
            b.add_reject_check(RejectExpressions::new(), &["a"]);
        }));
        let transformed = rule
            .transform_operation(write("a", Value::string("${foo}")), &address(), &context())
            .unwrap();
        assert!(transformed.reject_operation(&Value::Undefined));
        assert!(transformed.failure_description().unwrap().contains("[a]"));

        let untouched = rule
            .transform_operation(write("b", Value::string("${foo}")), &address(), &context())
            .unwrap();
        assert!(!untouched.reject_operation(&Value::Undefined));
    }

    #[test]
    fn test_write_attribute_discard_and_rename() {
        let rule = WriteAttributeRule::new(descriptions(|b| {
            b.set_discard(DiscardUndefined, &["gone"]);
            b.add_rename("renamed", "legacy").unwrap();
        }));
        let discarded = rule
            .transform_operation(write("gone", Value::Undefined), &address(), &context())
            .unwrap();
        assert!(discarded.is_discarded());

        let renamed = rule
            .transform_operation(write("renamed", Value::from(1)), &address(), &context())
            .unwrap();
        let op = renamed.transformed_operation().unwrap();
        assert_eq!(op.get(NAME), Some(&Value::string("legacy")));
        assert_eq!(op.get(VALUE), Some(&Value::Int(1)));
    }

    #[test]
    fn test_undefine_becomes_write_when_converted() {
        let rule = UndefineAttributeRule::new(descriptions(|b| {
            b.set_value_converter(HardcodedValueConverter::new(false), &["flag"]);
        }));
        let op = create_operation(UNDEFINE_ATTRIBUTE_OPERATION, &address()).with(NAME, "flag");
        let transformed = rule.transform_operation(op, &address(), &context()).unwrap();
        let op = transformed.transformed_operation().unwrap();
        assert_eq!(ops::operation_name(op).unwrap(), WRITE_ATTRIBUTE_OPERATION);
        assert_eq!(op.get(VALUE), Some(&Value::Boolean(false)));
    }

    #[test]
    fn test_undefine_without_conversion_stays() {
        let rule = UndefineAttributeRule::new(descriptions(|b| {
            b.add_reject_check(RejectDefined::new(), &["flag"]);
        }));
        let op = create_operation(UNDEFINE_ATTRIBUTE_OPERATION, &address()).with(NAME, "flag");
        let transformed = rule.transform_operation(op, &address(), &context()).unwrap();
        let op = transformed.transformed_operation().unwrap();
        assert_eq!(ops::operation_name(op).unwrap(), UNDEFINE_ATTRIBUTE_OPERATION);
        assert!(!transformed.reject_operation(&Value::Undefined));
    }

    #[test]
    fn test_write_attribute_requires_name() {
        let rule = WriteAttributeRule::default();
        let op = create_operation(WRITE_ATTRIBUTE_OPERATION, &address());
        let err = rule.transform_operation(op, &address(), &context()).unwrap_err();
        assert!(matches!(err, TransformError::Value(_)));
    }

    // ========================================================================
    // RuleChain
    // ========================================================================

    #[test]
    fn test_chain_feeds_each_rule_the_previous_output() {
        let first = AttributeTransformationRule::new(descriptions(|b| {
            b.add_rename("a", "b").unwrap();
        }));
        let second = AttributeTransformationRule::new(descriptions(|b| {
            b.add_rename("b", "c").unwrap();
        }));
        let rules: Vec<Arc<dyn TransformationRule>> = vec![Arc::new(first), Arc::new(second)];
        let chain = RuleChain::new(rules);
        let op = create_operation(ADD, &address()).with("a", 1);
        let transformed = chain.fold(op, &address(), &context()).unwrap();
        assert_eq!(
            transformed.transformed_operation().and_then(|op| op.get("c")),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn test_chain_stops_on_discard() {
        let discarding = |_: &TransformationContext, _: &PathAddress, _: Value| -> TransformResult<TransformedOperation> {
            Ok(TransformedOperation::discarded())
        };
        struct Discards<F>(F);
        impl<F> TransformationRule for Discards<F>
        where
            F: Fn(&TransformationContext, &PathAddress, Value) -> TransformResult<TransformedOperation> + Send + Sync,
        {
            fn transform_operation(&self, op: Value, a: &PathAddress, c: &TransformationContext) -> TransformResult<TransformedOperation> {
                (self.0)(c, a, op)
            }
            fn transform_resource(&self, _: &mut Resource, _: &PathAddress, _: &TransformationContext) -> TransformResult<()> {
                Ok(())
            }
        }

        let custom = |_: &TransformationContext, _: &PathAddress, _: Value| -> TransformResult<TransformedOperation> {
            panic!("custom transformer runs after a discard")
        };
        let rules: Vec<Arc<dyn TransformationRule>> = vec![Arc::new(Discards(discarding))];
        let chain = RuleChain::new(rules).with_custom_transformer(Arc::new(custom));
        let transformed = chain
            .fold(create_operation(ADD, &address()), &address(), &context())
            .unwrap();
        assert!(transformed.is_discarded());
    }

    #[test]
    fn test_custom_transformer_sees_protected_resources() {
        let custom = |ctx: &TransformationContext, _: &PathAddress, op: Value| -> TransformResult<TransformedOperation> {
            let mut resource = ctx
                .read_resource_from_root(&"/subsystem=foo".parse().unwrap())
                .ok_or_else(|| TransformError::failed("missing"))?;
            resource.write_model(Value::object())?;
            Ok(TransformedOperation::new(op))
        };
        let chain = RuleChain::new(Vec::new()).with_custom_transformer(Arc::new(custom));
        let ctx = context();
        let err = chain
            .fold(create_operation(ADD, &address()), &address(), &ctx)
            .unwrap_err();
        assert!(matches!(err, TransformError::ImmutableResource { .. }));
        assert!(!ctx.is_immutable_resources());
    }

    #[test]
    fn test_rejection_reported_through_chain() {
        let rule = AttributeTransformationRule::new(descriptions(|b| {
            b.add_reject_check(RejectDefined::new(), &["x"]);
        }));
        let rules: Vec<Arc<dyn TransformationRule>> = vec![Arc::new(rule)];
        let chain = RuleChain::new(rules);
        let op = create_operation(ADD, &address()).with("x", 1);
        let transformed = chain.fold(op, &address(), &context()).unwrap();
        let result = transformed.resolve_result(ops::success_result(Value::Undefined));
        assert!(!ops::is_success(&result));
        assert!(result
            .get(FAILURE_DESCRIPTION)
            .and_then(Value::as_str)
            .unwrap()
            .contains("[x]"));
    }
}
