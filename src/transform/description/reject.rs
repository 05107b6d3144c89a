//! Reject attribute checkers
//!
//! A reject checker decides whether the presence or value of an attribute
//! means the target cannot understand the operation. Every checker renders
//! one message for all the attributes it rejected; its message id, computed
//! once at construction from the render of an empty attribute map, is what
//! groups attributes under that single message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::checker::SimpleExpressions;

/// Rejected attributes keyed by name
pub type RejectedAttributes = BTreeMap<String, Value>;

/// Decides whether an attribute makes the operation unacceptable to the target
pub trait RejectAttributeChecker: Send + Sync {
    /// The per-value decision both reject paths funnel into
    fn reject_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool;

    fn reject_operation_parameter(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        _operation: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.reject_attribute(address, attribute_name, value, context)
    }

    fn reject_resource_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.reject_attribute(address, attribute_name, value, context)
    }

    /// Identifier grouping attributes rejected by equivalent checkers
    fn rejection_log_message_id(&self) -> &str;

    /// Message naming every attribute this checker rejected
    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String;
}

/// `[a, b, c]`
fn attribute_names(attributes: &RejectedAttributes) -> String {
    format!("[{}]", attributes.keys().cloned().collect::<Vec<_>>().join(", "))
}

/// Message id of a message template
fn message_id(render: impl Fn(&RejectedAttributes) -> String) -> String {
    render(&RejectedAttributes::new())
}

// ============================================================================
// Built-in checkers
// ============================================================================

/// Rejects attributes whose value contains an unresolved expression
#[derive(Debug, Clone)]
pub struct RejectExpressions {
    message_id: String,
}

impl RejectExpressions {
    pub fn new() -> Self {
        Self {
            message_id: message_id(Self::render),
        }
    }

    fn render(attributes: &RejectedAttributes) -> String {
        format!(
            "Attributes {} use expressions, which are not supported by the target model version",
            attribute_names(attributes)
        )
    }
}

impl Default for RejectExpressions {
    fn default() -> Self {
        Self::new()
    }
}

impl RejectAttributeChecker for RejectExpressions {
    fn reject_attribute(&self, _: &PathAddress, _: &str, value: &Value, _: &TransformationContext) -> bool {
        SimpleExpressions::has_expression(value)
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        Self::render(attributes)
    }
}

/// Rejects attributes that are defined
#[derive(Debug, Clone)]
pub struct RejectDefined {
    message_id: String,
}

impl RejectDefined {
    pub fn new() -> Self {
        Self {
            message_id: message_id(Self::render),
        }
    }

    fn render(attributes: &RejectedAttributes) -> String {
        format!(
            "Attributes {} are not understood in the target model version and must be undefined",
            attribute_names(attributes)
        )
    }
}

impl Default for RejectDefined {
    fn default() -> Self {
        Self::new()
    }
}

impl RejectAttributeChecker for RejectDefined {
    fn reject_attribute(&self, _: &PathAddress, _: &str, value: &Value, _: &TransformationContext) -> bool {
        value.is_defined()
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        Self::render(attributes)
    }
}

/// Rejects attributes that are undefined
#[derive(Debug, Clone)]
pub struct RejectUndefined {
    message_id: String,
}

impl RejectUndefined {
    pub fn new() -> Self {
        Self {
            message_id: message_id(Self::render),
        }
    }

    fn render(attributes: &RejectedAttributes) -> String {
        format!(
            "Attributes {} must be defined for the target model version",
            attribute_names(attributes)
        )
    }
}

impl Default for RejectUndefined {
    fn default() -> Self {
        Self::new()
    }
}

impl RejectAttributeChecker for RejectUndefined {
    fn reject_attribute(&self, _: &PathAddress, _: &str, value: &Value, _: &TransformationContext) -> bool {
        !value.is_defined()
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        Self::render(attributes)
    }
}

/// Rejects attributes equal to one of a set of values
#[derive(Debug, Clone)]
pub struct RejectValue {
    values: Vec<Value>,
    message_id: String,
}

impl RejectValue {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            message_id: message_id(Self::render),
        }
    }

    /// Also reject `value`
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    fn render(attributes: &RejectedAttributes) -> String {
        let pairs = attributes
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Attributes have values not supported by the target model version: [{}]", pairs)
    }
}

impl Default for RejectValue {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RejectAttributeChecker for RejectValue {
    fn reject_attribute(&self, _: &PathAddress, _: &str, value: &Value, _: &TransformationContext) -> bool {
        self.values.contains(value)
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        Self::render(attributes)
    }
}

/// Applies an element checker to every entry of a list attribute
///
/// Shares its message with the element checker.
#[derive(Clone)]
pub struct ListRejectAttributeChecker {
    element: Arc<dyn RejectAttributeChecker>,
}

impl ListRejectAttributeChecker {
    pub fn new(element: impl RejectAttributeChecker + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }
}

impl RejectAttributeChecker for ListRejectAttributeChecker {
    fn reject_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        match value {
            Value::List(items) => items
                .iter()
                .any(|item| self.element.reject_attribute(address, attribute_name, item, context)),
            _ => false,
        }
    }

    fn rejection_log_message_id(&self) -> &str {
        self.element.rejection_log_message_id()
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        self.element.rejection_log_message(attributes)
    }
}

/// Applies a named checker to each declared field of an object attribute
///
/// A missing field is checked as undefined.
#[derive(Clone)]
pub struct ObjectFieldsRejectAttributeChecker {
    fields: Vec<(String, Arc<dyn RejectAttributeChecker>)>,
    message_id: String,
}

impl ObjectFieldsRejectAttributeChecker {
    pub fn new() -> Self {
        let mut checker = Self {
            fields: Vec::new(),
            message_id: String::new(),
        };
        checker.message_id = checker.render(&RejectedAttributes::new());
        checker
    }

    pub fn with_field(mut self, field: impl Into<String>, checker: impl RejectAttributeChecker + 'static) -> Self {
        self.fields.push((field.into(), Arc::new(checker)));
        self.message_id = self.render(&RejectedAttributes::new());
        self
    }

    fn render(&self, attributes: &RejectedAttributes) -> String {
        let fields = self
            .fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Attributes {} have fields [{}] with values not supported by the target model version",
            attribute_names(attributes),
            fields
        )
    }
}

impl Default for ObjectFieldsRejectAttributeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl RejectAttributeChecker for ObjectFieldsRejectAttributeChecker {
    fn reject_attribute(
        &self,
        address: &PathAddress,
        _attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.fields.iter().any(|(field, checker)| {
            checker.reject_attribute(address, field, value.get_or_undefined(field), context)
        })
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        self.render(attributes)
    }
}

type RejectPredicate = dyn Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync;

/// Reject checker backed by a closure and a message template
///
/// `{attributes}` in the template is replaced by the rejected attribute names.
#[derive(Clone)]
pub struct RejectFn {
    hook: Arc<RejectPredicate>,
    template: String,
    message_id: String,
}

impl RejectFn {
    pub fn new<F>(template: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync + 'static,
    {
        let template = template.into();
        let message_id = Self::render(&template, &RejectedAttributes::new());
        Self {
            hook: Arc::new(hook),
            template,
            message_id,
        }
    }

    fn render(template: &str, attributes: &RejectedAttributes) -> String {
        template.replace("{attributes}", &attribute_names(attributes))
    }
}

impl fmt::Debug for RejectFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectFn").field("template", &self.template).finish()
    }
}

impl RejectAttributeChecker for RejectFn {
    fn reject_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        (self.hook)(address, attribute_name, value, context)
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        Self::render(&self.template, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ManagementModel, Resource};
    use crate::transform::context::{ModelVersion, TargetType, TransformationTarget};

    fn context() -> TransformationContext {
        TransformationContext::new(
            TransformationTarget::new("h", ModelVersion::new(1, 0, 0), TargetType::Host),
            Arc::new(ManagementModel::new(Resource::new())),
        )
    }

    fn rejected(names: &[&str]) -> RejectedAttributes {
        names
            .iter()
            .map(|n| (n.to_string(), Value::from(true)))
            .collect()
    }

    #[test]
    fn test_expressions() {
        let ctx = context();
        let checker = RejectExpressions::new();
        let address = PathAddress::empty();
        assert!(checker.reject_resource_attribute(&address, "a", &Value::expression("${foo}"), &ctx));
        assert!(checker.reject_operation_parameter(&address, "a", &Value::string("${foo}"), &Value::object(), &ctx));
        assert!(!checker.reject_resource_attribute(&address, "a", &Value::from(5), &ctx));
        assert!(!checker.reject_resource_attribute(&address, "a", &Value::Undefined, &ctx));
    }

    #[test]
    fn test_defined_and_undefined() {
        let ctx = context();
        let address = PathAddress::empty();
        assert!(RejectDefined::new().reject_resource_attribute(&address, "a", &Value::from(false), &ctx));
        assert!(!RejectDefined::new().reject_resource_attribute(&address, "a", &Value::Undefined, &ctx));
        assert!(RejectUndefined::new().reject_resource_attribute(&address, "a", &Value::Undefined, &ctx));
        assert!(!RejectUndefined::new().reject_resource_attribute(&address, "a", &Value::from(1), &ctx));
    }

    #[test]
    fn test_message_names_every_attribute() {
        let checker = RejectDefined::new();
        let message = checker.rejection_log_message(&rejected(&["a", "b"]));
        assert!(message.contains("[a, b]"));
    }

    #[test]
    fn test_message_id_is_stable_and_shared() {
        assert_eq!(
            RejectExpressions::new().rejection_log_message_id(),
            RejectExpressions::default().rejection_log_message_id()
        );
        assert_ne!(
            RejectExpressions::new().rejection_log_message_id(),
            RejectDefined::new().rejection_log_message_id()
        );
        let list = ListRejectAttributeChecker::new(RejectExpressions::new());
        assert_eq!(
            list.rejection_log_message_id(),
            RejectExpressions::new().rejection_log_message_id()
        );
    }

    #[test]
    fn test_value_checker() {
        let ctx = context();
        let checker = RejectValue::new(vec![Value::string("legacy-unsupported")]);
        let address = PathAddress::empty();
        assert!(checker.reject_resource_attribute(&address, "mode", &Value::string("legacy-unsupported"), &ctx));
        assert!(!checker.reject_resource_attribute(&address, "mode", &Value::string("ok"), &ctx));
        let mut attributes = RejectedAttributes::new();
        attributes.insert("mode".to_string(), Value::string("legacy-unsupported"));
        assert!(checker.rejection_log_message(&attributes).contains("mode=\"legacy-unsupported\""));
    }

    #[test]
    fn test_value_checker_default_rejects_nothing() {
        let ctx = context();
        let address = PathAddress::empty();
        let checker = RejectValue::default();
        assert!(!checker.reject_resource_attribute(&address, "mode", &Value::string("legacy-unsupported"), &ctx));

        let checker = RejectValue::default().with_value("legacy-unsupported").with_value(0);
        assert!(checker.reject_resource_attribute(&address, "mode", &Value::string("legacy-unsupported"), &ctx));
        assert!(checker.reject_resource_attribute(&address, "mode", &Value::Int(0), &ctx));
        assert_eq!(
            checker.rejection_log_message_id(),
            RejectValue::new(Vec::new()).rejection_log_message_id()
        );
    }

    #[test]
    fn test_list_checker() {
        let ctx = context();
        let checker = ListRejectAttributeChecker::new(RejectExpressions::new());
        let address = PathAddress::empty();
        let list = Value::List(vec![Value::string("a"), Value::expression("${b}")]);
        assert!(checker.reject_resource_attribute(&address, "l", &list, &ctx));
        assert!(!checker.reject_resource_attribute(&address, "l", &Value::List(vec![Value::string("a")]), &ctx));
    }

    #[test]
    fn test_object_fields_checker() {
        let ctx = context();
        let checker = ObjectFieldsRejectAttributeChecker::new()
            .with_field("host", RejectExpressions::new())
            .with_field("port", RejectUndefined::new());
        let address = PathAddress::empty();

        let ok = Value::object().with("host", "localhost").with("port", 80);
        assert!(!checker.reject_resource_attribute(&address, "o", &ok, &ctx));

        let missing_port = Value::object().with("host", "localhost");
        assert!(checker.reject_resource_attribute(&address, "o", &missing_port, &ctx));

        let expression_host = Value::object().with("host", "${h}").with("port", 80);
        assert!(checker.reject_resource_attribute(&address, "o", &expression_host, &ctx));

        assert!(checker.rejection_log_message_id().contains("[host, port]"));
    }

    #[test]
    fn test_closure_checker() {
        let ctx = context();
        let checker = RejectFn::new("Attributes {attributes} are too large", |_, _, v, _| {
            v.as_long().map(|n| n > 100).unwrap_or(false)
        });
        let address = PathAddress::empty();
        assert!(checker.reject_resource_attribute(&address, "size", &Value::from(101), &ctx));
        assert!(!checker.reject_resource_attribute(&address, "size", &Value::from(1), &ctx));
        assert_eq!(
            checker.rejection_log_message(&rejected(&["size"])),
            "Attributes [size] are too large"
        );
        assert_eq!(checker.rejection_log_message_id(), "Attributes [] are too large");
    }
}
