//! Attribute transformation requirement checkers
//!
//! Pure predicates deciding whether an attribute value needs transforming
//! for the target, used as building blocks by the discard and reject
//! checkers.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Value;
use crate::transform::context::TransformationContext;

/// Matches a string containing `${` followed later by `}`
static EXPRESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\{.*\}").expect("Invalid expression pattern"));

/// Whether `s` contains an unresolved expression
pub fn contains_expression(s: &str) -> bool {
    EXPRESSION_PATTERN.is_match(s)
}

/// Decides whether an attribute value requires transformation
pub trait AttributeTransformationRequirementChecker: Send + Sync {
    /// Must not mutate `value`
    fn is_attribute_transformation_required(
        &self,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool;
}

/// True when any reachable string or expression leaf is an unresolved expression
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleExpressions;

pub const SIMPLE_EXPRESSIONS: SimpleExpressions = SimpleExpressions;

impl SimpleExpressions {
    /// The value-only form of the check
    pub fn has_expression(value: &Value) -> bool {
        match value {
            Value::String(s) | Value::Expression(s) => contains_expression(s),
            Value::List(items) => items.iter().any(Self::has_expression),
            Value::Object(map) => map.iter().any(|(_, v)| Self::has_expression(v)),
            Value::Property(_, v) => Self::has_expression(v),
            _ => false,
        }
    }
}

impl AttributeTransformationRequirementChecker for SimpleExpressions {
    fn is_attribute_transformation_required(
        &self,
        _attribute_name: &str,
        value: &Value,
        _context: &TransformationContext,
    ) -> bool {
        Self::has_expression(value)
    }
}

/// Applies an element checker to every entry of a list value
#[derive(Clone)]
pub struct ListRequirementChecker {
    element: Arc<dyn AttributeTransformationRequirementChecker>,
}

impl ListRequirementChecker {
    pub fn new(element: impl AttributeTransformationRequirementChecker + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }
}

impl AttributeTransformationRequirementChecker for ListRequirementChecker {
    fn is_attribute_transformation_required(
        &self,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        match value {
            Value::List(items) => items.iter().any(|item| {
                self.element
                    .is_attribute_transformation_required(attribute_name, item, context)
            }),
            _ => false,
        }
    }
}

/// Applies a named checker to each declared field of an object value
///
/// A missing field is checked as undefined.
#[derive(Clone, Default)]
pub struct ObjectFieldsRequirementChecker {
    fields: Vec<(String, Arc<dyn AttributeTransformationRequirementChecker>)>,
}

impl ObjectFieldsRequirementChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        field: impl Into<String>,
        checker: impl AttributeTransformationRequirementChecker + 'static,
    ) -> Self {
        self.fields.push((field.into(), Arc::new(checker)));
        self
    }
}

impl AttributeTransformationRequirementChecker for ObjectFieldsRequirementChecker {
    fn is_attribute_transformation_required(
        &self,
        _attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.fields.iter().any(|(field, checker)| {
            checker.is_attribute_transformation_required(field, value.get_or_undefined(field), context)
        })
    }
}
