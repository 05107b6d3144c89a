//! Discard attribute checkers
//!
//! A discard checker decides whether an attribute is dropped before any
//! rejection or conversion is considered. Both decision methods go through
//! [`discard_template`], which honours the two applicability flags before
//! calling the single [`DiscardAttributeChecker::is_value_discardable`] hook:
//!
//! 1. an expression is never discarded unless the checker discards expressions;
//! 2. an undefined value is discarded when the checker discards undefined values;
//! 3. anything else is up to the hook.

use std::fmt;
use std::sync::Arc;

use crate::model::operation::{ADD, OP, WRITE_ATTRIBUTE_OPERATION};
use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::checker::SimpleExpressions;

/// Decides whether an attribute can be dropped
pub trait DiscardAttributeChecker: Send + Sync {
    /// Whether expression values may be discarded
    fn is_discard_expressions(&self) -> bool;

    /// Whether undefined values are discarded
    fn is_discard_undefined(&self) -> bool;

    /// The per-value decision both discard paths funnel into
    fn is_value_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool;

    fn is_operation_parameter_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        _operation: &Value,
        context: &TransformationContext,
    ) -> bool {
        discard_template(self, address, attribute_name, value, context)
    }

    fn is_resource_attribute_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        discard_template(self, address, attribute_name, value, context)
    }
}

/// The shared flag handling in front of the value hook
pub fn discard_template<C: DiscardAttributeChecker + ?Sized>(
    checker: &C,
    address: &PathAddress,
    attribute_name: &str,
    value: &Value,
    context: &TransformationContext,
) -> bool {
    if !checker.is_discard_expressions() && SimpleExpressions::has_expression(value) {
        return false;
    }
    if checker.is_discard_undefined() && !value.is_defined() {
        return true;
    }
    checker.is_value_discardable(address, attribute_name, value, context)
}

// ============================================================================
// Built-in checkers
// ============================================================================

/// Discards unconditionally
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardAlways;

impl DiscardAttributeChecker for DiscardAlways {
    fn is_discard_expressions(&self) -> bool {
        true
    }

    fn is_discard_undefined(&self) -> bool {
        true
    }

    fn is_value_discardable(&self, _: &PathAddress, _: &str, _: &Value, _: &TransformationContext) -> bool {
        true
    }
}

/// Discards undefined values only
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardUndefined;

impl DiscardAttributeChecker for DiscardUndefined {
    fn is_discard_expressions(&self) -> bool {
        false
    }

    fn is_discard_undefined(&self) -> bool {
        true
    }

    // undefined values never reach the hook
    fn is_value_discardable(&self, _: &PathAddress, _: &str, _: &Value, _: &TransformationContext) -> bool {
        false
    }
}

/// Never discards
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardNever;

impl DiscardAttributeChecker for DiscardNever {
    fn is_discard_expressions(&self) -> bool {
        false
    }

    fn is_discard_undefined(&self) -> bool {
        false
    }

    fn is_value_discardable(&self, _: &PathAddress, _: &str, _: &Value, _: &TransformationContext) -> bool {
        false
    }
}

/// Discards values equal to the attribute's documented default
///
/// Resource attributes compare against the attribute definition registered
/// at the address. Operation parameters of `write-attribute` do the same
/// for the attribute being written; for any other operation the operation's
/// own parameter definition is used, falling back to the attribute
/// definition for `add`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardDefaultValue;

impl DiscardDefaultValue {
    fn attribute_default(
        address: &PathAddress,
        attribute_name: &str,
        context: &TransformationContext,
    ) -> Option<Value> {
        context
            .resource_registration_from_root(address)?
            .attribute(attribute_name)?
            .default_value
            .clone()
    }

    fn parameter_default(
        address: &PathAddress,
        operation_name: &str,
        parameter_name: &str,
        context: &TransformationContext,
    ) -> Option<Value> {
        let registration = context.resource_registration_from_root(address)?;
        let declared = registration
            .operation(operation_name)
            .and_then(|op| op.parameter(parameter_name));
        match declared {
            Some(parameter) => parameter.default_value.clone(),
            None if operation_name == ADD => Self::attribute_default(address, parameter_name, context),
            None => None,
        }
    }
}

impl DiscardAttributeChecker for DiscardDefaultValue {
    fn is_discard_expressions(&self) -> bool {
        false
    }

    fn is_discard_undefined(&self) -> bool {
        true
    }

    fn is_value_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        Self::attribute_default(address, attribute_name, context).as_ref() == Some(value)
    }

    fn is_operation_parameter_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        operation: &Value,
        context: &TransformationContext,
    ) -> bool {
        if SimpleExpressions::has_expression(value) {
            return false;
        }
        if !value.is_defined() {
            return true;
        }
        let operation_name = operation.get(OP).and_then(Value::as_str).unwrap_or_default();
        let default = if operation_name == WRITE_ATTRIBUTE_OPERATION {
            Self::attribute_default(address, attribute_name, context)
        } else {
            Self::parameter_default(address, operation_name, attribute_name, context)
        };
        default.as_ref() == Some(value)
    }
}

/// Discards undefined values and values on a fixed allow-list
///
/// Expressions are never matched against the allow-list.
#[derive(Debug, Clone)]
pub struct DiscardAttributeValueChecker {
    values: Vec<Value>,
    discard_expressions: bool,
    discard_undefined: bool,
}

impl DiscardAttributeValueChecker {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            discard_expressions: false,
            discard_undefined: true,
        }
    }

    /// Keep undefined values instead of discarding them
    pub fn keep_undefined(mut self) -> Self {
        self.discard_undefined = false;
        self
    }
}

impl DiscardAttributeChecker for DiscardAttributeValueChecker {
    fn is_discard_expressions(&self) -> bool {
        self.discard_expressions
    }

    fn is_discard_undefined(&self) -> bool {
        self.discard_undefined
    }

    fn is_value_discardable(&self, _: &PathAddress, _: &str, value: &Value, _: &TransformationContext) -> bool {
        !value.is_expression() && self.values.contains(value)
    }
}

type DiscardPredicate = dyn Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync;

/// Discard checker backed by a closure hook
#[derive(Clone)]
pub struct DiscardFn {
    discard_expressions: bool,
    discard_undefined: bool,
    hook: Arc<DiscardPredicate>,
}

impl DiscardFn {
    pub fn new<F>(discard_expressions: bool, discard_undefined: bool, hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync + 'static,
    {
        Self {
            discard_expressions,
            discard_undefined,
            hook: Arc::new(hook),
        }
    }
}

impl fmt::Debug for DiscardFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscardFn")
            .field("discard_expressions", &self.discard_expressions)
            .field("discard_undefined", &self.discard_undefined)
            .finish()
    }
}

impl DiscardAttributeChecker for DiscardFn {
    fn is_discard_expressions(&self) -> bool {
        self.discard_expressions
    }

    fn is_discard_undefined(&self) -> bool {
        self.discard_undefined
    }

    fn is_value_discardable(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        (self.hook)(address, attribute_name, value, context)
    }
}
