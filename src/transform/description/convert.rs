//! Attribute converters
//!
//! A converter rewrites an attribute value in place. Converters run for
//! every declared attribute, including ones missing from the input (seen as
//! undefined), so a converter can also add an attribute.

use std::fmt;
use std::sync::Arc;

use crate::error::TransformResult;
use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;

/// Rewrites an attribute value for the target
pub trait AttributeConverter: Send + Sync {
    /// The per-value rewrite both convert paths funnel into
    fn convert_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()>;

    fn convert_operation_parameter(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        _operation: &Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        self.convert_attribute(address, attribute_name, value, context)
    }

    fn convert_resource_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        self.convert_attribute(address, attribute_name, value, context)
    }
}

/// Fills an undefined value with the attribute's documented default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueConverter;

impl AttributeConverter for DefaultValueConverter {
    fn convert_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        if value.is_defined() {
            return Ok(());
        }
        let default = context
            .resource_registration_from_root(address)
            .and_then(|registration| registration.attribute(attribute_name))
            .and_then(|attribute| attribute.default_value.clone());
        if let Some(default) = default {
            *value = default;
        }
        Ok(())
    }
}

/// Replaces the value with a fixed one
#[derive(Debug, Clone)]
pub struct HardcodedValueConverter {
    value: Value,
}

impl HardcodedValueConverter {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl AttributeConverter for HardcodedValueConverter {
    fn convert_attribute(&self, _: &PathAddress, _: &str, value: &mut Value, _: &TransformationContext) -> TransformResult<()> {
        *value = self.value.clone();
        Ok(())
    }
}

type ConvertHook =
    dyn Fn(&PathAddress, &str, &mut Value, &TransformationContext) -> TransformResult<()> + Send + Sync;

/// Converter backed by a closure
#[derive(Clone)]
pub struct ConvertFn {
    hook: Arc<ConvertHook>,
}

impl ConvertFn {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &mut Value, &TransformationContext) -> TransformResult<()>
            + Send
            + Sync
            + 'static,
    {
        Self { hook: Arc::new(hook) }
    }
}

impl fmt::Debug for ConvertFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConvertFn")
    }
}

impl AttributeConverter for ConvertFn {
    fn convert_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        (self.hook)(address, attribute_name, value, context)
    }
}
