//! Attribute transformation descriptions
//!
//! An [`AttributeTransformationDescription`] bundles the discard checker,
//! reject checkers, converter and rename declared for one attribute. The
//! [`AttributeTransformationDescriptionBuilder`] collects those declarations
//! for a resource or an operation override.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BuildResult, BuilderError, TransformResult};
use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::checkers_and_converter::DefaultCheckersAndConverter;
use crate::transform::description::convert::AttributeConverter;
use crate::transform::description::discard::DiscardAttributeChecker;
use crate::transform::description::reject::{ObjectFieldsRejectAttributeChecker, RejectAttributeChecker};

/// Everything declared for one attribute
#[derive(Clone, Default)]
pub struct AttributeTransformationDescription {
    name: String,
    discard: Option<Arc<dyn DiscardAttributeChecker>>,
    rejects: Vec<Arc<dyn RejectAttributeChecker>>,
    converter: Option<Arc<dyn AttributeConverter>>,
    new_name: Option<String>,
}

impl AttributeTransformationDescription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the attribute has on the target
    pub fn new_name(&self) -> Option<&str> {
        self.new_name.as_deref()
    }

    pub fn is_discarded_resource_attribute(
        &self,
        address: &PathAddress,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.discard
            .as_ref()
            .is_some_and(|d| d.is_resource_attribute_discardable(address, &self.name, value, context))
    }

    pub fn is_discarded_operation_parameter(
        &self,
        address: &PathAddress,
        value: &Value,
        operation: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.discard.as_ref().is_some_and(|d| {
            d.is_operation_parameter_discardable(address, &self.name, value, operation, context)
        })
    }

    /// Reject checkers that reject `value` as a resource attribute
    pub fn rejecting_resource_checkers(
        &self,
        address: &PathAddress,
        value: &Value,
        context: &TransformationContext,
    ) -> Vec<Arc<dyn RejectAttributeChecker>> {
        self.rejects
            .iter()
            .filter(|r| r.reject_resource_attribute(address, &self.name, value, context))
            .cloned()
            .collect()
    }

    /// Reject checkers that reject `value` as an operation parameter
    pub fn rejecting_operation_checkers(
        &self,
        address: &PathAddress,
        value: &Value,
        operation: &Value,
        context: &TransformationContext,
    ) -> Vec<Arc<dyn RejectAttributeChecker>> {
        self.rejects
            .iter()
            .filter(|r| r.reject_operation_parameter(address, &self.name, value, operation, context))
            .cloned()
            .collect()
    }

    pub fn convert_resource_attribute(
        &self,
        address: &PathAddress,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        match &self.converter {
            Some(converter) => converter.convert_resource_attribute(address, &self.name, value, context),
            None => Ok(()),
        }
    }

    pub fn convert_operation_parameter(
        &self,
        address: &PathAddress,
        value: &mut Value,
        operation: &Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        match &self.converter {
            Some(converter) => {
                converter.convert_operation_parameter(address, &self.name, value, operation, context)
            }
            None => Ok(()),
        }
    }

    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }
}

impl fmt::Debug for AttributeTransformationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeTransformationDescription")
            .field("name", &self.name)
            .field("discard", &self.discard.is_some())
            .field("rejects", &self.rejects.len())
            .field("converter", &self.converter.is_some())
            .field("new_name", &self.new_name)
            .finish()
    }
}

/// Replace every description in `base` that `overrides` redeclares
pub fn merge_descriptions(
    base: &[AttributeTransformationDescription],
    overrides: &[AttributeTransformationDescription],
) -> Vec<AttributeTransformationDescription> {
    let mut merged: Vec<_> = base
        .iter()
        .filter(|b| overrides.iter().all(|o| o.name != b.name))
        .cloned()
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}

// ============================================================================
// Builder
// ============================================================================

/// Collects per-attribute declarations
///
/// Declaration order is kept and drives rule evaluation order.
#[derive(Default)]
pub struct AttributeTransformationDescriptionBuilder {
    path: String,
    order: Vec<String>,
    attributes: BTreeMap<String, AttributeTransformationDescription>,
    field_rejects: BTreeMap<String, ObjectFieldsRejectAttributeChecker>,
}

impl AttributeTransformationDescriptionBuilder {
    /// Builder for the resource at `path`, used in error messages
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    fn entry(&mut self, attribute: &str) -> &mut AttributeTransformationDescription {
        if !self.attributes.contains_key(attribute) {
            self.order.push(attribute.to_string());
        }
        self.attributes
            .entry(attribute.to_string())
            .or_insert_with(|| AttributeTransformationDescription {
                name: attribute.to_string(),
                ..AttributeTransformationDescription::default()
            })
    }

    /// Whether any declaration exists for `attribute`
    pub fn is_declared(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    /// Discard `attributes` when `checker` says so; replaces any earlier discard
    pub fn set_discard(
        &mut self,
        checker: impl DiscardAttributeChecker + 'static,
        attributes: &[&str],
    ) -> &mut Self {
        let checker: Arc<dyn DiscardAttributeChecker> = Arc::new(checker);
        for attribute in attributes {
            self.entry(attribute).discard = Some(checker.clone());
        }
        self
    }

    /// Add a reject check to `attributes`; checks run in the order added
    pub fn add_reject_check(
        &mut self,
        checker: impl RejectAttributeChecker + 'static,
        attributes: &[&str],
    ) -> &mut Self {
        let checker: Arc<dyn RejectAttributeChecker> = Arc::new(checker);
        for attribute in attributes {
            self.entry(attribute).rejects.push(checker.clone());
        }
        self
    }

    /// Convert `attributes` with `converter`; replaces any earlier converter
    pub fn set_value_converter(
        &mut self,
        converter: impl AttributeConverter + 'static,
        attributes: &[&str],
    ) -> &mut Self {
        let converter: Arc<dyn AttributeConverter> = Arc::new(converter);
        for attribute in attributes {
            self.entry(attribute).converter = Some(converter.clone());
        }
        self
    }

    /// Use one combined policy as the discard checker, a reject check and
    /// the converter of `attributes`
    pub fn set_checkers_and_converter(
        &mut self,
        policy: DefaultCheckersAndConverter,
        attributes: &[&str],
    ) -> &mut Self {
        let policy = Arc::new(policy);
        for attribute in attributes {
            let entry = self.entry(attribute);
            entry.discard = Some(policy.clone());
            entry.rejects.push(policy.clone());
            entry.converter = Some(policy.clone());
        }
        self
    }

    /// Rename `attribute` to `new_name` on the target
    pub fn add_rename(&mut self, attribute: &str, new_name: &str) -> BuildResult<&mut Self> {
        if let Some(existing) = self.attributes.get(attribute).and_then(|a| a.new_name.clone()) {
            return Err(BuilderError::DuplicateRename {
                path: self.path.clone(),
                attribute: attribute.to_string(),
                existing,
            });
        }
        self.entry(attribute).new_name = Some(new_name.to_string());
        Ok(self)
    }

    /// Reject `attribute` when the named field of its object value is rejected
    ///
    /// The attribute must already be declared on this builder.
    pub fn add_field_reject_check(
        &mut self,
        attribute: &str,
        field: &str,
        checker: impl RejectAttributeChecker + 'static,
    ) -> BuildResult<&mut Self> {
        if !self.is_declared(attribute) {
            return Err(BuilderError::UnknownField {
                path: self.path.clone(),
                attribute: attribute.to_string(),
                field: field.to_string(),
            });
        }
        let fields = self.field_rejects.remove(attribute).unwrap_or_default();
        self.field_rejects
            .insert(attribute.to_string(), fields.with_field(field, checker));
        Ok(self)
    }

    /// Descriptions in declaration order
    pub fn build(self) -> Vec<AttributeTransformationDescription> {
        let Self {
            order,
            mut attributes,
            mut field_rejects,
            ..
        } = self;
        order
            .into_iter()
            .filter_map(|name| {
                let mut description = attributes.remove(&name)?;
                if let Some(fields) = field_rejects.remove(&name) {
                    description.rejects.push(Arc::new(fields));
                }
                Some(description)
            })
            .collect()
    }
}

impl fmt::Debug for AttributeTransformationDescriptionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeTransformationDescriptionBuilder")
            .field("path", &self.path)
            .field("attributes", &self.order)
            .finish()
    }
}
