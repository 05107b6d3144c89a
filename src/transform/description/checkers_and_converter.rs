//! Combined discard, reject and convert policy
//!
//! [`DefaultCheckersAndConverter`] is one value acting as all three policies
//! for an attribute, so subsystem code supplies just the reject and convert
//! decisions and gets the operation-parameter and resource-attribute
//! dispatch of each trait for free.

use std::fmt;
use std::sync::Arc;

use crate::error::TransformResult;
use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;
use crate::transform::description::convert::AttributeConverter;
use crate::transform::description::discard::DiscardAttributeChecker;
use crate::transform::description::reject::{RejectAttributeChecker, RejectedAttributes};

type Predicate = dyn Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync;
type Converter =
    dyn Fn(&PathAddress, &str, &mut Value, &TransformationContext) -> TransformResult<()> + Send + Sync;

/// Discard checker, reject checker and converter in one
#[derive(Clone)]
pub struct DefaultCheckersAndConverter {
    discard_expressions: bool,
    discard_undefined: bool,
    discard: Option<Arc<Predicate>>,
    reject: Option<Arc<Predicate>>,
    convert: Option<Arc<Converter>>,
    template: String,
    message_id: String,
}

impl DefaultCheckersAndConverter {
    /// New policy whose rejection message is `template`, with `{attributes}`
    /// replaced by the rejected attribute names
    ///
    /// Discards undefined values, never discards expressions, rejects nothing
    /// and converts nothing until configured.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let message_id = render(&template, &RejectedAttributes::new());
        Self {
            discard_expressions: false,
            discard_undefined: true,
            discard: None,
            reject: None,
            convert: None,
            template,
            message_id,
        }
    }

    pub fn with_discard_flags(mut self, discard_expressions: bool, discard_undefined: bool) -> Self {
        self.discard_expressions = discard_expressions;
        self.discard_undefined = discard_undefined;
        self
    }

    pub fn with_discard<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync + 'static,
    {
        self.discard = Some(Arc::new(hook));
        self
    }

    pub fn with_reject<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &Value, &TransformationContext) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(hook));
        self
    }

    pub fn with_convert<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PathAddress, &str, &mut Value, &TransformationContext) -> TransformResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.convert = Some(Arc::new(hook));
        self
    }
}

fn render(template: &str, attributes: &RejectedAttributes) -> String {
    let names = attributes.keys().cloned().collect::<Vec<_>>().join(", ");
    template.replace("{attributes}", &format!("[{}]", names))
}

impl fmt::Debug for DefaultCheckersAndConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCheckersAndConverter")
            .field("discard_expressions", &self.discard_expressions)
            .field("discard_undefined", &self.discard_undefined)
            .field("template", &self.template)
            .finish()
    }
}

impl DiscardAttributeChecker for DefaultCheckersAndConverter {
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
        self.discard
            .as_ref()
            .is_some_and(|hook| hook(address, attribute_name, value, context))
    }
}

impl RejectAttributeChecker for DefaultCheckersAndConverter {
    fn reject_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &Value,
        context: &TransformationContext,
    ) -> bool {
        self.reject
            .as_ref()
            .is_some_and(|hook| hook(address, attribute_name, value, context))
    }

    fn rejection_log_message_id(&self) -> &str {
        &self.message_id
    }

    fn rejection_log_message(&self, attributes: &RejectedAttributes) -> String {
        render(&self.template, attributes)
    }
}

impl AttributeConverter for DefaultCheckersAndConverter {
    fn convert_attribute(
        &self,
        address: &PathAddress,
        attribute_name: &str,
        value: &mut Value,
        context: &TransformationContext,
    ) -> TransformResult<()> {
        match &self.convert {
            Some(hook) => hook(address, attribute_name, value, context),
            None => Ok(()),
        }
    }
}
