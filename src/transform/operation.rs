//! Transformed operations
//!
//! A [`TransformedOperation`] is what an [`OperationTransformer`] hands back
//! to the kernel: the rewritten operation (or none when it was discarded), a
//! rejection policy deciding after execution whether the real outcome must be
//! reported as a failure, and a result transformer mapping the legacy result
//! back to the shape the caller expects.
//!
//! [`ChainedTransformedOperation`] merges the outcome of several rules: the
//! first rejecting delegate wins and its description is kept, and result
//! transformation runs through the delegates in reverse order.

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::error::TransformResult;
use crate::model::operation::{self as ops, OP};
use crate::model::{PathAddress, Value};
use crate::transform::context::TransformationContext;

// ============================================================================
// Policies
// ============================================================================

/// Decides whether the outcome of a transformed operation is a failure
pub trait OperationRejectionPolicy {
    /// Whether the operation must be reported as failed given the prepared
    /// result returned by the legacy target
    fn reject_operation(&self, prepared_result: &Value) -> bool;

    /// Failure description to report when rejected
    fn failure_description(&self) -> Option<String>;
}

/// Maps the legacy result back for the original caller
pub trait OperationResultTransformer {
    fn transform_result(&self, result: Value) -> Value;
}

impl<F> OperationResultTransformer for F
where
    F: Fn(Value) -> Value,
{
    fn transform_result(&self, result: Value) -> Value {
        self(result)
    }
}

/// Never rejects
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReject;

impl OperationRejectionPolicy for NeverReject {
    fn reject_operation(&self, _prepared_result: &Value) -> bool {
        false
    }

    fn failure_description(&self) -> Option<String> {
        None
    }
}

/// Always rejects with a fixed description
#[derive(Debug, Clone)]
pub struct RejectWith(pub String);

impl OperationRejectionPolicy for RejectWith {
    fn reject_operation(&self, _prepared_result: &Value) -> bool {
        true
    }

    fn failure_description(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Returns the legacy result unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalResult;

impl OperationResultTransformer for OriginalResult {
    fn transform_result(&self, result: Value) -> Value {
        result
    }
}

/// Replaces the legacy result with a plain success, used for discarded operations
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessfulResult;

impl OperationResultTransformer for SuccessfulResult {
    fn transform_result(&self, _result: Value) -> Value {
        ops::success_result(Value::Undefined)
    }
}

// ============================================================================
// TransformedOperation
// ============================================================================

/// Result of transforming one operation
#[derive(Clone)]
pub struct TransformedOperation {
    operation: Option<Value>,
    rejection_policy: Rc<dyn OperationRejectionPolicy>,
    result_transformer: Rc<dyn OperationResultTransformer>,
}

impl TransformedOperation {
    /// Forward `operation` with no rejection and the original result
    pub fn new(operation: Value) -> Self {
        Self {
            operation: Some(operation),
            rejection_policy: Rc::new(NeverReject),
            result_transformer: Rc::new(OriginalResult),
        }
    }

    /// A discarded operation: nothing is sent and the caller sees success
    pub fn discarded() -> Self {
        Self {
            operation: None,
            rejection_policy: Rc::new(NeverReject),
            result_transformer: Rc::new(SuccessfulResult),
        }
    }

    /// Forward `operation` but reject its outcome with `description`
    pub fn rejected(operation: Value, description: impl Into<String>) -> Self {
        Self::new(operation).with_rejection_policy(RejectWith(description.into()))
    }

    pub fn with_rejection_policy(mut self, policy: impl OperationRejectionPolicy + 'static) -> Self {
        self.rejection_policy = Rc::new(policy);
        self
    }

    pub fn with_result_transformer(mut self, transformer: impl OperationResultTransformer + 'static) -> Self {
        self.result_transformer = Rc::new(transformer);
        self
    }

    /// Merge `delegates`, in registration order, into one result
    ///
    /// The rewritten operation is the last delegate's.
    pub fn chained(delegates: Vec<TransformedOperation>) -> Self {
        let operation = delegates.last().and_then(|d| d.operation.clone());
        let chained = Rc::new(ChainedTransformedOperation::new(delegates));
        Self {
            operation,
            rejection_policy: chained.clone(),
            result_transformer: chained,
        }
    }

    /// Rewrite the operation to send, keeping both policies
    pub fn map_operation<F>(mut self, f: F) -> TransformResult<Self>
    where
        F: FnOnce(Value) -> TransformResult<Value>,
    {
        self.operation = self.operation.map(f).transpose()?;
        Ok(self)
    }

    /// The operation to send, `None` when discarded
    pub fn transformed_operation(&self) -> Option<&Value> {
        self.operation.as_ref()
    }

    pub fn into_operation(self) -> Option<Value> {
        self.operation
    }

    pub fn is_discarded(&self) -> bool {
        self.operation.is_none()
    }

    pub fn rejection_policy(&self) -> &dyn OperationRejectionPolicy {
        self.rejection_policy.as_ref()
    }

    pub fn result_transformer(&self) -> &dyn OperationResultTransformer {
        self.result_transformer.as_ref()
    }

    /// Outcome a caller sees for `legacy_result`
    ///
    /// A rejected operation becomes a failed response with the failure
    /// description; otherwise the result transformer is applied.
    pub fn resolve_result(&self, legacy_result: Value) -> Value {
        if self.reject_operation(&legacy_result) {
            let description = self
                .failure_description()
                .unwrap_or_else(|| "Operation rejected by the target".to_string());
            return ops::failed_result(description);
        }
        self.transform_result(legacy_result)
    }
}

impl OperationRejectionPolicy for TransformedOperation {
    fn reject_operation(&self, prepared_result: &Value) -> bool {
        self.rejection_policy.reject_operation(prepared_result)
    }

    fn failure_description(&self) -> Option<String> {
        self.rejection_policy.failure_description()
    }
}

impl OperationResultTransformer for TransformedOperation {
    fn transform_result(&self, result: Value) -> Value {
        self.result_transformer.transform_result(result)
    }
}

impl fmt::Debug for TransformedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformedOperation")
            .field("operation", &self.operation)
            .field("failure_description", &self.failure_description())
            .finish()
    }
}

// ============================================================================
// ChainedTransformedOperation
// ============================================================================

/// Outcome of several transformation rules applied in order
pub struct ChainedTransformedOperation {
    delegates: Vec<TransformedOperation>,
    rejection: OnceCell<Option<String>>,
}

impl ChainedTransformedOperation {
    pub fn new(delegates: Vec<TransformedOperation>) -> Self {
        Self {
            delegates,
            rejection: OnceCell::new(),
        }
    }

    pub fn delegates(&self) -> &[TransformedOperation] {
        &self.delegates
    }
}

impl OperationRejectionPolicy for ChainedTransformedOperation {
    fn reject_operation(&self, prepared_result: &Value) -> bool {
        if self.rejection.get().is_some() {
            return true;
        }
        match self
            .delegates
            .iter()
            .position(|d| d.reject_operation(prepared_result))
        {
            Some(index) => {
                let description = self.delegates[index].failure_description();
                debug!(delegate = index, ?description, "Chained operation rejected");
                // first rejection wins
                let _ = self.rejection.set(description);
                true
            }
            None => false,
        }
    }

    /// Description of the rejecting delegate, or when rejection has not been
    /// evaluated yet the first description any delegate offers
    fn failure_description(&self) -> Option<String> {
        match self.rejection.get() {
            Some(description) => description.clone(),
            None => self.delegates.iter().find_map(|d| d.failure_description()),
        }
    }
}

impl OperationResultTransformer for ChainedTransformedOperation {
    fn transform_result(&self, result: Value) -> Value {
        self.delegates
            .iter()
            .rev()
            .fold(result, |acc, delegate| delegate.transform_result(acc))
    }
}

// ============================================================================
// OperationTransformer
// ============================================================================

/// Transforms one operation for a legacy target
pub trait OperationTransformer: Send + Sync {
    fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation>;
}

impl<F> OperationTransformer for F
where
    F: Fn(&TransformationContext, &PathAddress, Value) -> TransformResult<TransformedOperation>
        + Send
        + Sync,
{
    fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        self(context, address, operation)
    }
}

/// Forwards operations unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOperationTransformer;

impl OperationTransformer for DefaultOperationTransformer {
    fn transform_operation(
        &self,
        _context: &TransformationContext,
        _address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        Ok(TransformedOperation::new(operation))
    }
}

/// Silently discards operations
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardOperationTransformer;

impl OperationTransformer for DiscardOperationTransformer {
    fn transform_operation(
        &self,
        _context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        let name = operation.get(OP).and_then(Value::as_str).unwrap_or_default();
        debug!(address = %address, operation = name, "Discarding operation");
        Ok(TransformedOperation::discarded())
    }
}

/// Rejects operations with an address-and-operation specific message
#[derive(Debug, Clone, Default)]
pub struct RejectOperationTransformer {
    detail: Option<String>,
}

impl RejectOperationTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `detail` to the rejection message
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }
}

/// Message reported when an operation is rejected outright
pub fn rejected_operation_message(
    context: &TransformationContext,
    address: &PathAddress,
    operation_name: &str,
) -> String {
    let target = context.target();
    let version = address
        .subsystem_name()
        .and_then(|name| target.subsystem_version(name))
        .unwrap_or(target.core_version);
    format!(
        "Operation '{}' against the resource at address '{}' is not supported by {} '{}' (model version {})",
        operation_name, address, target.target_type, target.host_name, version
    )
}

impl OperationTransformer for RejectOperationTransformer {
    fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Value,
    ) -> TransformResult<TransformedOperation> {
        let name = ops::operation_name(&operation)?;
        let mut message = rejected_operation_message(context, address, &name);
        if let Some(detail) = &self.detail {
            message.push_str(": ");
            message.push_str(detail);
        }
        debug!(address = %address, operation = %name, "Rejecting operation");
        context.warn(message.clone());
        Ok(TransformedOperation::rejected(operation, message))
    }
}

/// Renames operations for the legacy target
#[derive(Debug, Clone)]
pub struct RenameOperationTransformer {
    new_name: String,
}

impl RenameOperationTransformer {
    pub fn new(new_name: impl Into<String>) -> Self {
        Self {
            new_name: new_name.into(),
        }
    }
}

impl OperationTransformer for RenameOperationTransformer {
    fn transform_operation(
        &self,
        _context: &TransformationContext,
        _address: &PathAddress,
        mut operation: Value,
    ) -> TransformResult<TransformedOperation> {
        operation.set(OP, Value::string(self.new_name.as_str()))?;
        Ok(TransformedOperation::new(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::operation::{create_operation, ADD, FAILURE_DESCRIPTION, RESULT};
    use crate::model::{ManagementModel, Resource};
    use crate::transform::context::{ModelVersion, TargetType, TransformationTarget};

    fn context() -> TransformationContext {
        let target = TransformationTarget::new("slave", ModelVersion::new(1, 2, 0), TargetType::Host)
            .with_subsystem("foo", ModelVersion::new(1, 1, 0));
        TransformationContext::new(target, Arc::new(ManagementModel::new(Resource::new())))
    }

    fn tagging(tag: &'static str) -> TransformedOperation {
        TransformedOperation::new(Value::object()).with_result_transformer(move |mut result: Value| {
            let _ = result.push(Value::string(tag));
            result
        })
    }

    // ========================================================================
    // ChainedTransformedOperation
    // ========================================================================

    #[test]
    fn test_first_rejection_wins() {
        let chained = ChainedTransformedOperation::new(vec![
            TransformedOperation::new(Value::object()),
            TransformedOperation::rejected(Value::object(), "second"),
            TransformedOperation::rejected(Value::object(), "third"),
        ]);
        assert!(chained.reject_operation(&Value::Undefined));
        assert_eq!(chained.failure_description(), Some("second".to_string()));
    }

    #[test]
    fn test_no_rejection() {
        let chained = ChainedTransformedOperation::new(vec![
            TransformedOperation::new(Value::object()),
            TransformedOperation::new(Value::object()),
        ]);
        assert!(!chained.reject_operation(&Value::Undefined));
        assert_eq!(chained.failure_description(), None);
    }

    #[test]
    fn test_failure_description_before_rejection_scans_delegates() {
        let chained = ChainedTransformedOperation::new(vec![
            TransformedOperation::new(Value::object()),
            TransformedOperation::rejected(Value::object(), "scanned"),
        ]);
        assert_eq!(chained.failure_description(), Some("scanned".to_string()));
    }

    #[test]
    fn test_result_transform_runs_in_reverse() {
        let chained = ChainedTransformedOperation::new(vec![tagging("d1"), tagging("d2"), tagging("d3")]);
        let result = chained.transform_result(Value::list());
        let expected = Value::List(vec![
            Value::string("d3"),
            Value::string("d2"),
            Value::string("d1"),
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_chained_uses_last_operation() {
        let transformed = TransformedOperation::chained(vec![
            TransformedOperation::new(Value::object().with("step", 1)),
            TransformedOperation::new(Value::object().with("step", 2)),
        ]);
        assert_eq!(
            transformed.transformed_operation().and_then(|op| op.get("step")),
            Some(&Value::Int(2))
        );
    }

    // ========================================================================
    // Built-in transformers
    // ========================================================================

    #[test]
    fn test_discarded_operation_reports_success() {
        let discarded = DiscardOperationTransformer
            .transform_operation(&context(), &PathAddress::empty(), Value::object())
            .unwrap();
        assert!(discarded.is_discarded());
        let result = discarded.resolve_result(Value::Undefined);
        assert!(ops::is_success(&result));
        assert!(!result.has(RESULT));
    }

    #[test]
    fn test_reject_transformer_names_address_and_operation() {
        let address: PathAddress = "/subsystem=foo".parse().unwrap();
        let ctx = context();
        let transformed = RejectOperationTransformer::new()
            .transform_operation(&ctx, &address, create_operation(ADD, &address))
            .unwrap();
        assert!(!transformed.is_discarded());
        let warnings = ctx.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'add'"));

        let result = transformed.resolve_result(ops::success_result(Value::Undefined));
        let description = result.get(FAILURE_DESCRIPTION).and_then(Value::as_str).unwrap();
        assert!(description.contains("'add'"));
        assert!(description.contains("/subsystem=foo"));
        assert!(description.contains("1.1.0"));
    }

    #[test]
    fn test_rename_transformer() {
        let address: PathAddress = "/subsystem=foo".parse().unwrap();
        let transformed = RenameOperationTransformer::new("legacy-add")
            .transform_operation(&context(), &address, create_operation(ADD, &address))
            .unwrap();
        let op = transformed.transformed_operation().unwrap();
        assert_eq!(ops::operation_name(op).unwrap(), "legacy-add");
    }

    #[test]
    fn test_closure_transformer() {
        let transformer = |_: &TransformationContext,
                           _: &PathAddress,
                           op: Value|
         -> TransformResult<TransformedOperation> {
            Ok(TransformedOperation::new(op.with("extra", true)))
        };
        let transformed = transformer
            .transform_operation(&context(), &PathAddress::empty(), Value::object())
            .unwrap();
        assert_eq!(
            transformed.transformed_operation().and_then(|op| op.get("extra")),
            Some(&Value::Boolean(true))
        );
    }
}
