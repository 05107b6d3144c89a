//! Composite operations
//!
//! Every step of a `composite` is transformed on its own. Discarded steps are
//! removed from the request sent to the target and put back into the
//! response as successful steps, so the caller sees one result per step it
//! sent. The composite is rejected when any step is, with that step's
//! failure description.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::error::TransformResult;
use crate::model::operation::{self as ops, RESULT, STEPS};
use crate::model::{ObjectMap, Value};
use crate::transform::context::TransformationContext;
use crate::transform::operation::{OperationRejectionPolicy, OperationResultTransformer, TransformedOperation};
use crate::transform::registry::TransformerRegistry;

/// Key of step `index` (zero based) in a composite result
pub fn step_key(index: usize) -> String {
    format!("step-{}", index + 1)
}

#[derive(Clone)]
enum StepOutcome {
    Discarded,
    Sent { index: usize, step: TransformedOperation },
}

/// Rejection policy and result transformer of a transformed composite
#[derive(Clone)]
struct CompositeOutcome {
    steps: Rc<Vec<StepOutcome>>,
    rejection: Rc<OnceCell<Option<String>>>,
}

impl CompositeOutcome {
    fn new(steps: Vec<StepOutcome>) -> Self {
        Self {
            steps: Rc::new(steps),
            rejection: Rc::new(OnceCell::new()),
        }
    }

    fn legacy_step_result(prepared_result: &Value, index: usize) -> Value {
        prepared_result
            .get(RESULT)
            .and_then(|result| result.get(&step_key(index)))
            .cloned()
            .unwrap_or_default()
    }

    fn sent(&self) -> impl Iterator<Item = (usize, &TransformedOperation)> {
        self.steps.iter().filter_map(|outcome| match outcome {
            StepOutcome::Sent { index, step } => Some((*index, step)),
            StepOutcome::Discarded => None,
        })
    }
}

impl OperationRejectionPolicy for CompositeOutcome {
    fn reject_operation(&self, prepared_result: &Value) -> bool {
        if self.rejection.get().is_some() {
            return true;
        }
        let rejecting = self
            .sent()
            .find(|(index, step)| step.reject_operation(&Self::legacy_step_result(prepared_result, *index)));
        match rejecting {
            Some((index, step)) => {
                let description = step.failure_description();
                debug!(step = %step_key(index), ?description, "Composite step rejected");
                let _ = self.rejection.set(description);
                true
            }
            None => false,
        }
    }

    /// Description of the rejecting step, or when rejection has not been
    /// evaluated yet the first description any sent step offers
    fn failure_description(&self) -> Option<String> {
        match self.rejection.get() {
            Some(description) => description.clone(),
            None => self.sent().find_map(|(_, step)| step.failure_description()),
        }
    }
}

impl OperationResultTransformer for CompositeOutcome {
    fn transform_result(&self, result: Value) -> Value {
        let mut steps = ObjectMap::new();
        for (position, outcome) in self.steps.iter().enumerate() {
            let step_result = match outcome {
                StepOutcome::Discarded => ops::success_result(Value::Undefined),
                StepOutcome::Sent { index, step } => step.transform_result(Self::legacy_step_result(&result, *index)),
            };
            steps.insert(step_key(position), step_result);
        }
        let mut response = result;
        if !response.is_defined() {
            response = ops::success_result(Value::Undefined);
        }
        // non-object responses are left alone
        if let Value::Object(map) = &mut response {
            map.insert(RESULT.to_string(), Value::Object(steps));
        }
        response
    }
}

/// Transform every step of the composite `operation`
pub fn transform_composite(
    registry: &TransformerRegistry,
    context: &TransformationContext,
    mut operation: Value,
) -> TransformResult<TransformedOperation> {
    let steps = match operation.remove(STEPS) {
        Some(steps) => steps.as_list()?.to_vec(),
        None => Vec::new(),
    };

    let mut sent = Vec::with_capacity(steps.len());
    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
        let transformed = registry.transform_operation(context, step)?;
        match transformed.transformed_operation() {
            Some(op) => {
                sent.push(op.clone());
                outcomes.push(StepOutcome::Sent {
                    index: sent.len() - 1,
                    step: transformed,
                });
            }
            None => outcomes.push(StepOutcome::Discarded),
        }
    }
    debug!(steps = outcomes.len(), sent = sent.len(), "Transformed composite");

    let outcome = CompositeOutcome::new(outcomes);
    let transformed = if sent.is_empty() {
        TransformedOperation::discarded()
    } else {
        operation.set(STEPS, Value::List(sent))?;
        TransformedOperation::new(operation)
    };
    Ok(transformed
        .with_rejection_policy(outcome.clone())
        .with_result_transformer(outcome))
}
