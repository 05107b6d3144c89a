//! Operation and response helpers
//!
//! An operation is an object value carrying the operation name under
//! `operation`, the target address under `address`, and its parameters as
//! further keys. A response carries `outcome` plus either `result` or
//! `failure-description`.

use crate::error::ValueError;
use crate::model::{PathAddress, Value};

pub const OP: &str = "operation";
pub const OP_ADDR: &str = "address";
pub const NAME: &str = "name";
pub const VALUE: &str = "value";
pub const SUBSYSTEM: &str = "subsystem";

pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const WRITE_ATTRIBUTE_OPERATION: &str = "write-attribute";
pub const UNDEFINE_ATTRIBUTE_OPERATION: &str = "undefine-attribute";
pub const READ_ATTRIBUTE_OPERATION: &str = "read-attribute";
pub const READ_RESOURCE_OPERATION: &str = "read-resource";
pub const COMPOSITE: &str = "composite";
pub const STEPS: &str = "steps";

pub const OUTCOME: &str = "outcome";
pub const SUCCESS: &str = "success";
pub const FAILED: &str = "failed";
pub const RESULT: &str = "result";
pub const FAILURE_DESCRIPTION: &str = "failure-description";

/// Operations that never change the model and are forwarded as-is
pub const READ_ONLY_OPERATIONS: &[&str] = &[
    READ_ATTRIBUTE_OPERATION,
    READ_RESOURCE_OPERATION,
    "read-resource-description",
    "read-operation-names",
    "read-operation-description",
    "read-children-names",
    "read-children-types",
    "read-children-resources",
];

/// Build an operation value for `name` at `address`
pub fn create_operation(name: &str, address: &PathAddress) -> Value {
    Value::object()
        .with(OP, name)
        .with(OP_ADDR, address.to_value())
}

/// Name of `operation`
pub fn operation_name(operation: &Value) -> Result<String, ValueError> {
    operation.require(OP)?.as_string()
}

/// Target address of `operation`; a missing address is the root
pub fn operation_address(operation: &Value) -> Result<PathAddress, ValueError> {
    PathAddress::from_value(operation.get_or_undefined(OP_ADDR))
}

/// Whether `name` is a read-only operation
pub fn is_read_only(name: &str) -> bool {
    READ_ONLY_OPERATIONS.contains(&name)
}

/// Parameter names of `operation`, excluding the name and address keys
pub fn parameter_names(operation: &Value) -> Vec<String> {
    operation
        .keys()
        .into_iter()
        .filter(|k| *k != OP && *k != OP_ADDR)
        .map(str::to_string)
        .collect()
}

/// A successful response with `result`
pub fn success_result(result: Value) -> Value {
    let response = Value::object().with(OUTCOME, SUCCESS);
    if result.is_defined() {
        response.with(RESULT, result)
    } else {
        response
    }
}

/// A failed response carrying `description`
pub fn failed_result(description: impl Into<String>) -> Value {
    Value::object()
        .with(OUTCOME, FAILED)
        .with(FAILURE_DESCRIPTION, description.into())
}

/// Whether `response` reports success
pub fn is_success(response: &Value) -> bool {
    response.get(OUTCOME).and_then(Value::as_str) == Some(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_operation() {
        let address: PathAddress = "/subsystem=foo".parse().unwrap();
        let op = create_operation(ADD, &address).with("feature-x", true);
        assert_eq!(operation_name(&op).unwrap(), "add");
        assert_eq!(operation_address(&op).unwrap(), address);
        assert_eq!(parameter_names(&op), vec!["feature-x".to_string()]);
    }

    #[test]
    fn test_missing_operation_name() {
        let op = Value::object().with("foo", 1);
        assert_eq!(
            operation_name(&op).unwrap_err(),
            ValueError::MissingKey(OP.to_string())
        );
        assert!(operation_address(&op).unwrap().is_empty());
    }

    #[test]
    fn test_responses() {
        let ok = success_result(Value::from(5));
        assert!(is_success(&ok));
        assert_eq!(ok.get(RESULT), Some(&Value::Int(5)));
        assert!(!success_result(Value::Undefined).has(RESULT));

        let failed = failed_result("nope");
        assert!(!is_success(&failed));
        assert_eq!(failed.get(FAILURE_DESCRIPTION).and_then(Value::as_str), Some("nope"));
    }

    #[test]
    fn test_read_only_operations() {
        assert!(is_read_only("read-resource"));
        assert!(is_read_only("read-children-names"));
        assert!(!is_read_only("write-attribute"));
    }
}
