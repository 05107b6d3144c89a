//! Transformation integration tests
//!
//! Drives the public API end to end: registries declared in YAML, builders
//! used directly, operations, composites and resource trees.

use std::sync::Arc;

use dmr_transform::config::Config;
use dmr_transform::error::TransformError;
use dmr_transform::model::operation::{
    self as ops, create_operation, ADD, COMPOSITE, FAILURE_DESCRIPTION, NAME, RESULT, STEPS, UNDEFINE_ATTRIBUTE_OPERATION,
    VALUE, WRITE_ATTRIBUTE_OPERATION,
};
use dmr_transform::model::{ManagementModel, ObjectMap, PathAddress, PathElement, Resource, Value};
use dmr_transform::transform::description::{
    ChainedTransformationDescriptionBuilder, RejectExpressions, ResourceTransformationDescriptionBuilder,
};
use dmr_transform::transform::{
    DiscardUndefinedAttributesTransformer, ModelVersion, OperationRejectionPolicy, OperationTransformer,
    PathAddressConfigRegistry, TargetType, TransformationContext, TransformationTarget, TransformerRegistry,
};

const CONFIG: &str = r#"
subsystems:
  - name: foo
    versions:
      - version: "1.1.0"
        resource:
          attributes:
            - names: [feature-x]
              discard: undefined
              reject: [defined]
            - names: [a]
              reject: [expressions]
            - names: [timeout]
              rename: legacy-timeout
          operations:
            - name: map-remove
              policy: silent
            - name: custom-op
              inherit: true
              rename: legacy-op
          discard_undefined_attributes: [new-attr]
          children:
            - element: "new-thing=*"
              policy: reject-and-warn
"#;

fn addr(s: &str) -> PathAddress {
    s.parse().unwrap()
}

fn v(major: u32, minor: u32) -> ModelVersion {
    ModelVersion::new(major, minor, 0)
}

fn registry() -> TransformerRegistry {
    Config::from_yaml(CONFIG).unwrap().build_registry().unwrap()
}

fn context(core: ModelVersion) -> TransformationContext {
    TransformationContext::new(
        TransformationTarget::new("slave", core, TargetType::Host).with_subsystem("foo", v(1, 1)),
        Arc::new(ManagementModel::new(Resource::new())),
    )
}

fn write(name: &str, value: Value) -> Value {
    create_operation(WRITE_ATTRIBUTE_OPERATION, &addr("/subsystem=foo"))
        .with(NAME, name)
        .with(VALUE, value)
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_new_attribute_discarded_when_undefined_rejected_when_defined() {
    let registry = registry();
    let ctx = context(v(1, 4));

    let op = create_operation(ADD, &addr("/subsystem=foo")).with("b", 1);
    let transformed = registry.transform_operation(&ctx, op.clone()).unwrap();
    assert_eq!(transformed.transformed_operation(), Some(&op));
    assert!(!transformed.reject_operation(&Value::Undefined));

    let op = create_operation(ADD, &addr("/subsystem=foo")).with("feature-x", true);
    let transformed = registry.transform_operation(&ctx, op).unwrap();
    assert!(transformed.reject_operation(&Value::Undefined));
    let description = transformed.failure_description().unwrap();
    assert!(description.contains("[feature-x]"));
    assert!(description.contains("'slave'"));
    assert!(description.contains("1.1.0"));
}

#[test]
fn test_expression_write_rejected_citing_attribute() {
    let registry = registry();
    let ctx = context(v(1, 4));
    let transformed = registry
        .transform_operation(&ctx, write("a", Value::expression("${foo}")))
        .unwrap();

    let response = transformed.resolve_result(ops::success_result(Value::Undefined));
    assert!(!ops::is_success(&response));
    let description = response.get(FAILURE_DESCRIPTION).and_then(Value::as_str).unwrap();
    assert!(description.contains("[a]"));

    let transformed = registry.transform_operation(&ctx, write("a", Value::from("plain"))).unwrap();
    assert!(!transformed.reject_operation(&Value::Undefined));
}

#[test]
fn test_operation_overrides() {
    let registry = registry();
    let ctx = context(v(1, 4));

    let discarded = registry
        .transform_operation(&ctx, create_operation("map-remove", &addr("/subsystem=foo")))
        .unwrap();
    assert!(discarded.is_discarded());

    let op = create_operation("custom-op", &addr("/subsystem=foo")).with("timeout", 5);
    let transformed = registry.transform_operation(&ctx, op).unwrap();
    let sent = transformed.transformed_operation().unwrap();
    assert_eq!(ops::operation_name(sent).unwrap(), "legacy-op");
    assert_eq!(sent.get("legacy-timeout"), Some(&Value::Int(5)));
    assert!(!sent.has("timeout"));
}

#[test]
fn test_rejected_child_rejects_operations_below_it() {
    let registry = registry();
    let ctx = context(v(1, 4));
    let op = create_operation(ADD, &addr("/subsystem=foo/new-thing=x/deeper=y"));
    let transformed = registry.transform_operation(&ctx, op).unwrap();
    assert!(transformed.reject_operation(&Value::Undefined));
}

#[test]
fn test_composite_mixes_discarded_and_sent_steps() {
    let registry = registry();
    let ctx = context(v(1, 4));
    let op = create_operation(COMPOSITE, &PathAddress::empty()).with(
        STEPS,
        vec![
            create_operation("map-remove", &addr("/subsystem=foo")),
            write("b", Value::from(2)),
            create_operation(ADD, &addr("/subsystem=bar")),
        ],
    );
    let transformed = registry.transform_operation(&ctx, op).unwrap();
    let sent = transformed.transformed_operation().unwrap();
    assert_eq!(sent.get(STEPS).unwrap().as_list().unwrap().len(), 2);

    let mut legacy = ObjectMap::new();
    legacy.insert("step-1".to_string(), ops::success_result(Value::from("b")));
    legacy.insert("step-2".to_string(), ops::success_result(Value::from("bar")));
    let response = transformed.resolve_result(ops::success_result(Value::Object(legacy)));
    let result = response.get(RESULT).unwrap();
    assert_eq!(result.keys(), vec!["step-1", "step-2", "step-3"]);
    assert_eq!(result.get("step-2").and_then(|s| s.get(RESULT)), Some(&Value::from("b")));
    assert_eq!(result.get("step-3").and_then(|s| s.get(RESULT)), Some(&Value::from("bar")));
}

#[test]
fn test_chained_versions_register_each_target() {
    let mut chain = ChainedTransformationDescriptionBuilder::new("foo", v(3, 0));
    chain
        .create_builder(v(3, 0), v(2, 0))
        .attribute_builder()
        .add_reject_check(RejectExpressions::new(), &["a"]);
    chain
        .create_builder(v(2, 0), v(1, 0))
        .attribute_builder()
        .add_rename("b", "legacy-b")
        .unwrap();
    let mut registry = TransformerRegistry::new();
    registry.register_chained(chain, &[v(1, 0), v(2, 0)]).unwrap();

    let ctx = TransformationContext::new(
        TransformationTarget::new("slave", v(1, 4), TargetType::Host).with_subsystem("foo", v(1, 0)),
        Arc::new(ManagementModel::new(Resource::new())),
    );
    let op = create_operation(ADD, &addr("/subsystem=foo"))
        .with("a", Value::expression("${x}"))
        .with("b", 1);
    let transformed = registry.transform_operation(&ctx, op).unwrap();
    assert!(transformed.reject_operation(&Value::Undefined));
    assert_eq!(
        transformed.transformed_operation().unwrap().get("legacy-b"),
        Some(&Value::Int(1))
    );
}

// ============================================================================
// Resources
// ============================================================================

fn subsystem_with_new_attr() -> Resource {
    Resource::with_model(Value::object().with("new-attr", "set").with("b", 1))
        .with_child(PathElement::new("new-thing", "x"), Resource::new())
        .with_child(PathElement::new("old-thing", "y"), Resource::new())
}

#[test]
fn test_defined_new_attribute_fails_for_registration_aware_target() {
    let registry = registry();
    let ctx = context(v(1, 4));
    let err = registry
        .transform_resource(&ctx, &addr("/subsystem=foo"), subsystem_with_new_attr())
        .unwrap_err();
    assert!(matches!(err, TransformError::AttributesNotUnderstood { .. }));
}

#[test]
fn test_defined_new_attribute_warns_for_older_target() {
    let registry = registry();
    let ctx = context(v(1, 3));
    let transformed = registry
        .transform_resource(&ctx, &addr("/subsystem=foo"), subsystem_with_new_attr())
        .unwrap()
        .unwrap();
    assert_eq!(transformed.model().get("new-attr"), Some(&Value::from("set")));
    assert!(transformed.has_child(&PathElement::new("old-thing", "y")));
    assert!(!transformed.has_child(&PathElement::new("new-thing", "x")));

    let warnings = ctx.warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|w| w.contains("[new-attr]")));
    assert!(warnings.iter().any(|w| w.contains("/subsystem=foo/new-thing=x")));
}

#[test]
fn test_undefined_new_attribute_is_dropped() {
    let registry = registry();
    let ctx = context(v(1, 4));
    let resource = Resource::with_model(Value::object().with("new-attr", Value::Undefined).with("b", 1));
    let transformed = registry
        .transform_resource(&ctx, &addr("/subsystem=foo"), resource)
        .unwrap()
        .unwrap();
    assert!(!transformed.model().has("new-attr"));
    assert!(ctx.warnings().is_empty());
}

#[test]
fn test_discard_undefined_attributes_on_operations() {
    let transformer = DiscardUndefinedAttributesTransformer::new(&["new-attr"]);
    let ctx = context(v(1, 4));
    let address = addr("/subsystem=foo");

    let undefine = create_operation(UNDEFINE_ATTRIBUTE_OPERATION, &address).with(NAME, "new-attr");
    assert!(transformer
        .transform_operation(&ctx, &address, undefine)
        .unwrap()
        .is_discarded());

    let defined = write("new-attr", Value::from(1));
    let transformed = transformer.transform_operation(&ctx, &address, defined).unwrap();
    assert!(transformed.reject_operation(&Value::Undefined));

    let add = create_operation(ADD, &address).with("new-attr", Value::Undefined).with("b", 1);
    let transformed = transformer.transform_operation(&ctx, &address, add).unwrap();
    let sent = transformed.transformed_operation().unwrap();
    assert!(!sent.has("new-attr"));
    assert!(!transformed.reject_operation(&Value::Undefined));
}

#[test]
fn test_nested_resource_through_chained_hops() {
    let mut chain = ChainedTransformationDescriptionBuilder::new("foo", v(3, 0));
    chain
        .create_builder(v(3, 0), v(2, 0))
        .add_child_redirection(PathElement::wildcard("bar"), PathElement::wildcard("baz"))
        .unwrap()
        .attribute_builder()
        .add_rename("c", "b")
        .unwrap();
    chain
        .create_builder(v(2, 0), v(1, 0))
        .add_child_resource(PathElement::wildcard("baz"))
        .unwrap()
        .attribute_builder()
        .add_rename("b", "a")
        .unwrap();
    let mut registry = TransformerRegistry::new();
    registry.register_chained(chain, &[v(1, 0)]).unwrap();

    let ctx = TransformationContext::new(
        TransformationTarget::new("slave", v(1, 4), TargetType::Host).with_subsystem("foo", v(1, 0)),
        Arc::new(ManagementModel::new(Resource::new())),
    );
    let resource = Resource::with_model(Value::object().with("c", 1))
        .with_child(PathElement::new("leaf", "l"), Resource::new());
    let transformed = registry
        .transform_resource(&ctx, &addr("/subsystem=foo/bar=x"), resource)
        .unwrap()
        .unwrap();
    assert_eq!(transformed.model().get("a"), Some(&Value::Int(1)));
    assert!(!transformed.model().has("c"));
    assert!(transformed.has_child(&PathElement::new("leaf", "l")));
}

#[test]
fn test_nested_resource_from_config() {
    let registry = registry();
    let ctx = context(v(1, 4));

    let resource = Resource::with_model(Value::object().with("d", 3));
    let transformed = registry
        .transform_resource(&ctx, &addr("/subsystem=foo/old-thing=y"), resource.clone())
        .unwrap();
    assert_eq!(transformed, Some(resource));

    let withheld = registry
        .transform_resource(&ctx, &addr("/subsystem=foo/new-thing=x/deeper=z"), Resource::new())
        .unwrap();
    assert!(withheld.is_none());
    assert_eq!(ctx.warnings().len(), 1);
}

#[test]
fn test_rejected_override_is_warned() {
    let yaml = r#"
subsystems:
  - name: foo
    versions:
      - version: "1.1.0"
        resource:
          operations:
            - name: new-op
              policy: reject-and-warn
"#;
    let registry = Config::from_yaml(yaml).unwrap().build_registry().unwrap();
    let ctx = context(v(1, 4));
    let transformed = registry
        .transform_operation(&ctx, create_operation("new-op", &addr("/subsystem=foo")))
        .unwrap();
    assert!(transformed.reject_operation(&Value::Undefined));
    let warnings = ctx.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("'new-op'"));
}

// ============================================================================
// Path registry
// ============================================================================

#[test]
fn test_path_registry_prefers_literal_over_wildcard() {
    let mut registry = PathAddressConfigRegistry::new();
    registry.register(&addr("/subsystem=foo/bar=*"), "wildcard");
    registry.register(&addr("/subsystem=foo/bar=special"), "literal");

    assert_eq!(registry.get_config(&addr("/subsystem=foo/bar=special")), Some(&"literal"));
    assert_eq!(registry.get_config(&addr("/subsystem=foo/bar=other")), Some(&"wildcard"));
    assert_eq!(registry.get_config(&addr("/subsystem=foo")), None);
    assert_eq!(registry.get_config(&addr("/subsystem=baz/bar=other")), None);
}

#[test]
fn test_builder_and_config_agree() {
    let mut builder = ResourceTransformationDescriptionBuilder::for_subsystem("foo");
    builder
        .attribute_builder()
        .add_reject_check(RejectExpressions::new(), &["a"]);
    let mut built = TransformerRegistry::new();
    built.register_subsystem("foo", v(1, 1), builder.build());

    let ctx = context(v(1, 4));
    let op = write("a", Value::expression("${foo}"));
    let from_builder = built.transform_operation(&ctx, op.clone()).unwrap();
    let from_config = registry().transform_operation(&ctx, op).unwrap();
    assert_eq!(
        from_builder.failure_description(),
        from_config.failure_description()
    );
}
