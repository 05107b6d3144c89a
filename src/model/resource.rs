//! Resource tree
//!
//! A [`Resource`] is a model value plus named children grouped by child type.
//! [`ResourceView`] is what transformation code reads through the
//! transformation context: an owned snapshot tagged with its address and a
//! `read_only` flag. Mutators on a read-only view fail with
//! [`TransformError::ImmutableResource`], and every view derived from it
//! inherits the flag.

use std::collections::BTreeMap;

use crate::error::{TransformError, TransformResult, ValueError};
use crate::model::{PathAddress, PathElement, Value};

/// Key of the model value in the JSON form of a resource
const MODEL_KEY: &str = "model";
/// Key of the children in the JSON form of a resource
const CHILDREN_KEY: &str = "children";

/// A node of the management model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    model: Value,
    children: BTreeMap<String, BTreeMap<String, Resource>>,
}

impl Resource {
    /// An empty resource with an undefined model
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: Value) -> Self {
        Self {
            model,
            children: BTreeMap::new(),
        }
    }

    /// Builder form of [`Resource::register_child`]
    pub fn with_child(mut self, element: PathElement, child: Resource) -> Self {
        self.register_child(element, child);
        self
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Value {
        &mut self.model
    }

    pub fn write_model(&mut self, model: Value) {
        self.model = model;
    }

    pub fn get_child(&self, element: &PathElement) -> Option<&Resource> {
        self.children
            .get(element.key())
            .and_then(|named| named.get(element.value()))
    }

    pub fn get_child_mut(&mut self, element: &PathElement) -> Option<&mut Resource> {
        self.children
            .get_mut(element.key())
            .and_then(|named| named.get_mut(element.value()))
    }

    pub fn has_child(&self, element: &PathElement) -> bool {
        self.get_child(element).is_some()
    }

    /// Add or replace the child at `element`
    pub fn register_child(&mut self, element: PathElement, child: Resource) -> Option<Resource> {
        self.children
            .entry(element.key().to_string())
            .or_default()
            .insert(element.value().to_string(), child)
    }

    pub fn remove_child(&mut self, element: &PathElement) -> Option<Resource> {
        let named = self.children.get_mut(element.key())?;
        let removed = named.remove(element.value());
        if named.is_empty() {
            self.children.remove(element.key());
        }
        removed
    }

    /// Child types that have at least one child
    pub fn child_types(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    /// Children of one type, ordered by name
    pub fn children(&self, child_type: &str) -> Vec<(PathElement, &Resource)> {
        self.children
            .get(child_type)
            .map(|named| {
                named
                    .iter()
                    .map(|(name, child)| (PathElement::new(child_type, name.as_str()), child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every child of every type
    pub fn all_children(&self) -> Vec<(PathElement, &Resource)> {
        self.children
            .keys()
            .flat_map(|child_type| self.children(child_type))
            .collect()
    }

    /// Descendant at the relative `address`
    pub fn navigate(&self, address: &PathAddress) -> Option<&Resource> {
        address
            .iter()
            .try_fold(self, |resource, element| resource.get_child(element))
    }

    pub fn navigate_mut(&mut self, address: &PathAddress) -> Option<&mut Resource> {
        let mut current = self;
        for element in address.iter() {
            current = current.get_child_mut(element)?;
        }
        Some(current)
    }

    /// JSON form: `{"model": ..., "children": {type: {name: resource}}}`
    pub fn to_value(&self) -> Value {
        let mut value = Value::object().with(MODEL_KEY, self.model.clone());
        if !self.children.is_empty() {
            let mut children = Value::object();
            for (child_type, named) in &self.children {
                let mut by_name = Value::object();
                for (name, child) in named {
                    by_name = by_name.with(name.as_str(), child.to_value());
                }
                children = children.with(child_type.as_str(), by_name);
            }
            value = value.with(CHILDREN_KEY, children);
        }
        value
    }

    /// Parse the JSON form produced by [`Resource::to_value`]
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        let mut resource = Resource::with_model(value.get_or_undefined(MODEL_KEY).clone());
        if let Some(children) = value.get(CHILDREN_KEY).filter(|c| c.is_defined()) {
            for (child_type, named) in children.as_object()?.iter() {
                for (name, child) in named.as_object()?.iter() {
                    resource.register_child(
                        PathElement::new(child_type, name),
                        Resource::from_value(child)?,
                    );
                }
            }
        }
        Ok(resource)
    }
}

/// An owned snapshot of a resource read through a transformation context
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    address: PathAddress,
    resource: Resource,
    read_only: bool,
}

impl ResourceView {
    pub fn new(address: PathAddress, resource: Resource, read_only: bool) -> Self {
        Self {
            address,
            resource,
            read_only,
        }
    }

    /// A writable view
    pub fn writable(address: PathAddress, resource: Resource) -> Self {
        Self::new(address, resource, false)
    }

    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn into_resource(self) -> Resource {
        self.resource
    }

    pub fn model(&self) -> &Value {
        self.resource.model()
    }

    fn check_writable(&self, operation: &str) -> TransformResult<()> {
        if self.read_only {
            return Err(TransformError::immutable(&self.address, operation));
        }
        Ok(())
    }

    pub fn write_model(&mut self, model: Value) -> TransformResult<()> {
        self.check_writable("write-model")?;
        self.resource.write_model(model);
        Ok(())
    }

    pub fn model_mut(&mut self) -> TransformResult<&mut Value> {
        self.check_writable("write-model")?;
        Ok(self.resource.model_mut())
    }

    pub fn register_child(&mut self, element: PathElement, child: Resource) -> TransformResult<()> {
        self.check_writable("register-child")?;
        self.resource.register_child(element, child);
        Ok(())
    }

    pub fn remove_child(&mut self, element: &PathElement) -> TransformResult<Option<Resource>> {
        self.check_writable("remove-child")?;
        Ok(self.resource.remove_child(element))
    }

    pub fn has_child(&self, element: &PathElement) -> bool {
        self.resource.has_child(element)
    }

    pub fn child_types(&self) -> Vec<&str> {
        self.resource.child_types()
    }

    /// View of a direct child, inheriting this view's flag
    pub fn get_child(&self, element: &PathElement) -> Option<ResourceView> {
        self.resource.get_child(element).map(|child| {
            ResourceView::new(
                self.address.append(element.clone()),
                child.clone(),
                self.read_only,
            )
        })
    }

    /// Views of all children of `child_type`, inheriting this view's flag
    pub fn children(&self, child_type: &str) -> Vec<ResourceView> {
        self.resource
            .children(child_type)
            .into_iter()
            .map(|(element, child)| {
                ResourceView::new(self.address.append(element), child.clone(), self.read_only)
            })
            .collect()
    }

    /// View of a descendant, inheriting this view's flag
    pub fn navigate(&self, relative: &PathAddress) -> Option<ResourceView> {
        self.resource.navigate(relative).map(|descendant| {
            ResourceView::new(
                self.address.append_address(relative),
                descendant.clone(),
                self.read_only,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(key: &str, value: &str) -> PathElement {
        PathElement::new(key, value)
    }

    fn sample_tree() -> Resource {
        let grandchild = Resource::with_model(Value::object().with("depth", 2));
        let child = Resource::with_model(Value::object().with("depth", 1))
            .with_child(element("c", "d"), grandchild);
        Resource::with_model(Value::object().with("depth", 0)).with_child(element("a", "b"), child)
    }

    // ========================================================================
    // Resource
    // ========================================================================

    #[test]
    fn test_register_and_remove_child() {
        let mut root = Resource::new();
        assert!(root.register_child(element("a", "b"), Resource::new()).is_none());
        assert!(root.has_child(&element("a", "b")));
        assert_eq!(root.child_types(), vec!["a"]);

        assert!(root.remove_child(&element("a", "b")).is_some());
        assert!(root.child_types().is_empty());
        assert!(root.remove_child(&element("a", "b")).is_none());
    }

    #[test]
    fn test_navigate() {
        let root = sample_tree();
        let address: PathAddress = "/a=b/c=d".parse().unwrap();
        let found = root.navigate(&address).unwrap();
        assert_eq!(found.model().get("depth"), Some(&Value::Int(2)));
        assert!(root.navigate(&"/a=x".parse().unwrap()).is_none());
        assert_eq!(root.navigate(&PathAddress::empty()), Some(&root));
    }

    #[test]
    fn test_value_round_trip() {
        let root = sample_tree();
        let value = root.to_value();
        assert_eq!(Resource::from_value(&value).unwrap(), root);
    }

    // ========================================================================
    // ResourceView
    // ========================================================================

    #[test]
    fn test_writable_view_mutates() {
        let mut view = ResourceView::writable(PathAddress::empty(), sample_tree());
        view.write_model(Value::object().with("depth", 9)).unwrap();
        view.register_child(element("x", "y"), Resource::new()).unwrap();
        assert_eq!(view.model().get("depth"), Some(&Value::Int(9)));
        assert!(view.has_child(&element("x", "y")));
    }

    #[test]
    fn test_read_only_view_rejects_mutation() {
        let mut view = ResourceView::new(PathAddress::empty(), sample_tree(), true);
        let err = view.write_model(Value::object()).unwrap_err();
        assert!(matches!(err, TransformError::ImmutableResource { .. }));
        assert!(view.register_child(element("x", "y"), Resource::new()).is_err());
        assert!(view.remove_child(&element("a", "b")).is_err());
        assert!(view.model_mut().is_err());
        assert!(view.has_child(&element("a", "b")));
    }

    #[test]
    fn test_read_only_flag_is_transitive() {
        let view = ResourceView::new(PathAddress::empty(), sample_tree(), true);

        let mut child = view.get_child(&element("a", "b")).unwrap();
        assert!(child.is_read_only());
        assert_eq!(child.address().to_string(), "/a=b");
        assert!(child.write_model(Value::object()).is_err());

        let mut grandchild = child.children("c").pop().unwrap();
        assert!(grandchild.is_read_only());
        assert!(grandchild.remove_child(&element("z", "z")).is_err());

        let mut navigated = view.navigate(&"/a=b/c=d".parse().unwrap()).unwrap();
        assert_eq!(navigated.address().to_string(), "/a=b/c=d");
        assert!(navigated
            .register_child(element("x", "y"), Resource::new())
            .is_err());
    }
}
