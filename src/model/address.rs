//! Path addresses
//!
//! A [`PathAddress`] is an immutable, ordered sequence of `key=value`
//! [`PathElement`]s identifying a resource in the model tree. An element
//! whose value is `*` is a wildcard matching any child under that key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValueError;
use crate::model::Value;

/// Value of a wildcard path element
pub const WILDCARD_VALUE: &str = "*";

/// One `key=value` segment of an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathElement {
    key: String,
    value: String,
}

impl PathElement {
    /// Create a path element
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a wildcard element for `key`
    pub fn wildcard(key: impl Into<String>) -> Self {
        Self::new(key, WILDCARD_VALUE)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD_VALUE
    }

    /// Whether this element, possibly a wildcard, matches `other`
    ///
    /// A wildcard matches by key only.
    pub fn matches(&self, other: &PathElement) -> bool {
        self.key == other.key && (self.is_wildcard() || self.value == other.value)
    }

    /// Copy of this element with a different value
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(self.key.clone(), value)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for PathElement {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| ValueError::invalid_address(s, "expected key=value"))?;
        if key.is_empty() || value.is_empty() {
            return Err(ValueError::invalid_address(s, "empty key or value"));
        }
        Ok(PathElement::new(key, value))
    }
}

/// Immutable address of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct PathAddress {
    elements: Vec<PathElement>,
}

impl PathAddress {
    /// The root address
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// Build from `(key, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| PathElement::new(k, v))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    pub fn element(&self, index: usize) -> Option<&PathElement> {
        self.elements.get(index)
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// New address with `element` appended
    pub fn append(&self, element: PathElement) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        Self { elements }
    }

    /// New address with all of `other` appended
    pub fn append_address(&self, other: &PathAddress) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        Self { elements }
    }

    /// Address of the parent resource; the root is its own parent
    pub fn parent(&self) -> Self {
        self.sub_address(0, self.len().saturating_sub(1))
    }

    /// Elements `[start, end)` as a new address
    pub fn sub_address(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            elements: self.elements[start..end].to_vec(),
        }
    }

    /// Elements from `start` to the end
    pub fn suffix(&self, start: usize) -> Self {
        self.sub_address(start, self.len())
    }

    /// Name of the subsystem this address is in, if any
    pub fn subsystem_name(&self) -> Option<&str> {
        self.elements
            .first()
            .filter(|e| e.key() == crate::model::operation::SUBSYSTEM)
            .map(PathElement::value)
    }

    /// Whether `pattern` (which may contain wildcards) matches this address
    pub fn matches(&self, pattern: &PathAddress) -> bool {
        self.len() == pattern.len()
            && pattern
                .elements
                .iter()
                .zip(&self.elements)
                .all(|(p, e)| p.matches(e))
    }

    /// DMR form: a list of single-entry objects
    pub fn to_value(&self) -> Value {
        Value::List(
            self.elements
                .iter()
                .map(|e| Value::object().with(e.key(), e.value()))
                .collect(),
        )
    }

    /// Parse the DMR form; accepts a list of properties or one-entry
    /// objects, a single object, a `/k=v` string, or undefined for the root
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Undefined => Ok(Self::empty()),
            Value::String(s) => s.parse(),
            Value::List(_) | Value::Object(_) | Value::Property(..) => {
                let elements = value
                    .as_property_list()?
                    .into_iter()
                    .map(|(k, v)| Ok(PathElement::new(k, v.as_string()?)))
                    .collect::<Result<Vec<_>, ValueError>>()?;
                Ok(Self::new(elements))
            }
            other => Err(ValueError::invalid_address(
                other.to_string(),
                "not a list of properties",
            )),
        }
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        for element in &self.elements {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for PathAddress {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Self::empty());
        }
        trimmed
            .trim_start_matches('/')
            .split('/')
            .map(|segment| {
                segment
                    .parse::<PathElement>()
                    .map_err(|_| ValueError::invalid_address(s, format!("bad segment '{}'", segment)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

impl From<Vec<PathElement>> for PathAddress {
    fn from(elements: Vec<PathElement>) -> Self {
        Self::new(elements)
    }
}

impl From<PathElement> for PathAddress {
    fn from(element: PathElement) -> Self {
        Self::new(vec![element])
    }
}

impl Serialize for PathAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PathAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for PathElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PathElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
