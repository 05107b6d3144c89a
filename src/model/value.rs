//! Dynamic value tree
//!
//! `Value` is the detyped model representation shared by the management
//! model and every operation request/response. It is a closed sum type;
//! narrowing to a concrete type goes through explicit accessors that fail
//! with [`ValueError::Conversion`] on mismatch.
//!
//! # JSON form
//!
//! Values map onto JSON the way DMR does, with wrapper objects for the
//! types JSON cannot express:
//!
//! ```text
//! {"EXPRESSION_VALUE": "${jboss.bind.address:127.0.0.1}"}
//! {"BYTES_VALUE": "AQID"}
//! {"BIG_INTEGER_VALUE": "123456789012345678901234567890"}
//! {"BIG_DECIMAL_VALUE": "3.14159265358979323846"}
//! {"PROPERTY_VALUE": {"name": "key", "value": 1}}
//! {"TYPE_MODEL_VALUE": "STRING"}
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

use crate::error::ValueError;

const EXPRESSION_KEY: &str = "EXPRESSION_VALUE";
const BYTES_KEY: &str = "BYTES_VALUE";
const BIG_INTEGER_KEY: &str = "BIG_INTEGER_VALUE";
const BIG_DECIMAL_KEY: &str = "BIG_DECIMAL_VALUE";
const PROPERTY_KEY: &str = "PROPERTY_VALUE";
const TYPE_KEY: &str = "TYPE_MODEL_VALUE";

static UNDEFINED: Value = Value::Undefined;

/// Discriminating type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Undefined,
    Boolean,
    Int,
    Long,
    Double,
    BigInteger,
    BigDecimal,
    String,
    Bytes,
    List,
    Object,
    Property,
    Expression,
    Type,
}

impl ModelType {
    /// Returns the DMR name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Undefined => "UNDEFINED",
            ModelType::Boolean => "BOOLEAN",
            ModelType::Int => "INT",
            ModelType::Long => "LONG",
            ModelType::Double => "DOUBLE",
            ModelType::BigInteger => "BIG_INTEGER",
            ModelType::BigDecimal => "BIG_DECIMAL",
            ModelType::String => "STRING",
            ModelType::Bytes => "BYTES",
            ModelType::List => "LIST",
            ModelType::Object => "OBJECT",
            ModelType::Property => "PROPERTY",
            ModelType::Expression => "EXPRESSION",
            ModelType::Type => "TYPE",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_uppercase().as_str() {
            "UNDEFINED" => ModelType::Undefined,
            "BOOLEAN" => ModelType::Boolean,
            "INT" => ModelType::Int,
            "LONG" => ModelType::Long,
            "DOUBLE" => ModelType::Double,
            "BIG_INTEGER" => ModelType::BigInteger,
            "BIG_DECIMAL" => ModelType::BigDecimal,
            "STRING" => ModelType::String,
            "BYTES" => ModelType::Bytes,
            "LIST" => ModelType::List,
            "OBJECT" => ModelType::Object,
            "PROPERTY" => ModelType::Property,
            "EXPRESSION" => ModelType::Expression,
            "TYPE" => ModelType::Type,
            _ => return Err(ValueError::conversion(ModelType::String, ModelType::Type)),
        };
        Ok(ty)
    }
}

/// Insertion-ordered property map of an OBJECT value
///
/// Iteration follows insertion order; equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    entries: Vec<(String, Value)>,
}

impl ObjectMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace a value, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl PartialEq for ObjectMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ObjectMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = ObjectMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ObjectMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A node of the dynamic value tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty placeholder, distinct from any concrete default
    #[default]
    Undefined,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    /// Arbitrary precision integer, kept in canonical decimal form
    BigInteger(String),
    /// Arbitrary precision decimal, kept in its literal form
    BigDecimal(String),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Object(ObjectMap),
    Property(String, Box<Value>),
    /// Unresolved expression such as `${foo:bar}`
    Expression(String),
    Type(ModelType),
}

impl Value {
    /// Create an empty OBJECT value
    pub fn object() -> Self {
        Value::Object(ObjectMap::new())
    }

    /// Create an empty LIST value
    pub fn list() -> Self {
        Value::List(Vec::new())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn expression(s: impl Into<String>) -> Self {
        Value::Expression(s.into())
    }

    pub fn property(name: impl Into<String>, value: Value) -> Self {
        Value::Property(name.into(), Box::new(value))
    }

    /// Create a BIG_INTEGER value from its decimal literal
    pub fn big_integer(literal: &str) -> Result<Self, ValueError> {
        let digits = literal.strip_prefix('-').unwrap_or(literal);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValueError::InvalidNumber {
                kind: "BIG_INTEGER",
                literal: literal.to_string(),
            });
        }
        Ok(Value::BigInteger(literal.to_string()))
    }

    /// Create a BIG_DECIMAL value from its literal
    pub fn big_decimal(literal: &str) -> Result<Self, ValueError> {
        if !is_decimal_literal(literal) {
            return Err(ValueError::InvalidNumber {
                kind: "BIG_DECIMAL",
                literal: literal.to_string(),
            });
        }
        Ok(Value::BigDecimal(literal.to_string()))
    }

    /// Type tag of this value
    pub fn value_type(&self) -> ModelType {
        match self {
            Value::Undefined => ModelType::Undefined,
            Value::Boolean(_) => ModelType::Boolean,
            Value::Int(_) => ModelType::Int,
            Value::Long(_) => ModelType::Long,
            Value::Double(_) => ModelType::Double,
            Value::BigInteger(_) => ModelType::BigInteger,
            Value::BigDecimal(_) => ModelType::BigDecimal,
            Value::String(_) => ModelType::String,
            Value::Bytes(_) => ModelType::Bytes,
            Value::List(_) => ModelType::List,
            Value::Object(_) => ModelType::Object,
            Value::Property(..) => ModelType::Property,
            Value::Expression(_) => ModelType::Expression,
            Value::Type(_) => ModelType::Type,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expression(_))
    }

    // ------------------------------------------------------------------
    // Object access
    // ------------------------------------------------------------------

    /// Child value under `key`, if this is an object that has it
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Property(name, value) if name == key => Some(value),
            _ => None,
        }
    }

    /// Child value under `key`, or an undefined value
    pub fn get_or_undefined(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&UNDEFINED)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Object(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Child value under `key`, failing when absent or undefined
    pub fn require(&self, key: &str) -> Result<&Value, ValueError> {
        match self.get(key) {
            Some(v) if v.is_defined() => Ok(v),
            _ => Err(ValueError::MissingKey(key.to_string())),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn has_defined(&self, key: &str) -> bool {
        self.get(key).is_some_and(Value::is_defined)
    }

    /// Set `key` to `value`, turning an undefined node into an object first
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), ValueError> {
        if !self.is_defined() {
            *self = Value::object();
        }
        match self {
            Value::Object(map) => {
                map.insert(key, value);
                Ok(())
            }
            other => Err(ValueError::conversion(other.value_type(), ModelType::Object)),
        }
    }

    /// Builder form of [`Value::set`]; a non-object receiver is replaced by an object
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !matches!(self, Value::Object(_)) {
            self = Value::object();
        }
        if let Value::Object(map) = &mut self {
            map.insert(key, value.into());
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.remove(key),
            _ => None,
        }
    }

    /// Keys of an object value, in insertion order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Value::Object(map) => map.keys().collect(),
            _ => Vec::new(),
        }
    }

    /// Append to a list, turning an undefined node into a list first
    pub fn push(&mut self, value: Value) -> Result<(), ValueError> {
        if !self.is_defined() {
            *self = Value::list();
        }
        match self {
            Value::List(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(ValueError::conversion(other.value_type(), ModelType::List)),
        }
    }

    // ------------------------------------------------------------------
    // Typed narrowing
    // ------------------------------------------------------------------

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Long(l) => Ok(*l != 0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Boolean)),
        }
    }

    pub fn as_int(&self) -> Result<i32, ValueError> {
        let long = self
            .as_long()
            .map_err(|_| ValueError::conversion(self.value_type(), ModelType::Int))?;
        i32::try_from(long).map_err(|_| ValueError::conversion(self.value_type(), ModelType::Int))
    }

    pub fn as_long(&self) -> Result<i64, ValueError> {
        let err = || ValueError::conversion(self.value_type(), ModelType::Long);
        match self {
            Value::Int(i) => Ok(i64::from(*i)),
            Value::Long(l) => Ok(*l),
            Value::Double(d) if d.is_finite() => Ok(d.trunc() as i64),
            Value::BigInteger(s) | Value::String(s) => s.trim().parse().map_err(|_| err()),
            _ => Err(err()),
        }
    }

    pub fn as_double(&self) -> Result<f64, ValueError> {
        let err = || ValueError::conversion(self.value_type(), ModelType::Double);
        match self {
            Value::Int(i) => Ok(f64::from(*i)),
            Value::Long(l) => Ok(*l as f64),
            Value::Double(d) => Ok(*d),
            Value::BigInteger(s) | Value::BigDecimal(s) | Value::String(s) => {
                s.trim().parse().map_err(|_| err())
            }
            _ => Err(err()),
        }
    }

    /// String form of a scalar; objects and lists render as their JSON text
    pub fn as_string(&self) -> Result<String, ValueError> {
        match self {
            Value::Undefined => Err(ValueError::conversion(ModelType::Undefined, ModelType::String)),
            Value::String(s) | Value::Expression(s) => Ok(s.clone()),
            Value::BigInteger(s) | Value::BigDecimal(s) => Ok(s.clone()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Long(l) => Ok(l.to_string()),
            Value::Double(d) => Ok(d.to_string()),
            Value::Type(t) => Ok(t.to_string()),
            Value::Bytes(b) => Ok(BASE64.encode(b)),
            Value::List(_) | Value::Object(_) | Value::Property(..) => Ok(self.to_json().to_string()),
        }
    }

    /// Borrowed text of a STRING or EXPRESSION value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Expression(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(ValueError::conversion(other.value_type(), ModelType::List)),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut Vec<Value>, ValueError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(ValueError::conversion(other.value_type(), ModelType::List)),
        }
    }

    pub fn as_object(&self) -> Result<&ObjectMap, ValueError> {
        match self {
            Value::Object(map) => Ok(map),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Object)),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut ObjectMap, ValueError> {
        match self {
            Value::Object(map) => Ok(map),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Object)),
        }
    }

    /// Single property view of a PROPERTY value or a one-entry object
    pub fn as_property(&self) -> Result<(&str, &Value), ValueError> {
        match self {
            Value::Property(name, value) => Ok((name, value)),
            Value::Object(map) if map.len() == 1 => {
                map.iter()
                    .next()
                    .ok_or_else(|| ValueError::conversion(ModelType::Object, ModelType::Property))
            }
            other => Err(ValueError::conversion(other.value_type(), ModelType::Property)),
        }
    }

    /// Property list of an object, a list of properties, or a single property
    pub fn as_property_list(&self) -> Result<Vec<(&str, &Value)>, ValueError> {
        match self {
            Value::Object(map) => Ok(map.iter().collect()),
            Value::Property(name, value) => Ok(vec![(name.as_str(), value.as_ref())]),
            Value::List(items) => items.iter().map(Value::as_property).collect(),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Property)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], ValueError> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Bytes)),
        }
    }

    pub fn as_type(&self) -> Result<ModelType, ValueError> {
        match self {
            Value::Type(t) => Ok(*t),
            Value::String(s) => s.parse(),
            other => Err(ValueError::conversion(other.value_type(), ModelType::Type)),
        }
    }

    /// Read-only snapshot of this value
    pub fn protect(&self) -> ProtectedValue {
        ProtectedValue(Arc::new(self.clone()))
    }

    // ------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------

    /// Render as DMR JSON
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Long(l) => Json::from(*l),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(d.to_string())),
            Value::BigInteger(s) => wrap(BIG_INTEGER_KEY, Json::String(s.clone())),
            Value::BigDecimal(s) => wrap(BIG_DECIMAL_KEY, Json::String(s.clone())),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => wrap(BYTES_KEY, Json::String(BASE64.encode(b))),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Property(name, value) => wrap(
                PROPERTY_KEY,
                serde_json::json!({ "name": name, "value": value.to_json() }),
            ),
            Value::Expression(s) => wrap(EXPRESSION_KEY, Json::String(s.clone())),
            Value::Type(t) => wrap(TYPE_KEY, Json::String(t.to_string())),
        }
    }

    /// Parse DMR JSON
    pub fn from_json(json: Json) -> Result<Self, ValueError> {
        match json {
            Json::Null => Ok(Value::Undefined),
            Json::Bool(b) => Ok(Value::Boolean(b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i32::try_from(i).map_or(Value::Long(i), Value::Int))
                } else if n.is_u64() {
                    Value::big_integer(&n.to_string())
                } else {
                    n.as_f64()
                        .map(Value::Double)
                        .ok_or_else(|| ValueError::conversion(ModelType::String, ModelType::Double))
                }
            }
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => items
                .into_iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, inner)) = map.iter().next() {
                        if let Some(value) = unwrap_typed(key, inner)? {
                            return Ok(value);
                        }
                    }
                }
                let mut object = ObjectMap::new();
                for (k, v) in map {
                    object.insert(k, Value::from_json(v)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}

fn wrap(key: &str, inner: Json) -> Json {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), inner);
    Json::Object(map)
}

fn unwrap_typed(key: &str, inner: &Json) -> Result<Option<Value>, ValueError> {
    let text = || {
        inner
            .as_str()
            .ok_or_else(|| ValueError::conversion(ModelType::Object, ModelType::String))
    };
    let value = match key {
        EXPRESSION_KEY => Value::Expression(text()?.to_string()),
        BIG_INTEGER_KEY => Value::big_integer(text()?)?,
        BIG_DECIMAL_KEY => Value::big_decimal(text()?)?,
        TYPE_KEY => Value::Type(text()?.parse()?),
        BYTES_KEY => Value::Bytes(
            BASE64
                .decode(text()?)
                .map_err(|_| ValueError::conversion(ModelType::String, ModelType::Bytes))?,
        ),
        PROPERTY_KEY => {
            let name = inner
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| ValueError::MissingKey("name".to_string()))?;
            let value = Value::from_json(inner.get("value").cloned().unwrap_or(Json::Null))?;
            Value::property(name, value)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn is_decimal_literal(literal: &str) -> bool {
    let unsigned = literal
        .strip_prefix('-')
        .or_else(|| literal.strip_prefix('+'))
        .unwrap_or(literal);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };
    let mut parts = mantissa.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok =
        !(int_part.is_empty() && frac_part.is_empty()) && digits_ok(int_part) && digits_ok(frac_part);
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix('-').or_else(|| e.strip_prefix('+')).unwrap_or(e);
        !e.is_empty() && digits_ok(e)
    });
    mantissa_ok && exponent_ok
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Expression(s) => write!(f, "expression \"{}\"", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = Json::deserialize(deserializer)?;
        Value::from_json(json).map_err(serde::de::Error::custom)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectMap> for Value {
    fn from(map: ObjectMap) -> Self {
        Value::Object(map)
    }
}

impl From<ModelType> for Value {
    fn from(t: ModelType) -> Self {
        Value::Type(t)
    }
}

/// Immutable snapshot of a value
///
/// Used to keep what the caller originally sent while rules rewrite a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedValue(Arc<Value>);

impl ProtectedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Mutable copy of the protected value
    pub fn to_value(&self) -> Value {
        self.0.as_ref().clone()
    }
}

impl Deref for ProtectedValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}
