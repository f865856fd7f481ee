//! Dynamic values for bindings, invocation arguments and bound parameters.
//!
//! ```rust
//! use sqlweave_core::{Value, ValueType};
//!
//! let val: Value = 42.into();
//! assert!(matches!(val, Value::Int(42)));
//! assert_eq!(val.value_type(), ValueType::Int);
//!
//! let val: Value = serde_json::json!({"b": {"c": "x"}}).into();
//! assert_eq!(val.path("b.c"), Some(Value::from("x")));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A dynamic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values.
    List(Vec<Value>),
    /// Ordered map of values.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness used by conditional tests.
    ///
    /// `Null`, `false`, zero, the empty string and empty collections are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// The runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
        }
    }

    /// Whether this value is a scalar (not a list or map).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Get the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get a numeric view of this value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of elements for collections and characters for strings.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Map(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Look up a single path segment.
    ///
    /// Maps resolve keys, lists resolve numeric indices. `size` resolves to
    /// the length of a collection or string when no such key exists.
    pub fn get(&self, segment: &str) -> Option<Value> {
        match self {
            Self::Map(m) => m
                .get(segment)
                .cloned()
                .or_else(|| (segment == "size").then(|| Value::Int(m.len() as i64))),
            Self::List(l) => match segment.parse::<usize>() {
                Ok(index) => l.get(index).cloned(),
                Err(_) => (segment == "size").then(|| Value::Int(l.len() as i64)),
            },
            Self::String(s) if segment == "size" => Some(Value::Int(s.chars().count() as i64)),
            _ => None,
        }
    }

    /// Resolve a dotted path (`a.b[0].c`) against this value.
    pub fn path(&self, path: &str) -> Option<Value> {
        let mut current = self.clone();
        for segment in path_segments(path) {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Text form used when splicing a value into query text.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Split a binding path into segments.
///
/// `items[0].name` yields `items`, `0`, `name`.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '[', ']'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(entries) => {
                Self::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Declared or inferred type of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Unknown or unconstrained.
    #[default]
    Any,
    /// Null.
    Null,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// String.
    String,
    /// List.
    List,
    /// Map.
    Map,
}

impl ValueType {
    /// Get the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "object" => Ok(Self::Any),
            "null" => Ok(Self::Null),
            "bool" | "boolean" => Ok(Self::Bool),
            "int" | "integer" | "long" | "i64" => Ok(Self::Int),
            "float" | "double" | "decimal" | "f64" => Ok(Self::Float),
            "string" | "text" | "str" => Ok(Self::String),
            "list" | "array" => Ok(Self::List),
            "map" => Ok(Self::Map),
            other => Err(format!("unknown value type '{}'", other)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured parameter object whose fields can be looked up by name.
///
/// Implement this for your own parameter types instead of relying on any
/// kind of reflection. Unknown fields return `None`, which callers report as
/// a binding error.
///
/// ```rust
/// use sqlweave_core::{PathResolvable, Value};
///
/// #[derive(Debug)]
/// struct UserQuery {
///     name: String,
///     min_age: i64,
/// }
///
/// impl PathResolvable for UserQuery {
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(self.name.clone().into()),
///             "min_age" => Some(self.min_age.into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait PathResolvable: Send + Sync + fmt::Debug {
    /// Look up a top-level field.
    fn field(&self, name: &str) -> Option<Value>;

    /// The parameter itself when it is a single scalar value.
    fn scalar(&self) -> Option<Value> {
        None
    }

    /// The whole parameter as a value, exposed to templates as `_parameter`.
    fn as_value(&self) -> Option<Value> {
        self.scalar()
    }
}

impl PathResolvable for Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn scalar(&self) -> Option<Value> {
        (self.is_scalar() && !self.is_null()).then(|| self.clone())
    }

    fn as_value(&self) -> Option<Value> {
        Some(self.clone())
    }
}

impl PathResolvable for IndexMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn as_value(&self) -> Option<Value> {
        Some(Value::Map(self.clone()))
    }
}

impl PathResolvable for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn as_value(&self) -> Option<Value> {
        let mut entries: Vec<_> = self.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Some(Value::Map(entries.into_iter().collect()))
    }
}

impl PathResolvable for serde_json::Value {
    fn field(&self, name: &str) -> Option<Value> {
        match self {
            serde_json::Value::Object(entries) => entries.get(name).cloned().map(Into::into),
            serde_json::Value::Array(items) => name
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .map(Into::into),
            _ => None,
        }
    }

    fn scalar(&self) -> Option<Value> {
        match self {
            serde_json::Value::Bool(_) | serde_json::Value::Number(_) | serde_json::Value::String(_) => {
                Some(self.clone().into())
            }
            _ => None,
        }
    }

    fn as_value(&self) -> Option<Value> {
        Some(self.clone().into())
    }
}
