//! Literal values and type references carried by slots and variables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A target-language type name, e.g. `int` or `Vector3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A literal default stored on a value slot, variable or literal block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// The type a literal of this value would have in generated code.
    pub fn natural_type(&self) -> TypeRef {
        match self {
            Value::Null => TypeRef::from("object"),
            Value::Bool(_) => TypeRef::from("bool"),
            Value::Int(_) => TypeRef::from("long"),
            Value::Float(_) => TypeRef::from("double"),
            Value::String(_) => TypeRef::from("string"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/// Renders the value as a target-language literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => f.write_str("double.NaN"),
            Value::Float(x) if x.is_infinite() && *x > 0.0 => f.write_str("double.PositiveInfinity"),
            Value::Float(x) if x.is_infinite() => f.write_str("double.NegativeInfinity"),
            // Debug keeps the fractional part ("5.0"), Display would print "5".
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        '\0' => f.write_str("\\0")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}
