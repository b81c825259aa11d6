//! Fields and values carried by AST nodes
//!
//! Values are normalized into their wire representation as they are built:
//! a timestamp becomes its string form immediately, so a constructed node
//! never holds anything that still needs converting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde_json::Value;

use crate::query::error::{QueryError, QueryResult};

/// A field reference: a plain field name or a path into structured data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// Top-level field such as `certname`
    Name(String),
    /// Path such as `["parameter", "ensure"]`
    Path(Vec<String>),
}

impl FieldRef {
    /// Wire form of the field
    pub fn to_json(&self) -> Value {
        match self {
            Self::Name(name) => Value::String(name.clone()),
            Self::Path(parts) => Value::Array(parts.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for FieldRef {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<Vec<String>> for FieldRef {
    fn from(path: Vec<String>) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<&str>> for FieldRef {
    fn from(path: Vec<&str>) -> Self {
        Self::Path(path.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldRef {
    fn from(path: [&str; N]) -> Self {
        Self::Path(path.iter().map(|p| p.to_string()).collect())
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Path(parts) => write!(f, "{}", parts.join(".")),
        }
    }
}

/// A comparison operand in wire-ready form
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<QueryValue>),
}

impl QueryValue {
    /// Wire form of the value
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Bool(b) => Value::Bool(*b),
            Self::Array(items) => Value::Array(items.iter().map(QueryValue::to_json).collect()),
        }
    }

    /// Short name of the value's type, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Array(_) => "array",
        }
    }

    /// Whether the value is itself an array
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// False for NaN or infinite floats, at any depth; JSON cannot carry them
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::Array(items) => items.iter().all(QueryValue::is_finite),
            _ => true,
        }
    }
}

/// Render a timestamp the way the service compares it: `YYYY-MM-DD HH:MM:SS`,
/// with microseconds only when present
fn naive_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

impl From<NaiveDateTime> for QueryValue {
    fn from(ts: NaiveDateTime) -> Self {
        Self::String(naive_timestamp(&ts))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for QueryValue
where
    Tz::Offset: std::fmt::Display,
{
    fn from(ts: DateTime<Tz>) -> Self {
        let offset = ts.format("%:z").to_string();
        Self::String(format!("{}{}", naive_timestamp(&ts.naive_local()), offset))
    }
}

impl From<NaiveDate> for QueryValue {
    fn from(date: NaiveDate) -> Self {
        Self::String(date.format("%Y-%m-%d").to_string())
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for QueryValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for QueryValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for QueryValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for QueryValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f32> for QueryValue {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<f64> for QueryValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Value> for QueryValue {
    type Error = QueryError;

    fn try_from(value: Value) -> QueryResult<Self> {
        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Integer(i)),
                None => n.as_f64().map(Self::Float).ok_or_else(|| QueryError::InvalidValue {
                    context: "value",
                    reason: format!("number {} out of range", n),
                }),
            },
            Value::Array(items) => items
                .into_iter()
                .map(QueryValue::try_from)
                .collect::<QueryResult<Vec<_>>>()
                .map(Self::Array),
            Value::Null => Err(QueryError::InvalidValue {
                context: "value",
                reason: "null is not a comparable value".to_string(),
            }),
            Value::Object(_) => Err(QueryError::InvalidValue {
                context: "value",
                reason: "objects are not comparable values".to_string(),
            }),
        }
    }
}
