//! Binary comparison operators
//!
//! A comparison binds one operator to a field and a value:
//!
//! ```text
//! ["=", "environment", "production"]
//! [">", "catalog_timestamp", "2016-06-01 00:00:00"]
//! ["~>", "path", ["networking", "eth.*", "macaddress"]]
//! ["null?", "deactivated", true]
//! ```

use serde_json::{json, Value};

use crate::query::error::{QueryError, QueryResult};
use crate::query::node::Expression;
use crate::query::value::{FieldRef, QueryValue};

/// Comparison operators of the v4 AST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `=`
    Equals,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `~` regular expression match
    Regex,
    /// `~>` regular expression match against a path
    RegexArray,
    /// `null?` null test; the value must be a boolean
    Null,
}

impl ComparisonOp {
    /// AST symbol of the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Regex => "~",
            Self::RegexArray => "~>",
            Self::Null => "null?",
        }
    }

    /// Parse from an AST symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Equals),
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            ">=" => Some(Self::GreaterEqual),
            "<=" => Some(Self::LessEqual),
            "~" => Some(Self::Regex),
            "~>" => Some(Self::RegexArray),
            "null?" => Some(Self::Null),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A `[op, field, value]` comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    op: ComparisonOp,
    field: FieldRef,
    value: QueryValue,
}

impl Comparison {
    /// Create a comparison with any operator
    ///
    /// Fails when `op` is [`ComparisonOp::Null`] and the value is not a
    /// boolean.
    pub fn new(
        op: ComparisonOp,
        field: impl Into<FieldRef>,
        value: impl Into<QueryValue>,
    ) -> QueryResult<Self> {
        let value = value.into();
        check_finite(op, &value)?;
        if op == ComparisonOp::Null && !matches!(value, QueryValue::Bool(_)) {
            return Err(QueryError::InvalidValue {
                context: "null?",
                reason: format!("value must be boolean, got {}", value.kind()),
            });
        }
        Ok(Self {
            op,
            field: field.into(),
            value,
        })
    }

    fn with(op: ComparisonOp, field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self {
            op,
            field: field.into(),
            value: value.into(),
        }
    }

    /// `["=", field, value]`
    pub fn equals(field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::Equals, field, value)
    }

    /// `[">", field, value]`
    pub fn greater(field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::Greater, field, value)
    }

    /// `["<", field, value]`
    pub fn less(field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::Less, field, value)
    }

    /// `[">=", field, value]`
    pub fn greater_equal(field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::GreaterEqual, field, value)
    }

    /// `["<=", field, value]`
    pub fn less_equal(field: impl Into<FieldRef>, value: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::LessEqual, field, value)
    }

    /// `["~", field, pattern]`
    pub fn regex(field: impl Into<FieldRef>, pattern: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::Regex, field, pattern)
    }

    /// `["~>", field, [pattern, ...]]`
    pub fn regex_array(field: impl Into<FieldRef>, patterns: impl Into<QueryValue>) -> Self {
        Self::with(ComparisonOp::RegexArray, field, patterns)
    }

    /// `["null?", field, is_null]`
    pub fn null(field: impl Into<FieldRef>, is_null: bool) -> Self {
        Self::with(ComparisonOp::Null, field, is_null)
    }

    /// Rebuild a comparison from its wire form
    pub fn from_ast(ast: &Value) -> QueryResult<Self> {
        let invalid = || QueryError::InvalidJson(format!("not a comparison: {}", ast));

        let items = ast.as_array().ok_or_else(invalid)?;
        let [op, field, value] = items.as_slice() else {
            return Err(invalid());
        };

        let op = op
            .as_str()
            .and_then(ComparisonOp::from_symbol)
            .ok_or_else(invalid)?;
        let field = match field {
            Value::String(name) => FieldRef::Name(name.clone()),
            Value::Array(parts) => FieldRef::Path(
                parts
                    .iter()
                    .map(|p| p.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(invalid)?,
            ),
            _ => return Err(invalid()),
        };

        Self::new(op, field, QueryValue::try_from(value.clone())?)
    }

    /// The operator
    pub fn op(&self) -> ComparisonOp {
        self.op
    }

    /// The compared field
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// The wire-ready value
    pub fn value(&self) -> &QueryValue {
        &self.value
    }
}

impl Expression for Comparison {
    fn to_ast(&self) -> QueryResult<Value> {
        check_finite(self.op, &self.value)?;
        Ok(json!([self.op.symbol(), self.field.to_json(), self.value.to_json()]))
    }
}

fn check_finite(op: ComparisonOp, value: &QueryValue) -> QueryResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(QueryError::InvalidValue {
            context: op.symbol(),
            reason: "NaN and infinite numbers have no JSON form".to_string(),
        })
    }
}
