//! Query error types
//!
//! Every construction or validation failure of the query builder surfaces as a
//! [`QueryError`]. These are programming errors: they point at the exact call
//! that assembled a malformed expression.

use thiserror::Error;

/// Errors raised while building or serializing a query expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Entity name is not queryable in the requested position
    #[error("Unsupported entity: {entity} (expected one of: {allowed})")]
    UnsupportedEntity { entity: String, allowed: String },

    /// Aggregate function name is not one the service knows
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    /// A required argument was not supplied
    #[error("{context} requires {argument}")]
    MissingArgument {
        context: &'static str,
        argument: &'static str,
    },

    /// Value has the wrong type for the operator
    #[error("Invalid value for {context}: {reason}")]
    InvalidValue {
        context: &'static str,
        reason: String,
    },

    /// The node kind cannot be attached at this position
    #[error("{context} does not accept {found}")]
    UnsupportedOperand {
        context: &'static str,
        found: &'static str,
    },

    /// A single-occupant slot was filled twice
    #[error("{0} accepts only one query")]
    AlreadyAttached(&'static str),

    /// Serialization attempted before the required parts were attached
    #[error("{0}")]
    Incomplete(&'static str),

    /// Pre-serialized query text was not valid JSON
    #[error("Invalid query string: {0}")]
    InvalidJson(String),

    /// Order-by entry has a shape other than `field` or `[field, direction]`
    #[error("Invalid order_by entry: {0}")]
    InvalidOrderBy(String),
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::InvalidJson(err.to_string())
    }
}

/// Result type for query construction
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnsupportedFunction("std_dev".to_string());
        assert_eq!(err.to_string(), "Unsupported function: std_dev");

        let err = QueryError::MissingArgument {
            context: "function avg",
            argument: "a field",
        };
        assert_eq!(err.to_string(), "function avg requires a field");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("test, test").unwrap_err();
        let err: QueryError = json_err.into();
        assert!(matches!(err, QueryError::InvalidJson(_)));
    }
}
