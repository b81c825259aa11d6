//! Subqueries and membership tests
//!
//! `in` tests whether a field's value appears in the result of another
//! query or in a literal array. The inner query is usually an `extract`
//! over a `select_<entity>` subquery, or a full `from`:
//!
//! ```text
//! ["in", "certname",
//!   ["extract", "certname",
//!     ["select_facts", ["and", ["=", "name", "osfamily"], ["=", "value", "Debian"]]]]]
//! ["in", "certname", ["array", ["node1", "node2"]]]
//! ```

use serde_json::{json, Value};

use crate::query::entity::Entity;
use crate::query::error::{QueryError, QueryResult};
use crate::query::node::{Expression, Node, QueryFragment};
use crate::query::value::{FieldRef, QueryValue};

/// A `["select_<entity>", query?]` subquery
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    entity: Entity,
    query: Option<Value>,
}

impl SubqueryExpr {
    /// Create a subquery by entity name
    ///
    /// Fails for names outside the subquery allow-list.
    pub fn new(entity: &str) -> QueryResult<Self> {
        Ok(Self {
            entity: Entity::parse_allowed(entity, Entity::SUBQUERY)?,
            query: None,
        })
    }

    /// Create a subquery for a known entity
    pub fn for_entity(entity: Entity) -> QueryResult<Self> {
        Self::new(entity.as_str())
    }

    /// The selected entity
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Attach the inner query; only one is allowed
    pub fn add_query(&mut self, query: impl Into<QueryFragment>) -> QueryResult<&mut Self> {
        if self.query.is_some() {
            return Err(QueryError::AlreadyAttached("select"));
        }
        self.query = Some(query.into().into_single_ast("select", |_| true)?);
        Ok(self)
    }
}

impl Expression for SubqueryExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        let mut arr = vec![json!(format!("select_{}", self.entity.as_str()))];
        if let Some(query) = &self.query {
            arr.push(query.clone());
        }
        Ok(Value::Array(arr))
    }
}

/// An `["in", field, source]` membership test
#[derive(Debug, Clone, PartialEq)]
pub struct InExpr {
    field: FieldRef,
    source: Option<Value>,
}

impl InExpr {
    /// Create a membership test on a field
    pub fn new(field: impl Into<FieldRef>) -> Self {
        Self {
            field: field.into(),
            source: None,
        }
    }

    /// Whether a query or array has been attached
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Use the result of an `extract`, a `from`, or a query string as the
    /// candidate set
    ///
    /// Fails if a query or array was already attached.
    pub fn add_query(&mut self, query: impl Into<QueryFragment>) -> QueryResult<&mut Self> {
        if self.source.is_some() {
            return Err(QueryError::AlreadyAttached("in"));
        }
        let ast = query
            .into()
            .into_single_ast("in", |node| matches!(node, Node::Extract(_) | Node::From(_)))?;
        self.source = Some(ast);
        Ok(self)
    }

    /// Use a literal array as the candidate set
    ///
    /// The array must be non-empty and flat. Fails if a query or array was
    /// already attached.
    pub fn add_array<T: Into<QueryValue>>(&mut self, values: Vec<T>) -> QueryResult<&mut Self> {
        if self.source.is_some() {
            return Err(QueryError::AlreadyAttached("in"));
        }
        let values: Vec<QueryValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(QueryError::InvalidValue {
                context: "in array",
                reason: "array must not be empty".to_string(),
            });
        }
        if values.iter().any(QueryValue::is_array) {
            return Err(QueryError::InvalidValue {
                context: "in array",
                reason: "nested arrays are not supported".to_string(),
            });
        }
        if !values.iter().all(QueryValue::is_finite) {
            return Err(QueryError::InvalidValue {
                context: "in array",
                reason: "NaN and infinite numbers have no JSON form".to_string(),
            });
        }

        let items = values.iter().map(QueryValue::to_json).collect();
        self.source = Some(json!(["array", Value::Array(items)]));
        Ok(self)
    }
}

impl Expression for InExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        let mut arr = vec![json!("in"), self.field.to_json()];
        if let Some(source) = &self.source {
            arr.push(source.clone());
        }
        Ok(Value::Array(arr))
    }
}
