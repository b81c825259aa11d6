//! The `from` root operator
//!
//! `from` binds a query to an entity and carries the paging clauses. Its
//! optional clauses are always emitted in the same order, whatever order
//! they were set in:
//!
//! ```text
//! ["from", "facts", ["=", "certname", "node1"],
//!   ["order_by", ["name", ["value", "desc"]]], ["limit", 10], ["offset", 20]]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::query::entity::Entity;
use crate::query::error::{QueryError, QueryResult};
use crate::query::node::{Expression, Node, QueryFragment};

/// Sort direction of an order-by entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// AST name of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse from an AST name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// One order-by entry: a bare field or a `[field, direction]` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderBy {
    Field(String),
    Directed(String, SortDirection),
}

impl OrderBy {
    /// Ascending order on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self::Directed(field.into(), SortDirection::Asc)
    }

    /// Descending order on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self::Directed(field.into(), SortDirection::Desc)
    }

    /// Parse an entry from its wire form
    pub fn from_ast(value: &Value) -> QueryResult<Self> {
        let invalid = || QueryError::InvalidOrderBy(value.to_string());
        match value {
            Value::String(field) => Ok(Self::Field(field.clone())),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(field), Value::String(direction)] => {
                    let direction = SortDirection::parse(direction).ok_or_else(invalid)?;
                    Ok(Self::Directed(field.clone(), direction))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Field(field) => json!(field),
            Self::Directed(field, direction) => json!([field, direction.as_str()]),
        }
    }
}

impl From<&str> for OrderBy {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<String> for OrderBy {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

impl From<(&str, SortDirection)> for OrderBy {
    fn from((field, direction): (&str, SortDirection)) -> Self {
        Self::Directed(field.to_string(), direction)
    }
}

/// A `from` query over one entity
#[derive(Debug, Clone, PartialEq)]
pub struct FromExpr {
    entity: Entity,
    query: Option<Value>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl FromExpr {
    /// Create a `from` by entity name
    ///
    /// Fails for names outside the root allow-list.
    pub fn new(entity: &str) -> QueryResult<Self> {
        Ok(Self::for_entity(Entity::parse_allowed(entity, Entity::ROOT)?))
    }

    /// Create a `from` for a known entity
    pub fn for_entity(entity: Entity) -> Self {
        Self {
            entity,
            query: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// The queried entity
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Attach the main query; exactly one is required
    ///
    /// Accepts a comparison, boolean operator, `in`, `extract`, function or
    /// query string.
    pub fn add_query(&mut self, query: impl Into<QueryFragment>) -> QueryResult<&mut Self> {
        if self.query.is_some() {
            return Err(QueryError::AlreadyAttached("from"));
        }
        let ast = query.into().into_single_ast("from", |node| {
            matches!(
                node,
                Node::Comparison(_)
                    | Node::Boolean(_)
                    | Node::In(_)
                    | Node::Extract(_)
                    | Node::Function(_)
            )
        })?;
        self.query = Some(ast);
        Ok(self)
    }

    /// Set the ordering, replacing any previous one
    pub fn add_order_by<T: Into<OrderBy>>(&mut self, fields: Vec<T>) -> &mut Self {
        self.order_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the ordering from its wire form, e.g. `["certname", ["timestamp", "desc"]]`
    pub fn add_order_by_ast(&mut self, fields: &Value) -> QueryResult<&mut Self> {
        let entries = fields
            .as_array()
            .ok_or_else(|| QueryError::InvalidOrderBy(fields.to_string()))?;
        self.order_by = entries
            .iter()
            .map(OrderBy::from_ast)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(self)
    }

    /// Limit the number of results
    pub fn add_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results
    pub fn add_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }
}

impl Expression for FromExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        let query = self
            .query
            .as_ref()
            .ok_or(QueryError::Incomplete("from needs one main query"))?;

        let mut arr = vec![json!("from"), json!(self.entity.as_str()), query.clone()];
        if !self.order_by.is_empty() {
            let entries: Vec<Value> = self.order_by.iter().map(OrderBy::to_json).collect();
            arr.push(json!(["order_by", entries]));
        }
        if let Some(limit) = self.limit {
            arr.push(json!(["limit", limit]));
        }
        if let Some(offset) = self.offset {
            arr.push(json!(["offset", offset]));
        }
        Ok(Value::Array(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::comparison::Comparison;
    use crate::query::extract::{ExtractExpr, FunctionExpr};
    use crate::query::subquery::SubqueryExpr;

    fn certname_query() -> FromExpr {
        let mut fr = FromExpr::new("facts").unwrap();
        fr.add_query(Comparison::equals("certname", "test01")).unwrap();
        fr
    }

    #[test]
    fn test_entity_allow_list() {
        assert!(FromExpr::new("facts").is_ok());
        assert!(FromExpr::new("producers").is_ok());
        assert!(matches!(
            FromExpr::new("invalid_entity"),
            Err(QueryError::UnsupportedEntity { .. })
        ));
    }

    #[test]
    fn test_requires_query() {
        let fr = FromExpr::new("facts").unwrap();
        assert_eq!(
            fr.to_ast().unwrap_err(),
            QueryError::Incomplete("from needs one main query")
        );
    }

    #[test]
    fn test_add_query() {
        assert_eq!(
            certname_query().to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"]]"#
        );

        let mut fr = FromExpr::new("facts").unwrap();
        assert!(fr.add_query("test, test, test").is_err());
        fr.add_query(Comparison::equals("certname", "test01")).unwrap();
        assert_eq!(
            fr.add_query(Comparison::equals("certname", "test01"))
                .unwrap_err(),
            QueryError::AlreadyAttached("from")
        );

        let mut ex = ExtractExpr::new();
        ex.add_field(vec!["certname", "fact_environment", "catalog_environment"]);
        let mut fr = FromExpr::new("facts").unwrap();
        fr.add_query(ex).unwrap();
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["extract", ["certname", "fact_environment", "catalog_environment"]]]"#
        );
    }

    #[test]
    fn test_query_kinds() {
        let mut fr = FromExpr::new("nodes").unwrap();
        assert!(matches!(
            fr.add_query(SubqueryExpr::new("facts").unwrap()),
            Err(QueryError::UnsupportedOperand { context: "from", .. })
        ));
        fr.add_query(FunctionExpr::count()).unwrap();
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "nodes", ["function", "count"]]"#
        );
    }

    #[test]
    fn test_limit_offset() {
        let mut fr = certname_query();

        fr.add_offset(10);
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["offset", 10]]"#
        );

        fr.add_limit(5);
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["limit", 5], ["offset", 10]]"#
        );

        fr.add_limit(15);
        assert_eq!(
            fr.describe().unwrap(),
            r#"Query: ["from", "facts", ["=", "certname", "test01"], ["limit", 15], ["offset", 10]]"#
        );
    }

    #[test]
    fn test_clause_order_is_fixed() {
        let mut fr = certname_query();
        fr.add_limit(5).add_offset(10).add_order_by(vec!["certname"]);

        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["order_by", ["certname"]], ["limit", 5], ["offset", 10]]"#
        );
        assert_eq!(fr.to_query_string().unwrap(), fr.to_query_string().unwrap());
    }

    #[test]
    fn test_order_by() {
        let mut fr = certname_query();

        fr.add_order_by(vec!["certname"]);
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["order_by", ["certname"]]]"#
        );

        fr.add_order_by(vec![
            OrderBy::from("certname"),
            OrderBy::desc("timestamp"),
            OrderBy::from("facts"),
        ]);
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["order_by", ["certname", ["timestamp", "desc"], "facts"]]]"#
        );
    }

    #[test]
    fn test_order_by_ast_shapes() {
        let mut fr = certname_query();
        fr.add_order_by_ast(&json!(["certname", ["timestamp", "desc"]]))
            .unwrap();
        assert_eq!(
            fr.to_query_string().unwrap(),
            r#"["from", "facts", ["=", "certname", "test01"], ["order_by", ["certname", ["timestamp", "desc"]]]]"#
        );

        assert!(fr
            .add_order_by_ast(&json!(["certname", ["timestamp", "desc", ["oops"]]]))
            .is_err());
        assert!(fr.add_order_by_ast(&json!("certname")).is_err());
        assert!(fr.add_order_by_ast(&json!([["timestamp", "sideways"]])).is_err());
        assert!(fr.add_order_by_ast(&json!([42])).is_err());
    }
}
