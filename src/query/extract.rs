//! Projection: the `extract` operator and aggregate functions
//!
//! `extract` selects fields (or aggregates) from an entity instead of whole
//! records, optionally filtered and grouped:
//!
//! ```text
//! ["extract", [["function", "count"], "status"],
//!   ["=", "certname", "node1"],
//!   ["group_by", "status"]]
//! ```

use serde_json::{json, Value};
use std::str::FromStr;

use crate::query::error::{QueryError, QueryResult};
use crate::query::node::{Expression, Node, QueryFragment};
use crate::query::value::FieldRef;

/// Aggregate functions understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    Count,
    Avg,
    Sum,
    Min,
    Max,
    /// Formats a timestamp; needs a format string such as `FMDAY`
    ToString,
}

impl AggregateFn {
    /// AST name of the function
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::ToString => "to_string",
        }
    }
}

impl FromStr for AggregateFn {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "avg" => Ok(Self::Avg),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "to_string" => Ok(Self::ToString),
            other => Err(QueryError::UnsupportedFunction(other.to_string())),
        }
    }
}

impl std::fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `["function", name, field?, format?]` node
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    function: AggregateFn,
    field: Option<FieldRef>,
    format: Option<String>,
}

impl FunctionExpr {
    /// Create a function from its parts
    ///
    /// Every function except `count` needs a field; `to_string` also needs a
    /// format, and no other function takes one.
    pub fn build(
        function: AggregateFn,
        field: Option<FieldRef>,
        format: Option<String>,
    ) -> QueryResult<Self> {
        if function != AggregateFn::Count && field.is_none() {
            return Err(QueryError::MissingArgument {
                context: function_context(function),
                argument: "a field",
            });
        }
        match (function, &format) {
            (AggregateFn::ToString, None) => {
                return Err(QueryError::MissingArgument {
                    context: function_context(function),
                    argument: "a format",
                })
            }
            (AggregateFn::ToString, Some(_)) | (_, None) => {}
            (_, Some(_)) => {
                return Err(QueryError::InvalidValue {
                    context: function_context(function),
                    reason: "only to_string takes a format".to_string(),
                })
            }
        }
        Ok(Self {
            function,
            field,
            format,
        })
    }

    /// Create a function by name, e.g. `FunctionExpr::new("avg", Some("uptime"), None)`
    pub fn new(function: &str, field: Option<&str>, format: Option<&str>) -> QueryResult<Self> {
        Self::build(
            function.parse()?,
            field.map(FieldRef::from),
            format.map(str::to_string),
        )
    }

    /// `["function", "count"]`
    pub fn count() -> Self {
        Self {
            function: AggregateFn::Count,
            field: None,
            format: None,
        }
    }

    /// `["function", "count", field]`
    pub fn count_of(field: impl Into<FieldRef>) -> Self {
        Self::with_field(AggregateFn::Count, field)
    }

    /// `["function", "avg", field]`
    pub fn avg(field: impl Into<FieldRef>) -> Self {
        Self::with_field(AggregateFn::Avg, field)
    }

    /// `["function", "sum", field]`
    pub fn sum(field: impl Into<FieldRef>) -> Self {
        Self::with_field(AggregateFn::Sum, field)
    }

    /// `["function", "min", field]`
    pub fn min(field: impl Into<FieldRef>) -> Self {
        Self::with_field(AggregateFn::Min, field)
    }

    /// `["function", "max", field]`
    pub fn max(field: impl Into<FieldRef>) -> Self {
        Self::with_field(AggregateFn::Max, field)
    }

    /// `["function", "to_string", field, format]`
    pub fn stringify(field: impl Into<FieldRef>, format: impl Into<String>) -> Self {
        Self {
            function: AggregateFn::ToString,
            field: Some(field.into()),
            format: Some(format.into()),
        }
    }

    fn with_field(function: AggregateFn, field: impl Into<FieldRef>) -> Self {
        Self {
            function,
            field: Some(field.into()),
            format: None,
        }
    }

    /// The aggregate function
    pub fn function(&self) -> AggregateFn {
        self.function
    }

    fn ast(&self) -> Value {
        let mut arr = vec![json!("function"), json!(self.function.as_str())];
        if let Some(field) = &self.field {
            arr.push(field.to_json());
        }
        if let Some(format) = &self.format {
            arr.push(json!(format));
        }
        Value::Array(arr)
    }
}

fn function_context(function: AggregateFn) -> &'static str {
    match function {
        AggregateFn::Count => "function count",
        AggregateFn::Avg => "function avg",
        AggregateFn::Sum => "function sum",
        AggregateFn::Min => "function min",
        AggregateFn::Max => "function max",
        AggregateFn::ToString => "function to_string",
    }
}

impl Expression for FunctionExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        Ok(self.ast())
    }
}

/// An entry of an `extract` field list or `group_by` clause
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractField {
    /// A field name
    Field(FieldRef),
    /// An aggregate over a field
    Function(FunctionExpr),
    /// Several entries, flattened when added
    Many(Vec<ExtractField>),
}

impl ExtractField {
    fn flatten_into(self, out: &mut Vec<ExtractField>) {
        match self {
            Self::Many(items) => items.into_iter().for_each(|i| i.flatten_into(out)),
            single => out.push(single),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Field(field) => field.to_json(),
            Self::Function(function) => function.ast(),
            Self::Many(items) => Value::Array(items.iter().map(ExtractField::to_json).collect()),
        }
    }
}

impl From<&str> for ExtractField {
    fn from(name: &str) -> Self {
        Self::Field(FieldRef::from(name))
    }
}

impl From<String> for ExtractField {
    fn from(name: String) -> Self {
        Self::Field(FieldRef::from(name))
    }
}

impl From<FieldRef> for ExtractField {
    fn from(field: FieldRef) -> Self {
        Self::Field(field)
    }
}

impl From<FunctionExpr> for ExtractField {
    fn from(function: FunctionExpr) -> Self {
        Self::Function(function)
    }
}

impl From<&FunctionExpr> for ExtractField {
    fn from(function: &FunctionExpr) -> Self {
        Self::Function(function.clone())
    }
}

impl<T: Into<ExtractField>> From<Vec<T>> for ExtractField {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

/// An `extract` projection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractExpr {
    fields: Vec<ExtractField>,
    query: Option<Value>,
    group_by: Vec<ExtractField>,
}

impl ExtractExpr {
    /// Create an empty projection; at least one field must be added
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one or more output fields or aggregates
    pub fn add_field(&mut self, field: impl Into<ExtractField>) -> &mut Self {
        field.into().flatten_into(&mut self.fields);
        self
    }

    /// Attach the filter query
    ///
    /// Accepts a comparison, boolean operator, subquery or query string.
    /// Only one filter may be attached.
    pub fn add_query(&mut self, query: impl Into<QueryFragment>) -> QueryResult<&mut Self> {
        if self.query.is_some() {
            return Err(QueryError::AlreadyAttached("extract"));
        }
        let ast = query.into().into_single_ast("extract", |node| {
            matches!(
                node,
                Node::Comparison(_) | Node::Boolean(_) | Node::Subquery(_)
            )
        })?;
        self.query = Some(ast);
        Ok(self)
    }

    /// Add one or more grouping fields or aggregates
    pub fn add_group_by(&mut self, field: impl Into<ExtractField>) -> &mut Self {
        field.into().flatten_into(&mut self.group_by);
        self
    }

    /// Number of output fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl Expression for ExtractExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        if self.fields.is_empty() {
            return Err(QueryError::Incomplete("extract needs at least one field"));
        }

        let mut arr = vec![
            json!("extract"),
            Value::Array(self.fields.iter().map(ExtractField::to_json).collect()),
        ];
        if let Some(query) = &self.query {
            arr.push(query.clone());
        }
        if !self.group_by.is_empty() {
            let mut group = vec![json!("group_by")];
            group.extend(self.group_by.iter().map(ExtractField::to_json));
            arr.push(Value::Array(group));
        }
        Ok(Value::Array(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::boolean::BooleanExpr;
    use crate::query::comparison::Comparison;
    use crate::query::subquery::{InExpr, SubqueryExpr};

    #[test]
    fn test_function_arity() {
        assert_eq!(
            FunctionExpr::new("count", None, None)
                .unwrap()
                .to_query_string()
                .unwrap(),
            r#"["function", "count"]"#
        );
        assert_eq!(
            FunctionExpr::new("count", Some("domain"), None)
                .unwrap()
                .to_query_string()
                .unwrap(),
            r#"["function", "count", "domain"]"#
        );
        assert_eq!(
            FunctionExpr::new("avg", Some("uptime"), None)
                .unwrap()
                .to_query_string()
                .unwrap(),
            r#"["function", "avg", "uptime"]"#
        );

        for name in ["avg", "sum", "min", "max"] {
            assert!(matches!(
                FunctionExpr::new(name, None, None),
                Err(QueryError::MissingArgument { argument: "a field", .. })
            ));
        }
    }

    #[test]
    fn test_to_string_needs_format() {
        assert!(FunctionExpr::new("to_string", None, None).is_err());
        assert!(matches!(
            FunctionExpr::new("to_string", Some("receive_time"), None),
            Err(QueryError::MissingArgument { argument: "a format", .. })
        ));

        let f = FunctionExpr::new("to_string", Some("producer_timestamp"), Some("FMDAY")).unwrap();
        assert_eq!(
            f.to_query_string().unwrap(),
            r#"["function", "to_string", "producer_timestamp", "FMDAY"]"#
        );
        assert_eq!(f, FunctionExpr::stringify("producer_timestamp", "FMDAY"));
    }

    #[test]
    fn test_format_only_for_to_string() {
        assert!(matches!(
            FunctionExpr::new("avg", Some("uptime"), Some("FMDAY")),
            Err(QueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            FunctionExpr::new("std_dev", None, None).unwrap_err(),
            QueryError::UnsupportedFunction("std_dev".to_string())
        );
        assert!(FunctionExpr::new("last", Some("x"), None).is_err());
    }

    #[test]
    fn test_extract_fields() {
        let mut op = ExtractExpr::new();
        assert!(matches!(op.to_ast(), Err(QueryError::Incomplete(_))));

        op.add_field("certname");
        op.add_field(vec!["fact_environment", "catalog_environment"]);

        assert_eq!(
            op.describe().unwrap(),
            r#"Query: ["extract", ["certname", "fact_environment", "catalog_environment"]]"#
        );
        assert_eq!(op.field_count(), 3);
    }

    #[test]
    fn test_extract_with_query_and_group_by() {
        let mut op = ExtractExpr::new();
        op.add_field(vec!["certname", "fact_environment", "catalog_environment"]);
        op.add_query(Comparison::equals("domain", "example.com"))
            .unwrap();
        op.add_group_by(vec!["fact_environment", "catalog_environment"]);

        assert_eq!(
            op.to_query_string().unwrap(),
            r#"["extract", ["certname", "fact_environment", "catalog_environment"], ["=", "domain", "example.com"], ["group_by", "fact_environment", "catalog_environment"]]"#
        );

        assert_eq!(
            op.add_query(Comparison::greater("processorcount", 1))
                .unwrap_err(),
            QueryError::AlreadyAttached("extract")
        );
    }

    #[test]
    fn test_extract_with_functions() {
        let mut op = ExtractExpr::new();
        op.add_field(FunctionExpr::stringify("producer_timestamp", "FMDAY"));
        op.add_field(FunctionExpr::count());
        op.add_group_by(FunctionExpr::stringify("producer_timestamp", "FMDAY"));

        assert_eq!(
            op.to_query_string().unwrap(),
            r#"["extract", [["function", "to_string", "producer_timestamp", "FMDAY"], ["function", "count"]], ["group_by", ["function", "to_string", "producer_timestamp", "FMDAY"]]]"#
        );
    }

    #[test]
    fn test_extract_query_kinds() {
        let mut op = ExtractExpr::new();
        op.add_field("certname");
        assert!(matches!(
            op.add_query(InExpr::new("certname")),
            Err(QueryError::UnsupportedOperand { context: "extract", .. })
        ));
        assert!(op.add_query(vec![Comparison::equals("a", 1)]).is_err());

        let mut sub = SubqueryExpr::new("events").unwrap();
        sub.add_query(Comparison::equals("status", "noop")).unwrap();
        op.add_query(sub).unwrap();
        assert_eq!(
            op.to_query_string().unwrap(),
            r#"["extract", ["certname"], ["select_events", ["=", "status", "noop"]]]"#
        );

        let mut op = ExtractExpr::new();
        op.add_field("certname");
        let mut both = BooleanExpr::and();
        both.add(Comparison::equals("a", 1)).unwrap();
        op.add_query(&both).unwrap();
        assert!(op.to_ast().is_ok());
    }
}
