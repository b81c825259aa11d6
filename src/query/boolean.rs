//! Boolean operators: `and`, `or`, `not`
//!
//! Boolean operators are built incrementally. Operands are checked as they
//! are added; the "at least one operand" rule is checked when the AST is
//! produced, since the operand count is only final then.
//!
//! ```text
//! ["and", ["=", "catalog_environment", "production"],
//!         ["=", "facts_environment", "production"]]
//! ["not", ["=", "osfamily", "RedHat"]]
//! ```

use serde_json::Value;

use crate::query::error::{QueryError, QueryResult};
use crate::query::node::{Expression, Node, QueryFragment};
use crate::query::wire;

/// Boolean operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    And,
    Or,
    /// Accepts exactly one operand
    Not,
}

impl BooleanOp {
    /// AST name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

impl std::fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A boolean operator and its serialized operands
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExpr {
    op: BooleanOp,
    operations: Vec<Value>,
}

impl BooleanExpr {
    /// Create an empty operator
    pub fn new(op: BooleanOp) -> Self {
        Self {
            op,
            operations: Vec::new(),
        }
    }

    /// Create an empty `and`
    pub fn and() -> Self {
        Self::new(BooleanOp::And)
    }

    /// Create an empty `or`
    pub fn or() -> Self {
        Self::new(BooleanOp::Or)
    }

    /// Create an empty `not`
    pub fn not() -> Self {
        Self::new(BooleanOp::Not)
    }

    /// The operator
    pub fn op(&self) -> BooleanOp {
        self.op
    }

    /// Number of operands added so far
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operand has been added yet
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Add one or more operands
    ///
    /// Accepts comparisons, boolean operators, `in` operators, query strings,
    /// and sequences of those (flattened). A `not` rejects any second operand
    /// and any sequence of more than one element.
    pub fn add(&mut self, operand: impl Into<QueryFragment>) -> QueryResult<&mut Self> {
        let mut resolved = Vec::new();
        self.resolve(operand.into(), &mut resolved)?;

        if self.op == BooleanOp::Not && (!self.operations.is_empty() || resolved.len() > 1) {
            return Err(QueryError::AlreadyAttached("not"));
        }

        self.operations.extend(resolved);
        Ok(self)
    }

    /// Flatten a fragment into `out`; `self` is left untouched on failure
    fn resolve(&self, fragment: QueryFragment, out: &mut Vec<Value>) -> QueryResult<()> {
        match fragment {
            QueryFragment::Sequence(items) => {
                for item in items {
                    self.resolve(item, out)?;
                }
            }
            QueryFragment::Raw(text) => out.push(wire::parse(&text)?),
            QueryFragment::Node(
                node @ (Node::Comparison(_) | Node::Boolean(_) | Node::In(_)),
            ) => out.push(node.to_ast()?),
            QueryFragment::Node(other) => {
                return Err(QueryError::UnsupportedOperand {
                    context: self.op.as_str(),
                    found: other.kind(),
                })
            }
        }
        Ok(())
    }
}

impl Expression for BooleanExpr {
    fn to_ast(&self) -> QueryResult<Value> {
        if self.operations.is_empty() {
            return Err(QueryError::Incomplete(
                "At least one query operation is required",
            ));
        }
        let mut arr = Vec::with_capacity(self.operations.len() + 1);
        arr.push(Value::String(self.op.as_str().to_string()));
        arr.extend(self.operations.iter().cloned());
        Ok(Value::Array(arr))
    }
}
