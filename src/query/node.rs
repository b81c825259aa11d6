//! The expression contract shared by every AST node
//!
//! Each node kind is its own type with its own construction rules. [`Node`]
//! closes over all of them so that positions accepting "some expression"
//! can check which kinds they allow with an exhaustive match.

use serde_json::Value;

use crate::query::boolean::BooleanExpr;
use crate::query::comparison::Comparison;
use crate::query::error::{QueryError, QueryResult};
use crate::query::extract::{ExtractExpr, FunctionExpr};
use crate::query::from::FromExpr;
use crate::query::subquery::{InExpr, SubqueryExpr};
use crate::query::wire;

/// Anything that serializes to a PuppetDB AST array
pub trait Expression {
    /// Build the wire form of the node
    ///
    /// Fails only when a required part (operands, fields, main query) has not
    /// been attached yet.
    fn to_ast(&self) -> QueryResult<Value>;

    /// Canonical text form, ready to send as the `query` parameter
    fn to_query_string(&self) -> QueryResult<String> {
        wire::to_text(&self.to_ast()?)
    }

    /// Human-readable form, `Query: <text>`
    fn describe(&self) -> QueryResult<String> {
        Ok(format!("Query: {}", self.to_query_string()?))
    }
}

/// Any AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Comparison(Comparison),
    Boolean(BooleanExpr),
    Extract(ExtractExpr),
    Function(FunctionExpr),
    Subquery(SubqueryExpr),
    In(InExpr),
    From(FromExpr),
}

impl Node {
    /// Name of the node kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Comparison(_) => "a comparison",
            Self::Boolean(_) => "a boolean operator",
            Self::Extract(_) => "an extract",
            Self::Function(_) => "a function",
            Self::Subquery(_) => "a subquery",
            Self::In(_) => "an in operator",
            Self::From(_) => "a from operator",
        }
    }
}

impl Expression for Node {
    fn to_ast(&self) -> QueryResult<Value> {
        match self {
            Self::Comparison(n) => n.to_ast(),
            Self::Boolean(n) => n.to_ast(),
            Self::Extract(n) => n.to_ast(),
            Self::Function(n) => n.to_ast(),
            Self::Subquery(n) => n.to_ast(),
            Self::In(n) => n.to_ast(),
            Self::From(n) => n.to_ast(),
        }
    }
}

/// An argument to one of the `add*` methods
///
/// Pre-serialized text is parsed when it is attached; sequences are
/// flattened where the receiving position allows several operands.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFragment {
    /// Query text such as `["=", "certname", "node1"]`
    Raw(String),
    /// A built node
    Node(Node),
    /// Several fragments at once
    Sequence(Vec<QueryFragment>),
}

impl QueryFragment {
    /// Name of the fragment kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raw(_) => "a query string",
            Self::Node(node) => node.kind(),
            Self::Sequence(_) => "a sequence",
        }
    }

    /// Resolve a single fragment into its wire form
    ///
    /// `accepts` decides which node kinds may occupy the position named by
    /// `context`. Sequences are never accepted here.
    pub(crate) fn into_single_ast(
        self,
        context: &'static str,
        accepts: fn(&Node) -> bool,
    ) -> QueryResult<Value> {
        match self {
            Self::Raw(text) => wire::parse(&text),
            Self::Node(node) if accepts(&node) => node.to_ast(),
            other => Err(QueryError::UnsupportedOperand {
                context,
                found: other.kind(),
            }),
        }
    }
}

impl From<&str> for QueryFragment {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

impl From<String> for QueryFragment {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<Node> for QueryFragment {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl<T: Into<QueryFragment>> From<Vec<T>> for QueryFragment {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_node_conversions {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Node::$variant(node)
                }
            }

            impl From<&$ty> for Node {
                fn from(node: &$ty) -> Self {
                    Node::$variant(node.clone())
                }
            }

            impl From<$ty> for QueryFragment {
                fn from(node: $ty) -> Self {
                    QueryFragment::Node(Node::$variant(node))
                }
            }

            impl From<&$ty> for QueryFragment {
                fn from(node: &$ty) -> Self {
                    QueryFragment::Node(Node::$variant(node.clone()))
                }
            }
        )*
    };
}

impl_node_conversions! {
    Comparison => Comparison,
    BooleanExpr => Boolean,
    ExtractExpr => Extract,
    FunctionExpr => Function,
    SubqueryExpr => Subquery,
    InExpr => In,
    FromExpr => From,
}
