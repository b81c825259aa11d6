//! PuppetDB AST query builder
//!
//! Builds queries in the PuppetDB v4 AST grammar from typed nodes:
//!
//! - **Comparison**: `=`, `>`, `<`, `>=`, `<=`, `~`, `~>`, `null?`
//! - **Boolean**: `and`, `or`, `not`
//! - **Extract / Function**: projections and aggregates
//! - **Subquery / In**: implicit and explicit subqueries
//! - **From**: root entity with ordering and paging
//!
//! Every node serializes to a JSON array; the canonical text form separates
//! items with `", "`.
//!
//! # Examples
//!
//! ```rust
//! use puppetdb_query::query::{BooleanExpr, Comparison, Expression, FromExpr};
//!
//! let mut filter = BooleanExpr::and();
//! filter.add(Comparison::equals("catalog_environment", "production"))?;
//! filter.add(Comparison::equals("facts_environment", "production"))?;
//!
//! let mut query = FromExpr::new("nodes")?;
//! query.add_query(filter)?.add_limit(10);
//!
//! assert_eq!(
//!     query.to_query_string()?,
//!     r#"["from", "nodes", ["and", ["=", "catalog_environment", "production"], ["=", "facts_environment", "production"]], ["limit", 10]]"#
//! );
//! # Ok::<(), puppetdb_query::query::QueryError>(())
//! ```

mod boolean;
mod comparison;
mod entity;
mod error;
mod extract;
mod from;
mod node;
mod subquery;
mod value;
pub mod wire;

pub use boolean::{BooleanExpr, BooleanOp};
pub use comparison::{Comparison, ComparisonOp};
pub use entity::Entity;
pub use error::{QueryError, QueryResult};
pub use extract::{AggregateFn, ExtractExpr, ExtractField, FunctionExpr};
pub use from::{FromExpr, OrderBy, SortDirection};
pub use node::{Expression, Node, QueryFragment};
pub use subquery::{InExpr, SubqueryExpr};
pub use value::{FieldRef, QueryValue};
