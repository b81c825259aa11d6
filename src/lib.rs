//! # puppetdb-query
//!
//! Client library for PuppetDB: a typed builder for the v4 AST query
//! language and an assembler that turns catalog records into a resource
//! dependency graph.
//!
//! ## Modules
//!
//! - [`query`]: AST nodes and their canonical text form
//! - [`catalog`]: Catalog graph of resources and edges
//! - [`client`]: HTTP transport for sending queries
//! - [`config`]: Connection and logging settings
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use puppetdb_query::client::{fetch_catalog, run_query, PuppetDbClient};
//! use puppetdb_query::config::Config;
//! use puppetdb_query::query::{Comparison, Entity, ExtractExpr};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default()?;
//!     puppetdb_query::logging::init(&config.logging)?;
//!
//!     let client = PuppetDbClient::new(config.puppetdb)?;
//!
//!     // Certnames of every node in production
//!     let mut query = ExtractExpr::new();
//!     query
//!         .add_field("certname")
//!         .add_query(Comparison::equals("catalog_environment", "production"))?;
//!     let nodes = run_query(&client, Entity::Nodes, &query).await?;
//!     println!("{}", nodes);
//!
//!     // Dependency graph of one node
//!     let catalog = fetch_catalog(&client, "node1.example.com").await?;
//!     for line in catalog.edges().filter_map(|edge| catalog.describe_edge(edge)) {
//!         println!("{}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod logging;
pub mod query;

// Re-export top-level types for convenience
pub use query::{
    BooleanExpr, Comparison, Entity, Expression, ExtractExpr, FromExpr, FunctionExpr, InExpr,
    QueryError, QueryResult, SubqueryExpr,
};

pub use catalog::{Catalog, CatalogError, CatalogResult, Edge, Resource};

pub use client::{
    ClientError, ClientResult, Command, CommandRequest, MetricsApi, PuppetDbClient, QueryRequest,
    Transport,
};

pub use config::{Config, ConfigError, LoggingConfig, PuppetDbConfig};
