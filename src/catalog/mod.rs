//! Catalog dependency graph
//!
//! A compiled catalog arrives as two flat lists: resources and the edges
//! between them. [`Catalog::assemble`] turns them into a graph where
//! resources are addressed by their `Type[title]` key and each resource
//! knows the edges it takes part in.
//!
//! ```rust
//! use puppetdb_query::catalog::{Catalog, CatalogMetadata, EdgeRecord, ResourceRecord};
//!
//! let resources = vec![
//!     ResourceRecord::new("File", "/etc/ssh/sshd_config"),
//!     ResourceRecord::new("Service", "sshd"),
//! ];
//! let edges = vec![EdgeRecord::new(
//!     ("File", "/etc/ssh/sshd_config"),
//!     ("Service", "sshd"),
//!     "notifies",
//! )];
//!
//! let catalog = Catalog::assemble("node1", CatalogMetadata::default(), resources, edges)?;
//! let service = catalog.get_resource("Service", "sshd").unwrap();
//! assert_eq!(catalog.relationships(service).count(), 1);
//! # Ok::<(), puppetdb_query::catalog::CatalogError>(())
//! ```

mod error;
mod graph;
mod record;

pub use error::{CatalogError, CatalogResult};
pub use graph::{Catalog, CatalogMetadata, Edge, EdgeId, Resource, ResourceId};
pub use record::{resource_key, CatalogRecord, EdgeRecord, Expanded, ResourceRecord};
