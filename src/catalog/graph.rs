//! Arena-backed catalog graph
//!
//! Resources and edges live in flat vectors and refer to each other by
//! index, so the graph has no shared ownership and is immutable once built.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::record::{resource_key, EdgeRecord, ResourceRecord};

/// Index of a resource within its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(usize);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.0)
    }
}

/// Index of an edge within its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

/// A resource managed by a catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Certname of the node owning the catalog
    pub node: String,
    /// Resource title
    pub name: String,
    pub resource_type: String,
    pub tags: Vec<String>,
    pub exported: bool,
    /// Manifest the resource was declared in, when known
    pub sourcefile: Option<String>,
    /// Line of the declaration, when known
    pub sourceline: Option<u64>,
    pub parameters: Map<String, Value>,
    pub environment: Option<String>,
    /// Edges this resource is the source or target of, in assembly order
    pub relationships: Vec<EdgeId>,
}

impl Resource {
    fn from_record(node: &str, environment: Option<&str>, record: ResourceRecord) -> Self {
        Self {
            node: node.to_string(),
            name: record.title,
            resource_type: record.resource_type,
            tags: record.tags,
            exported: record.exported,
            sourcefile: record.file,
            sourceline: record.line,
            parameters: record.parameters,
            environment: environment.map(str::to_string),
            relationships: Vec::new(),
        }
    }

    /// Identity key, `Type[title]`
    pub fn key(&self) -> String {
        resource_key(&self.resource_type, &self.name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.resource_type, self.name)
    }
}

/// A relationship between two resources of the same catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: ResourceId,
    pub target: ResourceId,
    /// Puppet relationship name, e.g. `contains`, `before`, `notifies`
    pub relationship: String,
    pub node: String,
}

/// Catalog-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub version: Option<String>,
    pub transaction_uuid: Option<String>,
    pub environment: Option<String>,
    pub code_id: Option<String>,
    pub catalog_uuid: Option<String>,
    /// Certname of the compiling server
    pub producer: Option<String>,
}

/// A compiled catalog as a resource dependency graph
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    node: String,
    metadata: CatalogMetadata,
    resources: Vec<Resource>,
    index: HashMap<String, ResourceId>,
    edges: Vec<Edge>,
}

impl Catalog {
    /// Build the graph from flat resource and edge records
    ///
    /// Resources sharing a key replace the earlier one in place. Every edge
    /// is recorded on both its endpoints. Fails with
    /// [`CatalogError::DanglingEdge`] when an edge names an unknown resource.
    pub fn assemble(
        node: impl Into<String>,
        metadata: CatalogMetadata,
        resources: impl IntoIterator<Item = ResourceRecord>,
        edges: impl IntoIterator<Item = EdgeRecord>,
    ) -> CatalogResult<Self> {
        let node = node.into();
        let mut catalog = Self {
            node,
            metadata,
            resources: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        };

        for record in resources {
            let key = record.key();
            let resource =
                Resource::from_record(&catalog.node, catalog.metadata.environment.as_deref(), record);
            match catalog.index.get(&key) {
                Some(&id) => {
                    tracing::warn!(node = %catalog.node, key = %key, "Duplicate resource, keeping the last one");
                    catalog.resources[id.0] = resource;
                }
                None => {
                    let id = ResourceId(catalog.resources.len());
                    catalog.resources.push(resource);
                    catalog.index.insert(key, id);
                }
            }
        }

        for record in edges {
            let source_key = record.source_key();
            let target_key = record.target_key();
            let lookup = |key: &str| {
                catalog
                    .index
                    .get(key)
                    .copied()
                    .ok_or_else(|| CatalogError::DanglingEdge {
                        source_key: source_key.clone(),
                        target_key: target_key.clone(),
                        relationship: record.relationship.clone(),
                        missing: key.to_string(),
                    })
            };
            let source = lookup(&source_key)?;
            let target = lookup(&target_key)?;

            let id = EdgeId(catalog.edges.len());
            catalog.edges.push(Edge {
                source,
                target,
                relationship: record.relationship,
                node: catalog.node.clone(),
            });
            catalog.resources[source.0].relationships.push(id);
            catalog.resources[target.0].relationships.push(id);
        }

        tracing::debug!(
            node = %catalog.node,
            resources = catalog.resources.len(),
            edges = catalog.edges.len(),
            "Assembled catalog"
        );

        Ok(catalog)
    }

    /// Certname of the node the catalog was compiled for
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn metadata(&self) -> &CatalogMetadata {
        &self.metadata
    }

    /// All resources, in first-seen key order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// All edges, in record order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Look up a resource by type and title
    pub fn get_resource(&self, resource_type: &str, title: &str) -> Option<&Resource> {
        self.index
            .get(&resource_key(resource_type, title))
            .map(|id| &self.resources[id.0])
    }

    /// Id of a resource by type and title
    pub fn resource_id(&self, resource_type: &str, title: &str) -> Option<ResourceId> {
        self.index.get(&resource_key(resource_type, title)).copied()
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    /// Edges a resource takes part in, as source or target
    pub fn relationships<'a>(&'a self, resource: &'a Resource) -> impl Iterator<Item = &'a Edge> {
        resource
            .relationships
            .iter()
            .filter_map(move |id| self.edge(*id))
    }

    /// Source resource of an edge
    ///
    /// `None` when the edge belongs to another catalog and its index is out
    /// of range here.
    pub fn source(&self, edge: &Edge) -> Option<&Resource> {
        self.resource(edge.source)
    }

    /// Target resource of an edge
    pub fn target(&self, edge: &Edge) -> Option<&Resource> {
        self.resource(edge.target)
    }

    /// Render an edge as `Type[a] - relationship - Type[b]`
    pub fn describe_edge(&self, edge: &Edge) -> Option<String> {
        Some(format!(
            "{} - {} - {}",
            self.source(edge)?,
            edge.relationship,
            self.target(edge)?
        ))
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.node,
            self.metadata.transaction_uuid.as_deref().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_resource() -> ResourceRecord {
        let mut record = ResourceRecord::new("File", "/etc/passwd");
        record.tags = vec!["file".to_string(), "class".to_string()];
        record.parameters.insert("ensure".to_string(), json!("file"));
        record
    }

    fn sshd_resource() -> ResourceRecord {
        let mut record = ResourceRecord::new("Service", "sshd");
        record.file = Some("/etc/puppet/modules/ssh/manifests/init.pp".to_string());
        record.line = Some(12);
        record
    }

    fn metadata() -> CatalogMetadata {
        CatalogMetadata {
            version: Some("1466437894".to_string()),
            transaction_uuid: Some("0aa8d3e2-a0a9-4b49-a6d4-5ea1e0b1f6c8".to_string()),
            environment: Some("production".to_string()),
            ..Default::default()
        }
    }

    fn notify_catalog() -> Catalog {
        Catalog::assemble(
            "node1",
            metadata(),
            vec![file_resource(), sshd_resource()],
            vec![EdgeRecord::new(
                ("File", "/etc/passwd"),
                ("Service", "sshd"),
                "notify",
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_assemble() {
        let catalog = notify_catalog();

        assert_eq!(catalog.node(), "node1");
        assert_eq!(catalog.resources().count(), 2);
        assert_eq!(catalog.edges().count(), 1);

        let file = catalog.get_resource("File", "/etc/passwd").unwrap();
        let sshd = catalog.get_resource("Service", "sshd").unwrap();
        assert_eq!(file.relationships.len(), 1);
        assert_eq!(sshd.relationships.len(), 1);
        assert_eq!(file.relationships, sshd.relationships);

        let edge = catalog.edges().next().unwrap();
        assert_eq!(catalog.source(edge), Some(file));
        assert_eq!(catalog.target(edge), Some(sshd));
        assert_eq!(edge.node, "node1");
        assert_eq!(
            catalog.describe_edge(edge).unwrap(),
            "File[/etc/passwd] - notify - Service[sshd]"
        );
    }

    #[test]
    fn test_resource_fields() {
        let catalog = notify_catalog();

        let file = catalog.get_resource("File", "/etc/passwd").unwrap();
        assert_eq!(file.to_string(), "File[/etc/passwd]");
        assert_eq!(file.key(), "File[/etc/passwd]");
        assert_eq!(file.node, "node1");
        assert_eq!(file.environment.as_deref(), Some("production"));
        assert_eq!(file.sourcefile, None);
        assert_eq!(file.sourceline, None);
        assert_eq!(file.parameters["ensure"], json!("file"));

        let sshd = catalog.get_resource("Service", "sshd").unwrap();
        assert_eq!(sshd.sourceline, Some(12));
        assert!(catalog.get_resource("Service", "ntpd").is_none());
    }

    #[test]
    fn test_relationships_navigation() {
        let catalog = Catalog::assemble(
            "node1",
            metadata(),
            vec![
                ResourceRecord::new("Package", "openssh-server"),
                file_resource(),
                sshd_resource(),
            ],
            vec![
                EdgeRecord::new(("Package", "openssh-server"), ("Service", "sshd"), "before"),
                EdgeRecord::new(("File", "/etc/passwd"), ("Service", "sshd"), "notify"),
            ],
        )
        .unwrap();

        let sshd = catalog.get_resource("Service", "sshd").unwrap();
        let sources: Vec<String> = catalog
            .relationships(sshd)
            .filter_map(|edge| catalog.source(edge))
            .map(|resource| resource.to_string())
            .collect();
        assert_eq!(sources, vec!["Package[openssh-server]", "File[/etc/passwd]"]);

        let id = catalog.resource_id("Package", "openssh-server").unwrap();
        assert_eq!(catalog.resource(id).unwrap().name, "openssh-server");
        assert_eq!(catalog.edge(EdgeId(1)).unwrap().relationship, "notify");
        assert!(catalog.edge(EdgeId(2)).is_none());
    }

    #[test]
    fn test_foreign_edge_resolves_to_none() {
        let large = Catalog::assemble(
            "node2",
            metadata(),
            vec![
                file_resource(),
                ResourceRecord::new("Package", "openssh-server"),
                sshd_resource(),
            ],
            vec![EdgeRecord::new(
                ("File", "/etc/passwd"),
                ("Service", "sshd"),
                "notify",
            )],
        )
        .unwrap();
        let small = Catalog::assemble(
            "node1",
            metadata(),
            vec![file_resource()],
            Vec::<EdgeRecord>::new(),
        )
        .unwrap();

        let edge = large.edges().next().unwrap();
        assert!(small.source(edge).is_some());
        assert!(small.target(edge).is_none());
        assert!(small.describe_edge(edge).is_none());
    }

    #[test]
    fn test_dangling_edge() {
        let result = Catalog::assemble(
            "node1",
            metadata(),
            vec![file_resource()],
            vec![EdgeRecord::new(
                ("File", "/etc/passwd"),
                ("Service", "sshd"),
                "notify",
            )],
        );

        assert_eq!(
            result.unwrap_err(),
            CatalogError::DanglingEdge {
                source_key: "File[/etc/passwd]".to_string(),
                target_key: "Service[sshd]".to_string(),
                relationship: "notify".to_string(),
                missing: "Service[sshd]".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let mut replacement = file_resource();
        replacement.line = Some(99);

        let catalog = Catalog::assemble(
            "node1",
            metadata(),
            vec![file_resource(), sshd_resource(), replacement],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(catalog.resources().count(), 2);
        let file = catalog.get_resource("File", "/etc/passwd").unwrap();
        assert_eq!(file.sourceline, Some(99));
        assert_eq!(catalog.resources().next().unwrap().key(), "File[/etc/passwd]");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            notify_catalog().to_string(),
            "node1/0aa8d3e2-a0a9-4b49-a6d4-5ea1e0b1f6c8"
        );
    }
}
