//! Wire records of the `catalogs`, `resources` and `edges` endpoints

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::error::CatalogResult;
use crate::catalog::graph::{Catalog, CatalogMetadata};

/// Identity key of a resource: `Type[title]`
pub fn resource_key(resource_type: &str, title: &str) -> String {
    format!("{}[{}]", resource_type, title)
}

/// A resource as returned inside a catalog or by the `resources` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ResourceRecord {
    /// A bare record with no tags, parameters or source location
    pub fn new(resource_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            title: title.into(),
            tags: Vec::new(),
            exported: false,
            file: None,
            line: None,
            parameters: Map::new(),
            certname: None,
            environment: None,
        }
    }

    pub fn key(&self) -> String {
        resource_key(&self.resource_type, &self.title)
    }
}

/// An edge as returned inside a catalog or by the `edges` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source_type: String,
    pub source_title: String,
    pub target_type: String,
    pub target_title: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certname: Option<String>,
}

impl EdgeRecord {
    /// Build an edge from `(type, title)` pairs
    pub fn new(
        source: (&str, &str),
        target: (&str, &str),
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source.0.to_string(),
            source_title: source.1.to_string(),
            target_type: target.0.to_string(),
            target_title: target.1.to_string(),
            relationship: relationship.into(),
            certname: None,
        }
    }

    pub fn source_key(&self) -> String {
        resource_key(&self.source_type, &self.source_title)
    }

    pub fn target_key(&self) -> String {
        resource_key(&self.target_type, &self.target_title)
    }
}

impl std::fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.source_key(),
            self.relationship,
            self.target_key()
        )
    }
}

/// Expanded collection wrapper: `{"data": [...], "href": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expanded<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl<T> Default for Expanded<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            href: None,
        }
    }
}

/// A catalog as returned by the `catalogs` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub certname: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub transaction_uuid: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub code_id: Option<String>,
    #[serde(default)]
    pub catalog_uuid: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub resources: Expanded<ResourceRecord>,
    #[serde(default)]
    pub edges: Expanded<EdgeRecord>,
}

impl CatalogRecord {
    /// Assemble the graph described by this record
    pub fn into_catalog(self) -> CatalogResult<Catalog> {
        let metadata = CatalogMetadata {
            version: self.version,
            transaction_uuid: self.transaction_uuid,
            environment: self.environment,
            code_id: self.code_id,
            catalog_uuid: self.catalog_uuid,
            producer: self.producer,
        };
        Catalog::assemble(
            self.certname,
            metadata,
            self.resources.data,
            self.edges.data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_defaults() {
        let record: ResourceRecord = serde_json::from_value(json!({
            "type": "Class",
            "title": "Main",
            "tags": ["class"],
            "exported": false,
            "parameters": {}
        }))
        .unwrap();

        assert_eq!(record.key(), "Class[Main]");
        assert_eq!(record.file, None);
        assert_eq!(record.line, None);
    }

    #[test]
    fn test_edge_keys() {
        let edge: EdgeRecord = serde_json::from_value(json!({
            "certname": "node1.example.com",
            "relationship": "contains",
            "source_type": "Class",
            "source_title": "Ssh",
            "target_type": "Package",
            "target_title": "openssh-server"
        }))
        .unwrap();

        assert_eq!(edge.source_key(), "Class[Ssh]");
        assert_eq!(edge.target_key(), "Package[openssh-server]");
        assert_eq!(
            edge.to_string(),
            "Class[Ssh] - contains - Package[openssh-server]"
        );
    }

    #[test]
    fn test_catalog_record_into_catalog() {
        let record: CatalogRecord = serde_json::from_value(json!({
            "certname": "node1.example.com",
            "version": "1466437894",
            "transaction_uuid": "5ae1f10c-aed5-4ba4-a8f0-ad2cbe0e0d35",
            "environment": "production",
            "producer": "puppetmaster1",
            "hash": "ignored",
            "resources": {
                "href": "/pdb/query/v4/catalogs/node1.example.com/resources",
                "data": [
                    {"type": "Package", "title": "openssh-server", "tags": [],
                     "exported": false, "file": "/etc/puppet/modules/ssh/manifests/init.pp",
                     "line": 3, "parameters": {"ensure": "installed"}},
                    {"type": "Service", "title": "sshd", "tags": [],
                     "exported": false, "parameters": {}}
                ]
            },
            "edges": {
                "data": [
                    {"relationship": "before",
                     "source_type": "Package", "source_title": "openssh-server",
                     "target_type": "Service", "target_title": "sshd"}
                ]
            }
        }))
        .unwrap();

        let catalog = record.into_catalog().unwrap();
        assert_eq!(catalog.node(), "node1.example.com");
        assert_eq!(catalog.metadata().code_id, None);
        assert_eq!(catalog.resources().count(), 2);
        assert_eq!(catalog.edges().count(), 1);

        let package = catalog.get_resource("Package", "openssh-server").unwrap();
        assert_eq!(package.sourceline, Some(3));
        assert_eq!(package.environment.as_deref(), Some("production"));
        assert_eq!(package.parameters["ensure"], json!("installed"));
    }

    #[test]
    fn test_catalog_record_without_collections() {
        let record: CatalogRecord = serde_json::from_value(json!({
            "certname": "empty.example.com"
        }))
        .unwrap();

        let catalog = record.into_catalog().unwrap();
        assert_eq!(catalog.resources().count(), 0);
        assert_eq!(catalog.edges().count(), 0);
    }
}
