//! Queryable PuppetDB entities
//!
//! The v4 query API exposes a fixed set of entity collections. Not every
//! entity can appear everywhere: `select_<entity>` subqueries accept a smaller
//! set than the `from` root operator.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::query::error::QueryError;

/// An entity collection of the PuppetDB v4 query API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    AggregateEventCounts,
    Catalogs,
    Edges,
    Environments,
    EventCounts,
    Events,
    Facts,
    FactContents,
    FactNames,
    FactPaths,
    Nodes,
    Producers,
    Reports,
    Resources,
}

impl Entity {
    /// Entities valid as the root of a `from` query
    pub const ROOT: &'static [Entity] = &[
        Entity::AggregateEventCounts,
        Entity::Catalogs,
        Entity::Edges,
        Entity::Environments,
        Entity::EventCounts,
        Entity::Events,
        Entity::Facts,
        Entity::FactContents,
        Entity::FactNames,
        Entity::FactPaths,
        Entity::Nodes,
        Entity::Producers,
        Entity::Reports,
        Entity::Resources,
    ];

    /// Entities valid in a `select_<entity>` subquery
    pub const SUBQUERY: &'static [Entity] = &[
        Entity::Catalogs,
        Entity::Edges,
        Entity::Environments,
        Entity::Events,
        Entity::Facts,
        Entity::FactContents,
        Entity::FactPaths,
        Entity::Nodes,
        Entity::Reports,
        Entity::Resources,
    ];

    /// AST name of the entity
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AggregateEventCounts => "aggregate_event_counts",
            Self::Catalogs => "catalogs",
            Self::Edges => "edges",
            Self::Environments => "environments",
            Self::EventCounts => "event_counts",
            Self::Events => "events",
            Self::Facts => "facts",
            Self::FactContents => "fact_contents",
            Self::FactNames => "fact_names",
            Self::FactPaths => "fact_paths",
            Self::Nodes => "nodes",
            Self::Producers => "producers",
            Self::Reports => "reports",
            Self::Resources => "resources",
        }
    }

    /// Whether the entity may be the target of a `select_<entity>` subquery
    pub fn is_subqueryable(&self) -> bool {
        Self::SUBQUERY.contains(self)
    }

    /// URL path of the entity's v4 query endpoint
    ///
    /// Endpoint URLs use hyphens where AST names use underscores.
    pub fn endpoint_path(&self) -> String {
        format!("pdb/query/v4/{}", self.as_str().replace('_', "-"))
    }

    /// Resolve an entity name against an allow-list
    pub(crate) fn parse_allowed(name: &str, allowed: &[Entity]) -> Result<Self, QueryError> {
        match name.parse::<Entity>() {
            Ok(entity) if allowed.contains(&entity) => Ok(entity),
            _ => Err(QueryError::UnsupportedEntity {
                entity: name.to_string(),
                allowed: allowed
                    .iter()
                    .map(Entity::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

impl FromStr for Entity {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ROOT
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| QueryError::UnsupportedEntity {
                entity: s.to_string(),
                allowed: Self::ROOT
                    .iter()
                    .map(Entity::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity() {
        assert_eq!("facts".parse::<Entity>().unwrap(), Entity::Facts);
        assert_eq!(
            "aggregate_event_counts".parse::<Entity>().unwrap(),
            Entity::AggregateEventCounts
        );
        assert!("cats".parse::<Entity>().is_err());
        assert!("fact-contents".parse::<Entity>().is_err());
    }

    #[test]
    fn test_subquery_allow_list() {
        assert!(Entity::Events.is_subqueryable());
        assert!(Entity::FactContents.is_subqueryable());
        assert!(!Entity::Producers.is_subqueryable());
        assert!(!Entity::FactNames.is_subqueryable());
        assert!(!Entity::EventCounts.is_subqueryable());

        assert!(Entity::parse_allowed("producers", Entity::SUBQUERY).is_err());
        assert!(Entity::parse_allowed("producers", Entity::ROOT).is_ok());
    }

    #[test]
    fn test_endpoint_path() {
        assert_eq!(Entity::Facts.endpoint_path(), "pdb/query/v4/facts");
        assert_eq!(
            Entity::FactContents.endpoint_path(),
            "pdb/query/v4/fact-contents"
        );
        assert_eq!(
            Entity::AggregateEventCounts.endpoint_path(),
            "pdb/query/v4/aggregate-event-counts"
        );
    }
}
