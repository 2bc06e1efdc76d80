//! Query-scoped models.

use serde::{Deserialize, Serialize};

/// A named entity mentioned in a question. Ephemeral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEntity {
    pub name: String,
    pub entity_type: String,
}

impl QueryEntity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// How a query entity was linked to a graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    LexicalOverlap,
    Fulltext,
    Vector,
}

/// A graph entity matched for a query entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEntity {
    pub entity_id: String,
    pub name: String,
    pub entity_type: String,
    pub score: f64,
    pub method: LinkMethod,
}

/// A graph entity returned by a relevance or vector search, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub aliases: Vec<String>,
    pub score: f64,
}
