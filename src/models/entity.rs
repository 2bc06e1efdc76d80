//! Entity model representing nodes in the knowledge graph.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// An entity in the knowledge graph.
///
/// The canonical `name` is set once at creation and never changes; later
/// surface forms that resolve to this entity accumulate in `aliases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (ULID). Never reused.
    pub id: String,
    /// Canonical display name.
    pub name: String,
    /// Entity type from the extraction taxonomy.
    pub entity_type: String,
    pub description: String,
    /// Whitespace-collapsed, lower-cased name for fast matching.
    pub normalized_name: String,
    /// Every surface name this entity has been mentioned as, including `name`.
    pub aliases: BTreeSet<String>,
    /// Name embedding (only under embedding-based matching).
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Entity {
    /// Creates a new entity with a generated ULID and current timestamp.
    pub fn new(name: String, entity_type: String, description: String) -> Self {
        let normalized_name = normalize_name(&name);
        let aliases = BTreeSet::from([name.clone()]);
        Self {
            id: generate_ulid(),
            name,
            entity_type,
            description,
            normalized_name,
            aliases,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches a name embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Collapses runs of whitespace and lower-cases.
pub fn normalize_name(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").to_lowercase()
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
