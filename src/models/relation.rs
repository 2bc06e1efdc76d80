//! Relation model: a temporal RELATED_TO edge between two entities.

use serde::{Deserialize, Serialize};

use super::TimestampRange;

/// A relation between two entities.
///
/// The natural key is `(source_entity_id, target_entity_id, relation_text,
/// source_id)`. Re-asserting a relation with the same key overwrites its
/// dates, chunk and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relation_text: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Provenance: document source id, or the chunk id when there is none.
    pub source_id: String,
    /// Chunk the relation was extracted from.
    pub chunk_id: String,
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl Relation {
    /// The stored validity interval.
    pub fn range(&self) -> TimestampRange {
        TimestampRange::new(self.start_date.clone(), self.end_date.clone())
    }

    /// Whether two relations share the merge key.
    pub fn same_key(&self, other: &Relation) -> bool {
        self.source_entity_id == other.source_entity_id
            && self.target_entity_id == other.target_entity_id
            && self.relation_text == other.relation_text
            && self.source_id == other.source_id
    }
}

/// A relation as returned by a search channel, with endpoint details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeHit {
    /// Store-assigned edge identity.
    pub edge_id: String,
    /// Channel similarity; 0.0 for edges found by entity expansion.
    pub similarity: f64,
    pub relation_text: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub source_id: Option<String>,
    pub chunk_id: Option<String>,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub source_name: String,
    pub target_name: String,
    pub source_type: String,
    pub target_type: String,
}

impl EdgeHit {
    pub fn range(&self) -> TimestampRange {
        TimestampRange::new(self.start_date.clone(), self.end_date.clone())
    }
}

/// An edge that survived temporal filtering, with its importance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEdge {
    #[serde(flatten)]
    pub hit: EdgeHit,
    /// Sum of both endpoints' personalized PageRank values.
    pub edge_score: f64,
}

/// A chunk returned by the chunk-vector channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub text: String,
    pub score: f64,
}
