//! Chunk model: an immutable text segment of an ingested document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_ulid;

/// A stored text chunk with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (ULID).
    pub id: String,
    pub text: String,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
    /// Document source this chunk was cut from, if any.
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(text: String, embedding: Vec<f32>, source_id: Option<String>) -> Self {
        Self {
            id: generate_ulid(),
            text,
            embedding,
            source_id,
            created_at: Utc::now(),
        }
    }
}
