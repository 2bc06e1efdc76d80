//! Domain models for the temporal knowledge graph.

mod chunk;
mod entity;
mod extraction;
mod query;
mod relation;
mod temporal;

pub use chunk::Chunk;
pub use entity::{generate_ulid, normalize_name, Entity};
pub use extraction::{ExtractedEntity, ExtractedRelation, Extraction};
pub use query::{LinkMethod, LinkedEntity, QueryEntity, ScoredEntity};
pub use relation::{ChunkHit, EdgeHit, Relation, ScoredEdge};
pub use temporal::TimestampRange;
