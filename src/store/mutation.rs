//! Explicit graph mutations and the unit of work that applies them.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{Chunk, Entity, Relation};

use super::{GraphStore, StoreTransaction};

/// A single write against the graph.
///
/// Every write the ingestion pipeline performs is one of these, so a chunk's
/// whole change set can be logged, inspected or replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Create a chunk node.
    CreateChunk { chunk: Chunk },
    /// Merge the source node and link the chunk to it.
    LinkSource { chunk_id: String, source_id: String },
    /// Create an entity node.
    CreateEntity { entity: Entity },
    /// Add a surface name to an existing entity's aliases.
    AddAlias { entity_id: String, alias: String },
    /// Merge a MENTIONS edge from a chunk to an entity.
    LinkMention { chunk_id: String, entity_id: String },
    /// Merge a RELATED_TO edge on its natural key, overwriting its dates.
    MergeRelation { relation: Relation },
}

impl Mutation {
    /// Short operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Mutation::CreateChunk { .. } => "create_chunk",
            Mutation::LinkSource { .. } => "link_source",
            Mutation::CreateEntity { .. } => "create_entity",
            Mutation::AddAlias { .. } => "add_alias",
            Mutation::LinkMention { .. } => "link_mention",
            Mutation::MergeRelation { .. } => "merge_relation",
        }
    }
}

/// Applies mutations inside one store transaction and records them.
///
/// Mutations are applied as they are pushed, so reads through
/// [`reader`](UnitOfWork::reader) observe earlier writes of the same unit.
pub struct UnitOfWork<'a> {
    tx: Box<dyn StoreTransaction + 'a>,
    log: Vec<Mutation>,
}

impl<'a> UnitOfWork<'a> {
    pub async fn begin<S: GraphStore + ?Sized>(store: &'a S) -> Result<Self, AppError> {
        Ok(Self {
            tx: store.begin().await?,
            log: Vec::new(),
        })
    }

    /// Read access to the transaction, including uncommitted writes.
    pub fn reader(&self) -> &(dyn StoreTransaction + 'a) {
        self.tx.as_ref()
    }

    pub async fn push(&mut self, mutation: Mutation) -> Result<(), AppError> {
        self.tx.apply(&mutation).await?;
        self.log.push(mutation);
        Ok(())
    }

    pub fn log(&self) -> &[Mutation] {
        &self.log
    }

    /// Commits and returns the applied mutations.
    pub async fn commit(self) -> Result<Vec<Mutation>, AppError> {
        self.tx.commit().await?;
        debug!(mutations = self.log.len(), "Committed unit of work");
        Ok(self.log)
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        debug!(mutations = self.log.len(), "Rolling back unit of work");
        self.tx.rollback().await
    }

    /// Applies `mutations` atomically: all are committed or none are.
    pub async fn execute<S: GraphStore + ?Sized>(
        store: &'a S,
        mutations: Vec<Mutation>,
    ) -> Result<Vec<Mutation>, AppError> {
        let mut unit = Self::begin(store).await?;
        for mutation in mutations {
            if let Err(e) = unit.push(mutation).await {
                if let Err(rollback) = unit.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(e);
            }
        }
        unit.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_serializes_with_op_tag() {
        let mutation = Mutation::AddAlias {
            entity_id: "e1".to_string(),
            alias: "EOG Resources".to_string(),
        };
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["op"], "add_alias");
        assert_eq!(json["alias"], "EOG Resources");
        assert_eq!(mutation.op(), "add_alias");

        let back: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(back, mutation);
    }

    #[test]
    fn test_chunk_embedding_is_not_logged() {
        let chunk = Chunk::new("text".to_string(), vec![0.5; 8], None);
        let json = serde_json::to_value(Mutation::CreateChunk { chunk }).unwrap();
        assert!(json["chunk"].get("embedding").is_none());
    }
}
