//! Chunk repository: Chunk and Source nodes, MENTIONS and FROM_SOURCE edges.

use crate::cypher;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{Chunk, ChunkHit};

pub struct ChunkRepository<'a, E: CypherExecutor + ?Sized> {
    graph: &'a E,
}

impl<'a, E: CypherExecutor + ?Sized> ChunkRepository<'a, E> {
    pub fn new(graph: &'a E) -> Self {
        Self { graph }
    }

    pub async fn create(&self, chunk: &Chunk) -> Result<(), AppError> {
        self.graph
            .query(
                "CREATE (c:Chunk {
                    id: $id,
                    text: $text,
                    embedding: $embedding,
                    created_at: $created_at
                })",
            )
            .param("id", &chunk.id)
            .param("text", &chunk.text)
            .param("embedding", &chunk.embedding)
            .param("created_at", chunk.created_at.to_rfc3339())
            .run()
            .await
    }

    /// Merge the source node and link the chunk to it.
    pub async fn link_source(&self, chunk_id: &str, source_id: &str) -> Result<(), AppError> {
        cypher!(
            self.graph,
            "MERGE (s:Source {id: $source_id})
             WITH s
             MATCH (c:Chunk {id: $chunk_id})
             MERGE (c)-[:FROM_SOURCE]->(s)",
            source_id = source_id,
            chunk_id = chunk_id,
        )
        .run()
        .await
    }

    pub async fn link_mention(&self, chunk_id: &str, entity_id: &str) -> Result<(), AppError> {
        cypher!(
            self.graph,
            "MATCH (c:Chunk {id: $chunk_id})
             MATCH (e:Entity {id: $entity_id})
             MERGE (c)-[:MENTIONS]->(e)",
            chunk_id = chunk_id,
            entity_id = entity_id,
        )
        .run()
        .await
    }

    /// Vector search over chunk embeddings, best first.
    pub async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
    ) -> Result<Vec<ChunkHit>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .graph
            .query(
                "CALL db.index.vector.queryNodes('chunk_embedding', $k, $embedding)
                 YIELD node, score
                 WHERE score >= $min_score
                 RETURN node.id AS chunk_id, node.text AS text, score
                 ORDER BY score DESC",
            )
            .param("k", k)
            .param("embedding", embedding)
            .param("min_score", min_score)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<ChunkHit, AppError> {
                Ok(ChunkHit {
                    chunk_id: row.get("chunk_id")?,
                    text: row.get_opt("text")?.unwrap_or_default(),
                    score: row.get("score")?,
                })
            })
            .collect()
    }
}
