//! Relation repository: RELATED_TO edges between entities.

use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt, Row};
use crate::models::{EdgeHit, Relation};

/// Columns shared by every edge-returning statement. Expects `r`, `a`, `b`
/// and `similarity` in scope.
const EDGE_COLUMNS: &str = "elementId(r) AS edge_id,
       similarity,
       r.relation_text AS relation_text,
       r.start_date AS start_date,
       r.end_date AS end_date,
       r.source_id AS source_id,
       r.chunk_id AS chunk_id,
       a.id AS source_entity_id,
       b.id AS target_entity_id,
       a.name AS source_name,
       b.name AS target_name,
       a.type AS source_type,
       b.type AS target_type";

pub struct RelationRepository<'a, E: CypherExecutor + ?Sized> {
    graph: &'a E,
}

impl<'a, E: CypherExecutor + ?Sized> RelationRepository<'a, E> {
    pub fn new(graph: &'a E) -> Self {
        Self { graph }
    }

    /// Merge on (source, target, relation_text, source_id) and overwrite the
    /// date bounds and chunk. The embedding is kept when none is given.
    pub async fn merge(&self, relation: &Relation) -> Result<(), AppError> {
        self.graph
            .query(
                "MATCH (s:Entity {id: $source_entity_id})
                 MATCH (t:Entity {id: $target_entity_id})
                 MERGE (s)-[r:RELATED_TO {source_id: $source_id, relation_text: $relation_text}]->(t)
                 SET r.start_date = $start_date,
                     r.end_date = $end_date,
                     r.chunk_id = $chunk_id,
                     r.embedding = coalesce($embedding, r.embedding)",
            )
            .param("source_entity_id", &relation.source_entity_id)
            .param("target_entity_id", &relation.target_entity_id)
            .param("source_id", &relation.source_id)
            .param("relation_text", &relation.relation_text)
            .param("start_date", &relation.start_date)
            .param("end_date", &relation.end_date)
            .param("chunk_id", &relation.chunk_id)
            .param("embedding", &relation.embedding)
            .run()
            .await
    }

    /// Vector search over relation-text embeddings, best first.
    pub async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
    ) -> Result<Vec<EdgeHit>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let cypher = format!(
            "CALL db.index.vector.queryRelationships('relation_embedding', $k, $embedding)
             YIELD relationship, score
             WHERE score >= $min_score
             WITH relationship AS r, score AS similarity
             MATCH (a:Entity)-[r]->(b:Entity)
             RETURN {EDGE_COLUMNS}
             ORDER BY similarity DESC"
        );
        let rows = self
            .graph
            .query(&cypher)
            .param("k", k)
            .param("embedding", embedding)
            .param("min_score", min_score)
            .fetch_all()
            .await?;

        rows.iter().map(Self::row_to_edge_hit).collect()
    }

    /// Every RELATED_TO edge with an endpoint in `entity_ids`.
    pub async fn touching(&self, entity_ids: &[String]) -> Result<Vec<EdgeHit>, AppError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cypher = format!(
            "MATCH (a:Entity)-[r:RELATED_TO]->(b:Entity)
             WHERE a.id IN $entity_ids OR b.id IN $entity_ids
             WITH a, r, b, 0.0 AS similarity
             RETURN {EDGE_COLUMNS}"
        );
        let rows = self
            .graph
            .query(&cypher)
            .param("entity_ids", entity_ids)
            .fetch_all()
            .await?;

        rows.iter().map(Self::row_to_edge_hit).collect()
    }

    fn row_to_edge_hit(row: &Row) -> Result<EdgeHit, AppError> {
        Ok(EdgeHit {
            edge_id: row.get("edge_id")?,
            similarity: row.get("similarity")?,
            relation_text: row.get_opt("relation_text")?.unwrap_or_default(),
            start_date: row.get_opt("start_date")?,
            end_date: row.get_opt("end_date")?,
            source_id: row.get_opt("source_id")?,
            chunk_id: row.get_opt("chunk_id")?,
            source_entity_id: row.get("source_entity_id")?,
            target_entity_id: row.get("target_entity_id")?,
            source_name: row.get_opt("source_name")?.unwrap_or_default(),
            target_name: row.get_opt("target_name")?.unwrap_or_default(),
            source_type: row.get_opt("source_type")?.unwrap_or_default(),
            target_type: row.get_opt("target_type")?.unwrap_or_default(),
        })
    }
}
