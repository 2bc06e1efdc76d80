//! Entity repository: Entity nodes, their aliases and entity searches.

use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt, Row};
use crate::models::{Entity, ScoredEntity};
use crate::resolution::escape_lucene;

/// Statements over `Entity` nodes.
pub struct EntityRepository<'a, E: CypherExecutor + ?Sized> {
    graph: &'a E,
}

impl<'a, E: CypherExecutor + ?Sized> EntityRepository<'a, E> {
    pub fn new(graph: &'a E) -> Self {
        Self { graph }
    }

    /// Create a new entity node.
    pub async fn create(&self, entity: &Entity) -> Result<(), AppError> {
        self.graph
            .query(
                "CREATE (e:Entity {
                    id: $id,
                    name: $name,
                    type: $entity_type,
                    description: $description,
                    normalized_name: $normalized_name,
                    aliases: $aliases,
                    embedding: $embedding,
                    created_at: $created_at
                })",
            )
            .param("id", &entity.id)
            .param("name", &entity.name)
            .param("entity_type", &entity.entity_type)
            .param("description", &entity.description)
            .param("normalized_name", &entity.normalized_name)
            .param("aliases", &entity.aliases)
            .param("embedding", &entity.embedding)
            .param("created_at", entity.created_at.to_rfc3339())
            .run()
            .await
    }

    /// Append an alias unless the entity already has it.
    pub async fn add_alias(&self, id: &str, alias: &str) -> Result<(), AppError> {
        let row = self
            .graph
            .query(
                "MATCH (e:Entity {id: $id})
                 SET e.aliases = CASE
                     WHEN $alias IN coalesce(e.aliases, []) THEN e.aliases
                     ELSE coalesce(e.aliases, []) + $alias
                 END
                 RETURN e.id AS id",
            )
            .param("id", id)
            .param("alias", alias)
            .fetch_one()
            .await?;

        match row {
            Some(_) => Ok(()),
            None => Err(AppError::EntityNotFound(id.to_string())),
        }
    }

    /// Full-text search over names and aliases, best first.
    pub async fn search(
        &self,
        text: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, AppError> {
        let query_text = escape_lucene(text.trim());
        if query_text.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .graph
            .query(
                "CALL db.index.fulltext.queryNodes('entity_name_aliases', $query_text)
                 YIELD node, score
                 WHERE $entity_type IS NULL OR node.type = $entity_type
                 RETURN node.id AS id, node.name AS name, node.type AS entity_type,
                        coalesce(node.aliases, []) AS aliases, score
                 ORDER BY score DESC
                 LIMIT $limit",
            )
            .param("query_text", query_text)
            .param("entity_type", entity_type)
            .param("limit", limit)
            .fetch_all()
            .await?;

        rows.iter().map(Self::row_to_scored_entity).collect()
    }

    /// Vector search over entity name embeddings, best first.
    pub async fn nearest(
        &self,
        embedding: &[f32],
        entity_type: Option<&str>,
        k: usize,
    ) -> Result<Vec<ScoredEntity>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .graph
            .query(
                "CALL db.index.vector.queryNodes('entity_embedding', $k, $embedding)
                 YIELD node, score
                 WHERE $entity_type IS NULL OR node.type = $entity_type
                 RETURN node.id AS id, node.name AS name, node.type AS entity_type,
                        coalesce(node.aliases, []) AS aliases, score
                 ORDER BY score DESC",
            )
            .param("k", k)
            .param("embedding", embedding)
            .param("entity_type", entity_type)
            .fetch_all()
            .await?;

        rows.iter().map(Self::row_to_scored_entity).collect()
    }

    fn row_to_scored_entity(row: &Row) -> Result<ScoredEntity, AppError> {
        Ok(ScoredEntity {
            id: row.get("id")?,
            name: row.get("name")?,
            entity_type: row.get_opt("entity_type")?.unwrap_or_default(),
            aliases: row.get_opt("aliases")?.unwrap_or_default(),
            score: row.get("score")?,
        })
    }
}
