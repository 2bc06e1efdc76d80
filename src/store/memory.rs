//! In-process graph store.
//!
//! Holds the whole graph in memory behind an async lock. Transactions work
//! on a private copy of the state and swap it in on commit, so a rolled-back
//! transaction leaves no trace. Writers are serialized; readers never block
//! on an open transaction.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::error::AppError;
use crate::models::{generate_ulid, Chunk, ChunkHit, EdgeHit, Entity, Relation, ScoredEntity};
use crate::resolution::tokens;
use crate::retrieval::personalized_page_rank;

use super::{
    GraphReader, GraphStore, GraphWriter, IndexDimensions, Mutation, PageRankParams, PageRanker,
    SchemaSummary, StoreTransaction, Subgraph,
};

#[derive(Debug, Clone)]
struct StoredRelation {
    id: String,
    relation: Relation,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    entities: BTreeMap<String, Entity>,
    chunks: BTreeMap<String, Chunk>,
    sources: BTreeSet<String>,
    /// (chunk_id, source_id)
    chunk_sources: BTreeSet<(String, String)>,
    /// (chunk_id, entity_id)
    mentions: BTreeSet<(String, String)>,
    relations: Vec<StoredRelation>,
}

/// A [`GraphStore`] that lives entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<GraphState>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entity(&self, id: &str) -> Option<Entity> {
        self.state.read().await.entities.get(id).cloned()
    }

    pub async fn entity_count(&self) -> usize {
        self.state.read().await.entities.len()
    }

    pub async fn chunk(&self, id: &str) -> Option<Chunk> {
        self.state.read().await.chunks.get(id).cloned()
    }

    pub async fn chunk_count(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    /// Stored relations in insertion order.
    pub async fn relations(&self) -> Vec<Relation> {
        self.state
            .read()
            .await
            .relations
            .iter()
            .map(|stored| stored.relation.clone())
            .collect()
    }

    /// Entity ids mentioned by a chunk.
    pub async fn mentions(&self, chunk_id: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .mentions
            .iter()
            .filter(|(chunk, _)| chunk == chunk_id)
            .map(|(_, entity)| entity.clone())
            .collect()
    }

    /// Source a chunk was linked to, if any.
    pub async fn chunk_source(&self, chunk_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .chunk_sources
            .iter()
            .find(|(chunk, _)| chunk == chunk_id)
            .map(|(_, source)| source.clone())
    }
}

/// Open transaction over a private copy of the graph.
pub struct MemoryTransaction {
    shared: Arc<RwLock<GraphState>>,
    working: RwLock<GraphState>,
    _writer: OwnedMutexGuard<()>,
}

impl GraphState {
    fn apply(&mut self, mutation: &Mutation) -> Result<(), AppError> {
        match mutation {
            Mutation::CreateChunk { chunk } => {
                self.chunks.insert(chunk.id.clone(), chunk.clone());
            }
            Mutation::LinkSource {
                chunk_id,
                source_id,
            } => {
                if self.chunks.contains_key(chunk_id) {
                    self.sources.insert(source_id.clone());
                    self.chunk_sources
                        .insert((chunk_id.clone(), source_id.clone()));
                }
            }
            Mutation::CreateEntity { entity } => {
                self.entities.insert(entity.id.clone(), entity.clone());
            }
            Mutation::AddAlias { entity_id, alias } => {
                let entity = self
                    .entities
                    .get_mut(entity_id)
                    .ok_or_else(|| AppError::EntityNotFound(entity_id.clone()))?;
                entity.aliases.insert(alias.clone());
            }
            Mutation::LinkMention {
                chunk_id,
                entity_id,
            } => {
                if self.chunks.contains_key(chunk_id) && self.entities.contains_key(entity_id) {
                    self.mentions.insert((chunk_id.clone(), entity_id.clone()));
                }
            }
            Mutation::MergeRelation { relation } => {
                if !self.entities.contains_key(&relation.source_entity_id)
                    || !self.entities.contains_key(&relation.target_entity_id)
                {
                    return Ok(());
                }
                match self
                    .relations
                    .iter_mut()
                    .find(|stored| stored.relation.same_key(relation))
                {
                    Some(stored) => {
                        let existing = &mut stored.relation;
                        existing.start_date = relation.start_date.clone();
                        existing.end_date = relation.end_date.clone();
                        existing.chunk_id = relation.chunk_id.clone();
                        if relation.embedding.is_some() {
                            existing.embedding = relation.embedding.clone();
                        }
                    }
                    None => self.relations.push(StoredRelation {
                        id: generate_ulid(),
                        relation: relation.clone(),
                    }),
                }
            }
        }
        Ok(())
    }

    /// Scores an entity by the best fraction of query tokens any of its
    /// names contains.
    fn search_entities(&self, text: &str, entity_type: Option<&str>, limit: usize) -> Vec<ScoredEntity> {
        let query = tokens(text);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits: Vec<ScoredEntity> = self
            .entities
            .values()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .filter_map(|entity| {
                let score = std::iter::once(&entity.name)
                    .chain(entity.aliases.iter())
                    .map(|name| {
                        let covered = tokens(name).intersection(&query).count();
                        covered as f64 / query.len() as f64
                    })
                    .fold(0.0, f64::max);
                (score > 0.0).then(|| scored_entity(entity, score))
            })
            .collect();

        sort_by_score(&mut hits, |hit| hit.score);
        hits.truncate(limit);
        hits
    }

    fn nearest_entities(&self, embedding: &[f32], entity_type: Option<&str>, k: usize) -> Vec<ScoredEntity> {
        let mut hits: Vec<ScoredEntity> = self
            .entities
            .values()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .filter_map(|entity| {
                let stored = entity.embedding.as_deref()?;
                Some(scored_entity(entity, cosine(embedding, stored)))
            })
            .collect();

        sort_by_score(&mut hits, |hit| hit.score);
        hits.truncate(k);
        hits
    }

    fn nearest_chunks(&self, embedding: &[f32], k: usize, min_score: f64) -> Vec<ChunkHit> {
        let mut hits: Vec<ChunkHit> = self
            .chunks
            .values()
            .filter(|chunk| !chunk.embedding.is_empty())
            .map(|chunk| ChunkHit {
                chunk_id: chunk.id.clone(),
                text: chunk.text.clone(),
                score: cosine(embedding, &chunk.embedding),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        sort_by_score(&mut hits, |hit| hit.score);
        hits.truncate(k);
        hits
    }

    fn nearest_relations(&self, embedding: &[f32], k: usize, min_score: f64) -> Vec<EdgeHit> {
        let mut hits: Vec<EdgeHit> = self
            .relations
            .iter()
            .filter_map(|stored| {
                let similarity = cosine(embedding, stored.relation.embedding.as_deref()?);
                (similarity >= min_score).then(|| self.edge_hit(stored, similarity))
            })
            .collect();

        sort_by_score(&mut hits, |hit| hit.similarity);
        hits.truncate(k);
        hits
    }

    fn edges_touching(&self, entity_ids: &[String]) -> Vec<EdgeHit> {
        let ids: BTreeSet<&str> = entity_ids.iter().map(String::as_str).collect();
        self.relations
            .iter()
            .filter(|stored| {
                ids.contains(stored.relation.source_entity_id.as_str())
                    || ids.contains(stored.relation.target_entity_id.as_str())
            })
            .map(|stored| self.edge_hit(stored, 0.0))
            .collect()
    }

    fn edge_hit(&self, stored: &StoredRelation, similarity: f64) -> EdgeHit {
        let relation = &stored.relation;
        let source = self.entities.get(&relation.source_entity_id);
        let target = self.entities.get(&relation.target_entity_id);
        EdgeHit {
            edge_id: stored.id.clone(),
            similarity,
            relation_text: relation.relation_text.clone(),
            start_date: relation.start_date.clone(),
            end_date: relation.end_date.clone(),
            source_id: Some(relation.source_id.clone()),
            chunk_id: Some(relation.chunk_id.clone()),
            source_entity_id: relation.source_entity_id.clone(),
            target_entity_id: relation.target_entity_id.clone(),
            source_name: source.map(|e| e.name.clone()).unwrap_or_default(),
            target_name: target.map(|e| e.name.clone()).unwrap_or_default(),
            source_type: source.map(|e| e.entity_type.clone()).unwrap_or_default(),
            target_type: target.map(|e| e.entity_type.clone()).unwrap_or_default(),
        }
    }

    fn summary(&self) -> SchemaSummary {
        let mut labels = Vec::new();
        for (label, present) in [
            ("Chunk", !self.chunks.is_empty()),
            ("Entity", !self.entities.is_empty()),
            ("Source", !self.sources.is_empty()),
        ] {
            if present {
                labels.push(label.to_string());
            }
        }

        let mut relationship_types = Vec::new();
        for (rel_type, present) in [
            ("FROM_SOURCE", !self.chunk_sources.is_empty()),
            ("MENTIONS", !self.mentions.is_empty()),
            ("RELATED_TO", !self.relations.is_empty()),
        ] {
            if present {
                relationship_types.push(rel_type.to_string());
            }
        }

        let property_keys = [
            "aliases",
            "chunk_id",
            "created_at",
            "description",
            "embedding",
            "end_date",
            "id",
            "name",
            "normalized_name",
            "relation_text",
            "source_id",
            "start_date",
            "text",
            "type",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        SchemaSummary {
            labels,
            relationship_types,
            property_keys,
        }
    }
}

fn scored_entity(entity: &Entity, score: f64) -> ScoredEntity {
    ScoredEntity {
        id: entity.id.clone(),
        name: entity.name.clone(),
        entity_type: entity.entity_type.clone(),
        aliases: entity.aliases.iter().cloned().collect(),
        score,
    }
}

/// Stable descending sort; NaN sorts as equal.
fn sort_by_score<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

macro_rules! impl_reader {
    ($ty:ty, $state:ident) => {
        #[async_trait]
        impl GraphReader for $ty {
            async fn search_entities(
                &self,
                text: &str,
                entity_type: Option<&str>,
                limit: usize,
            ) -> Result<Vec<ScoredEntity>, AppError> {
                Ok(self.$state.read().await.search_entities(text, entity_type, limit))
            }

            async fn nearest_entities(
                &self,
                embedding: &[f32],
                entity_type: Option<&str>,
                k: usize,
            ) -> Result<Vec<ScoredEntity>, AppError> {
                Ok(self.$state.read().await.nearest_entities(embedding, entity_type, k))
            }

            async fn nearest_chunks(
                &self,
                embedding: &[f32],
                k: usize,
                min_score: f64,
            ) -> Result<Vec<ChunkHit>, AppError> {
                Ok(self.$state.read().await.nearest_chunks(embedding, k, min_score))
            }

            async fn nearest_relations(
                &self,
                embedding: &[f32],
                k: usize,
                min_score: f64,
            ) -> Result<Vec<EdgeHit>, AppError> {
                Ok(self.$state.read().await.nearest_relations(embedding, k, min_score))
            }

            async fn edges_touching(&self, entity_ids: &[String]) -> Result<Vec<EdgeHit>, AppError> {
                Ok(self.$state.read().await.edges_touching(entity_ids))
            }
        }
    };
}

impl_reader!(MemoryStore, state);
impl_reader!(MemoryTransaction, working);

#[async_trait]
impl GraphWriter for MemoryTransaction {
    async fn apply(&self, mutation: &Mutation) -> Result<(), AppError> {
        self.working.write().await.apply(mutation)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction {
            shared, working, ..
        } = *self;
        *shared.write().await = working.into_inner();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl PageRanker for MemoryStore {
    async fn page_rank(
        &self,
        subgraph: &Subgraph,
        params: &PageRankParams,
    ) -> Result<HashMap<String, f64>, AppError> {
        Ok(personalized_page_rank(subgraph, params))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AppError> {
        let writer = self.writer.clone().lock_owned().await;
        let snapshot = self.state.read().await.clone();
        Ok(Box::new(MemoryTransaction {
            shared: self.state.clone(),
            working: RwLock::new(snapshot),
            _writer: writer,
        }))
    }

    async fn ensure_schema(&self, dimensions: IndexDimensions) -> Result<(), AppError> {
        debug!(?dimensions, "In-memory store needs no schema");
        Ok(())
    }

    async fn read_query(&self, _cypher: &str) -> Result<Vec<JsonValue>, AppError> {
        Err(AppError::Validation(
            "Cypher queries are not supported by the in-memory store".to_string(),
        ))
    }

    async fn introspect(&self) -> Result<SchemaSummary, AppError> {
        Ok(self.state.read().await.summary())
    }
}
