//! Graph-store capabilities required by resolution, ingestion and retrieval.
//!
//! - [`GraphReader`] - relevance and nearest-neighbour search, edge expansion
//! - [`GraphWriter`] - applies [`Mutation`]s
//! - [`StoreTransaction`] - an atomic unit of reads and writes
//! - [`PageRanker`] - personalized PageRank over an ephemeral subgraph
//! - [`GraphStore`] - the whole store, able to begin transactions
//!
//! Consumers take `R: GraphReader + ?Sized` so a `dyn GraphStore` and a
//! `dyn StoreTransaction` are both accepted.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::{ChunkHit, EdgeHit, ScoredEntity};

use super::Mutation;

#[async_trait]
pub trait GraphReader: Send + Sync {
    /// Relevance-ranked search over entity names and aliases, best first.
    ///
    /// `entity_type` restricts results to that type when given.
    async fn search_entities(
        &self,
        text: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, AppError>;

    /// Nearest entities by name embedding, best first.
    async fn nearest_entities(
        &self,
        embedding: &[f32],
        entity_type: Option<&str>,
        k: usize,
    ) -> Result<Vec<ScoredEntity>, AppError>;

    /// Nearest chunks by embedding with similarity at least `min_score`.
    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
    ) -> Result<Vec<ChunkHit>, AppError>;

    /// Nearest relations by relation-text embedding with similarity at least
    /// `min_score`.
    async fn nearest_relations(
        &self,
        embedding: &[f32],
        k: usize,
        min_score: f64,
    ) -> Result<Vec<EdgeHit>, AppError>;

    /// Every relation with either endpoint in `entity_ids`, with similarity 0.
    async fn edges_touching(&self, entity_ids: &[String]) -> Result<Vec<EdgeHit>, AppError>;
}

#[async_trait]
pub trait GraphWriter: GraphReader {
    async fn apply(&self, mutation: &Mutation) -> Result<(), AppError>;
}

/// Reads see the transaction's own uncommitted writes.
#[async_trait]
pub trait StoreTransaction: GraphWriter {
    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Edge of a [`Subgraph`], identified by the store's edge id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgraphEdge {
    pub edge_id: String,
    pub source: String,
    pub target: String,
}

/// An induced subgraph over entity ids, with the walk's seed nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<String>,
    pub edges: Vec<SubgraphEdge>,
    pub seeds: Vec<String>,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty() || self.seeds.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRankParams {
    pub damping: f64,
    pub max_iterations: usize,
}

#[async_trait]
pub trait PageRanker: Send + Sync {
    /// Personalized PageRank restricted to `subgraph`, keyed by entity id.
    ///
    /// Any scratch projection the backend creates is released before this
    /// returns, on success and on error.
    async fn page_rank(
        &self,
        subgraph: &Subgraph,
        params: &PageRankParams,
    ) -> Result<HashMap<String, f64>, AppError>;
}

/// Labels, relationship types and property keys present in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub property_keys: Vec<String>,
}

/// Vector sizes used when creating the vector indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDimensions {
    pub text: usize,
    pub entity: usize,
}

#[async_trait]
pub trait GraphStore: GraphReader + PageRanker {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AppError>;

    /// Creates constraints and indexes if they don't exist.
    async fn ensure_schema(&self, dimensions: IndexDimensions) -> Result<(), AppError>;

    /// Runs an arbitrary Cypher statement without persisting any writes.
    async fn read_query(&self, cypher: &str) -> Result<Vec<JsonValue>, AppError>;

    async fn introspect(&self) -> Result<SchemaSummary, AppError>;
}
