//! Neo4j-backed graph store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::backends::neo4j::{Neo4jClient, Neo4jTransaction};
use crate::graph::{CypherExecutor, GraphClient, QueryExt, Transaction};
use crate::models::{ChunkHit, EdgeHit, ScoredEntity};
use crate::repositories::{
    ChunkRepository, EntityRepository, ProjectionRepository, RelationRepository, SchemaRepository,
};

use super::{
    GraphReader, GraphStore, GraphWriter, IndexDimensions, Mutation, PageRankParams, PageRanker,
    SchemaSummary, StoreTransaction, Subgraph,
};

/// A [`GraphStore`] over a Neo4j database with the GDS plugin.
#[derive(Clone)]
pub struct CypherStore {
    client: Neo4jClient,
}

impl CypherStore {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }

    /// Connects using the `[neo4j]` config section.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, AppError> {
        let password = config
            .password
            .as_deref()
            .ok_or(AppError::MissingConfig("neo4j.password"))?;
        let client = Neo4jClient::connect(&config.uri, &config.user, password).await?;
        debug!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self::new(client))
    }
}

/// An open Neo4j transaction seen as a store transaction.
pub struct CypherTransaction {
    txn: Neo4jTransaction,
}

async fn apply_mutation<E: CypherExecutor + ?Sized>(
    graph: &E,
    mutation: &Mutation,
) -> Result<(), AppError> {
    match mutation {
        Mutation::CreateChunk { chunk } => ChunkRepository::new(graph).create(chunk).await,
        Mutation::LinkSource {
            chunk_id,
            source_id,
        } => {
            ChunkRepository::new(graph)
                .link_source(chunk_id, source_id)
                .await
        }
        Mutation::CreateEntity { entity } => EntityRepository::new(graph).create(entity).await,
        Mutation::AddAlias { entity_id, alias } => {
            EntityRepository::new(graph).add_alias(entity_id, alias).await
        }
        Mutation::LinkMention {
            chunk_id,
            entity_id,
        } => {
            ChunkRepository::new(graph)
                .link_mention(chunk_id, entity_id)
                .await
        }
        Mutation::MergeRelation { relation } => RelationRepository::new(graph).merge(relation).await,
    }
}

macro_rules! impl_cypher_reader {
    ($ty:ty, $executor:ident) => {
        #[async_trait]
        impl GraphReader for $ty {
            async fn search_entities(
                &self,
                text: &str,
                entity_type: Option<&str>,
                limit: usize,
            ) -> Result<Vec<ScoredEntity>, AppError> {
                EntityRepository::new(&self.$executor)
                    .search(text, entity_type, limit)
                    .await
            }

            async fn nearest_entities(
                &self,
                embedding: &[f32],
                entity_type: Option<&str>,
                k: usize,
            ) -> Result<Vec<ScoredEntity>, AppError> {
                EntityRepository::new(&self.$executor)
                    .nearest(embedding, entity_type, k)
                    .await
            }

            async fn nearest_chunks(
                &self,
                embedding: &[f32],
                k: usize,
                min_score: f64,
            ) -> Result<Vec<ChunkHit>, AppError> {
                ChunkRepository::new(&self.$executor)
                    .nearest(embedding, k, min_score)
                    .await
            }

            async fn nearest_relations(
                &self,
                embedding: &[f32],
                k: usize,
                min_score: f64,
            ) -> Result<Vec<EdgeHit>, AppError> {
                RelationRepository::new(&self.$executor)
                    .nearest(embedding, k, min_score)
                    .await
            }

            async fn edges_touching(&self, entity_ids: &[String]) -> Result<Vec<EdgeHit>, AppError> {
                RelationRepository::new(&self.$executor)
                    .touching(entity_ids)
                    .await
            }
        }
    };
}

impl_cypher_reader!(CypherStore, client);
impl_cypher_reader!(CypherTransaction, txn);

#[async_trait]
impl GraphWriter for CypherTransaction {
    async fn apply(&self, mutation: &Mutation) -> Result<(), AppError> {
        apply_mutation(&self.txn, mutation).await
    }
}

#[async_trait]
impl StoreTransaction for CypherTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.txn.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.txn.rollback().await
    }
}

#[async_trait]
impl PageRanker for CypherStore {
    async fn page_rank(
        &self,
        subgraph: &Subgraph,
        params: &PageRankParams,
    ) -> Result<HashMap<String, f64>, AppError> {
        ProjectionRepository::new(&self.client)
            .page_rank(subgraph, params)
            .await
    }
}

#[async_trait]
impl GraphStore for CypherStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AppError> {
        let txn = self.client.begin().await?;
        Ok(Box::new(CypherTransaction { txn }))
    }

    async fn ensure_schema(&self, dimensions: IndexDimensions) -> Result<(), AppError> {
        SchemaRepository::new(&self.client).ensure(dimensions).await
    }

    /// Runs inside a transaction that is always rolled back.
    async fn read_query(&self, cypher: &str) -> Result<Vec<JsonValue>, AppError> {
        let txn = self.client.begin().await?;
        let result = txn.query(cypher).fetch_all().await;
        if let Err(e) = txn.rollback().await {
            warn!(error = %e, "Failed to roll back read-only query");
        }
        Ok(result?.into_iter().map(|row| row.into_json()).collect())
    }

    async fn introspect(&self) -> Result<SchemaSummary, AppError> {
        SchemaRepository::new(&self.client).summary().await
    }
}
