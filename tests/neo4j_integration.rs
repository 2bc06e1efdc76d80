//! Integration tests for the Neo4j store.
//!
//! These tests require a running Neo4j 5 instance with the GDS plugin.
//! Run with: `cargo test --features integration --test neo4j_integration`

#![cfg(feature = "integration")]

use tkgraph::config::Neo4jConfig;
use tkgraph::graph::backends::neo4j::Neo4jClient;
use tkgraph::graph::{GraphClient, QueryExt, Transaction};
use tkgraph::models::{Chunk, Entity, Relation};
use tkgraph::retrieval::{induced_subgraph, score_edges};
use tkgraph::store::{
    CypherStore, GraphReader, GraphStore, IndexDimensions, Mutation, PageRankParams, UnitOfWork,
};
use serial_test::serial;

const TEST_TYPE: &str = "integration_test";

fn neo4j_config() -> Neo4jConfig {
    Neo4jConfig {
        uri: std::env::var("TKGRAPH_TEST_NEO4J_URI")
            .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
        user: "neo4j".to_string(),
        password: Some(
            std::env::var("TKGRAPH_TEST_NEO4J_PASSWORD").unwrap_or_else(|_| "password".to_string()),
        ),
    }
}

async fn create_store() -> CypherStore {
    let store = CypherStore::connect(&neo4j_config())
        .await
        .expect("Failed to connect to test database");
    store
        .ensure_schema(IndexDimensions { text: 3, entity: 3 })
        .await
        .expect("Failed to create schema");
    store
}

async fn create_client() -> Neo4jClient {
    let config = neo4j_config();
    Neo4jClient::connect(&config.uri, &config.user, config.password.as_deref().unwrap_or(""))
        .await
        .expect("Failed to connect to test database")
}

/// Clean up test data before/after tests
async fn cleanup(client: &Neo4jClient) {
    let _ = client
        .query(
            "MATCH (n) WHERE n.type = $type OR n.text STARTS WITH 'integration:'
             DETACH DELETE n",
        )
        .param("type", TEST_TYPE)
        .run()
        .await;
}

fn entity(name: &str) -> Entity {
    Entity::new(name.to_string(), TEST_TYPE.to_string(), String::new())
}

fn relation(source: &Entity, target: &Entity, chunk: &Chunk, date: &str) -> Relation {
    Relation {
        source_entity_id: source.id.clone(),
        target_entity_id: target.id.clone(),
        relation_text: format!("{} acquired {}", source.name, target.name),
        start_date: Some(date.to_string()),
        end_date: Some(date.to_string()),
        source_id: chunk.id.clone(),
        chunk_id: chunk.id.clone(),
        embedding: Some(vec![1.0, 0.0, 0.0]),
    }
}

#[serial]
mod database_tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_rollback() {
        let client = create_client().await;
        cleanup(&client).await;

        let txn = client.begin().await.expect("Failed to begin");
        txn.query("CREATE (e:Entity {id: 'rollback-1', type: $type})")
            .param("type", TEST_TYPE)
            .run()
            .await
            .expect("Failed to create");
        txn.rollback().await.expect("Failed to roll back");

        let rows = client
            .query("MATCH (e:Entity {id: 'rollback-1'}) RETURN e.id AS id")
            .fetch_all()
            .await
            .expect("Query failed");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unit_of_work_and_reads() {
        let client = create_client().await;
        cleanup(&client).await;
        let store = create_store().await;

        let chunk = Chunk::new("integration: Acme acquired Beta".to_string(), vec![0.0, 1.0, 0.0], None);
        let acme = entity("Acme Integration Corp");
        let beta = entity("Beta Integration LLC");
        UnitOfWork::execute(
            &store,
            vec![
                Mutation::CreateChunk { chunk: chunk.clone() },
                Mutation::CreateEntity { entity: acme.clone() },
                Mutation::CreateEntity { entity: beta.clone() },
                Mutation::AddAlias {
                    entity_id: acme.id.clone(),
                    alias: "Acme Integration".to_string(),
                },
                Mutation::LinkMention {
                    chunk_id: chunk.id.clone(),
                    entity_id: acme.id.clone(),
                },
                Mutation::MergeRelation {
                    relation: relation(&acme, &beta, &chunk, "2021-01-15"),
                },
                Mutation::MergeRelation {
                    relation: relation(&acme, &beta, &chunk, "2021-02-01"),
                },
            ],
        )
        .await
        .expect("Unit of work failed");

        client
            .query("CALL db.awaitIndexes(60)")
            .run()
            .await
            .expect("Indexes not ready");

        let hits = store
            .search_entities("Acme Integration", Some(TEST_TYPE), 5)
            .await
            .expect("Search failed");
        assert_eq!(hits[0].id, acme.id);
        assert!(hits[0].aliases.contains(&"Acme Integration".to_string()));

        let edges = store
            .edges_touching(&[beta.id.clone()])
            .await
            .expect("Expansion failed");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].start_date.as_deref(), Some("2021-02-01"));

        let chunks = store
            .nearest_chunks(&[0.0, 1.0, 0.0], 5, 0.9)
            .await
            .expect("Chunk search failed");
        assert!(chunks.iter().any(|c| c.chunk_id == chunk.id));

        let scored = score_edges(
            &store,
            edges.clone(),
            &PageRankParams {
                damping: 0.85,
                max_iterations: 20,
            },
            50,
        )
        .await
        .expect("PageRank failed");
        assert_eq!(scored.len(), 1);
        assert!(scored[0].edge_score > 0.0);
        assert_eq!(induced_subgraph(&edges).nodes.len(), 2);

        let leftover = client
            .query("CALL gds.graph.list() YIELD graphName WHERE graphName STARTS WITH 'ppr_' RETURN graphName")
            .fetch_all()
            .await
            .expect("List failed");
        assert!(leftover.is_empty());

        cleanup(&client).await;
    }

    #[tokio::test]
    async fn test_read_query_never_persists() {
        let client = create_client().await;
        cleanup(&client).await;
        let store = create_store().await;

        let rows = store
            .read_query("CREATE (e:Entity {id: 'agent-write', type: 'integration_test'}) RETURN e.id AS id")
            .await
            .expect("Query failed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "agent-write");

        let persisted = client
            .query("MATCH (e:Entity {id: 'agent-write'}) RETURN e.id AS id")
            .fetch_all()
            .await
            .expect("Query failed");
        assert!(persisted.is_empty());

        assert!(store.read_query("NOT CYPHER").await.is_err());
    }
}
