//! End-to-end ingestion and retrieval over the in-memory store.

use std::sync::Arc;

use tkgraph::config::Config;
use tkgraph::context::Context;
use tkgraph::llm::testing::{HashEmbedder, ScriptedModel, StaticAnalyzer, StaticExtractor};
use tkgraph::llm::Embedders;
use tkgraph::models::{ExtractedEntity, ExtractedRelation, Extraction, QueryEntity};
use tkgraph::retrieval::FusedItem;
use tkgraph::services::{AnswerService, IngestReport, IngestService, RetrievalService};
use tkgraph::store::MemoryStore;
use tkgraph::FromRef;

const DOCUMENT: &str = "On 2021-01-15, Acme Corp acquired Beta LLC.";

fn acquisition() -> Extraction {
    Extraction {
        entities: vec![
            ExtractedEntity::new("2021-01-15", "timestamp", "acquisition date"),
            ExtractedEntity::new("Acme Corp", "company", "the acquirer"),
            ExtractedEntity::new("Beta LLC", "company", "the acquired company"),
        ],
        relations: vec![ExtractedRelation {
            timestamp_name: "2021-01-15".to_string(),
            source_name: "Acme Corp".to_string(),
            target_name: "Beta LLC".to_string(),
            description: "Acme Corp acquired Beta LLC".to_string(),
        }],
    }
}

fn context(store: &MemoryStore, question: Vec<QueryEntity>, replies: &[&str]) -> Context {
    let mut config = Config::default();
    // Hash embeddings of short texts rarely clear the production floor.
    config.retrieval.chunk_min_score = 0.0;

    Context::new(
        Arc::new(store.clone()),
        Embedders {
            text: Arc::new(HashEmbedder::new(64)),
            entity: None,
        },
        Arc::new(ScriptedModel::new(replies.iter().copied())),
        Arc::new(StaticExtractor::new(acquisition())),
        Arc::new(StaticAnalyzer::new(question)),
        config,
    )
}

#[tokio::test]
async fn test_ingest_single_acquisition() {
    let store = MemoryStore::new();
    let ctx = context(&store, Vec::new(), &[]);

    let report = IngestService::from_ref(&ctx)
        .ingest(DOCUMENT, None)
        .await
        .unwrap();

    assert_eq!(
        report,
        IngestReport {
            chunks: 1,
            entities: 2,
            relations: 1
        }
    );
    assert_eq!(store.chunk_count().await, 1);
    assert_eq!(store.entity_count().await, 2);

    let relations = store.relations().await;
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].start_date.as_deref(), Some("2021-01-15"));
    assert_eq!(relations[0].end_date.as_deref(), Some("2021-01-15"));
    assert_eq!(relations[0].relation_text, "Acme Corp acquired Beta LLC");
}

#[tokio::test]
async fn test_retrieve_within_window() {
    let store = MemoryStore::new();
    let question = vec![
        QueryEntity::new("Acme Corp", "company"),
        QueryEntity::new("Q1 2021", "quarter"),
    ];
    let ctx = context(&store, question, &[]);
    IngestService::from_ref(&ctx)
        .ingest(DOCUMENT, Some("press-release"))
        .await
        .unwrap();

    let retrieval = RetrievalService::from_ref(&ctx)
        .retrieve("Who did Acme Corp acquire in Q1 2021?")
        .await
        .unwrap();

    assert_eq!(retrieval.window.start_date.as_deref(), Some("2021-01-01"));
    assert_eq!(retrieval.window.end_date.as_deref(), Some("2021-03-31"));
    assert_eq!(retrieval.linked.len(), 1);
    assert_eq!(retrieval.linked[0].name, "Acme Corp");

    let edges: Vec<_> = retrieval
        .evidence
        .iter()
        .filter_map(|f| match &f.item {
            FusedItem::Edge(edge) => Some(edge),
            FusedItem::Chunk(_) => None,
        })
        .collect();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].edge_score > 0.0);
    assert!(retrieval.context.contains("Acme Corp acquired Beta LLC"));
    assert!(retrieval.context.contains("[chunk:"));
}

#[tokio::test]
async fn test_window_excludes_other_years() {
    let store = MemoryStore::new();
    let question = vec![
        QueryEntity::new("Acme Corp", "company"),
        QueryEntity::new("2019", "year"),
    ];
    let ctx = context(&store, question, &[]);
    IngestService::from_ref(&ctx).ingest(DOCUMENT, None).await.unwrap();

    let retrieval = RetrievalService::from_ref(&ctx)
        .retrieve("What did Acme Corp do in 2019?")
        .await
        .unwrap();

    assert!(retrieval
        .evidence
        .iter()
        .all(|f| matches!(f.item, FusedItem::Chunk(_))));
}

#[tokio::test]
async fn test_answer_uses_retrieved_context() {
    let store = MemoryStore::new();
    let ctx = context(
        &store,
        vec![QueryEntity::new("Beta LLC", "company")],
        &["Acme Corp acquired Beta LLC on 2021-01-15."],
    );
    IngestService::from_ref(&ctx).ingest(DOCUMENT, None).await.unwrap();

    let answer = AnswerService::from_ref(&ctx)
        .answer("Who acquired Beta LLC?")
        .await
        .unwrap();

    assert_eq!(answer.answer, "Acme Corp acquired Beta LLC on 2021-01-15.");
    assert!(answer.retrieval.context.contains("[edge:"));
}
