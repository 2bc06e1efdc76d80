//! Document ingestion: chunk, extract, resolve and write the temporal graph.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::{AppExtractor, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::ingest::{parse_timestamp_range, TextChunker};
use crate::llm::Embedders;
use crate::models::{Chunk, Extraction, Relation, TimestampRange};
use crate::resolution::EntityResolver;
use crate::store::{AppStore, Mutation, UnitOfWork};

/// Totals for an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunks: usize,
    /// Resolved non-temporal entity mentions.
    pub entities: usize,
    /// Extracted relation records.
    pub relations: usize,
}

impl std::ops::AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.chunks += other.chunks;
        self.entities += other.entities;
        self.relations += other.relations;
    }
}

/// Writes documents into the graph.
///
/// Chunks are processed one after another so each sees the entities created
/// by the chunks before it. Every chunk's writes commit together.
#[derive(FromContext, Clone)]
pub struct IngestService {
    store: AppStore,
    embedders: Embedders,
    extractor: AppExtractor,
    config: Arc<Config>,
}

impl IngestService {
    /// Ingests one document, optionally attributed to `source_id`.
    pub async fn ingest(&self, text: &str, source_id: Option<&str>) -> Result<IngestReport, AppError> {
        let resolver = EntityResolver::new(&self.config.resolver, self.embedders.entity.clone())?;
        let texts = TextChunker::new(&self.config.chunking).split(text);
        let mut report = IngestReport::default();
        if texts.is_empty() {
            return Ok(report);
        }

        info!(chunks = texts.len(), source = ?source_id, "Ingesting document");
        let embeddings = self.embedders.text.embed(&texts).await?;
        let total = texts.len();

        for (index, (text, embedding)) in texts.into_iter().zip(embeddings).enumerate() {
            let chunk = Chunk::new(text, embedding, source_id.map(String::from));
            let chunk_report = self.ingest_chunk(&resolver, chunk).await?;
            info!(
                chunk = index + 1,
                total,
                entities = chunk_report.entities,
                relations = chunk_report.relations,
                "Chunk ingested"
            );
            report += chunk_report;
        }

        info!(?report, "Document ingested");
        Ok(report)
    }

    async fn ingest_chunk(
        &self,
        resolver: &EntityResolver,
        chunk: Chunk,
    ) -> Result<IngestReport, AppError> {
        let extraction = self.extractor.extract(&chunk.text).await?;

        let mut unit = UnitOfWork::begin(self.store.as_ref()).await?;
        match self
            .write_chunk(&mut unit, resolver, chunk, &extraction)
            .await
        {
            Ok(report) => {
                let log = unit.commit().await?;
                debug!(
                    mutations = %serde_json::to_string(&log).unwrap_or_default(),
                    "Chunk mutations"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = unit.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_chunk(
        &self,
        unit: &mut UnitOfWork<'_>,
        resolver: &EntityResolver,
        chunk: Chunk,
        extraction: &Extraction,
    ) -> Result<IngestReport, AppError> {
        let extraction_config = &self.config.extraction;
        let chunk_id = chunk.id.clone();
        let source_id = chunk.source_id.clone();

        let timestamps: HashMap<&str, TimestampRange> = extraction
            .entities
            .iter()
            .filter(|e| extraction_config.is_time_type(&e.entity_type))
            .map(|e| (e.name.as_str(), parse_timestamp_range(&e.name)))
            .collect();

        unit.push(Mutation::CreateChunk { chunk }).await?;
        if let Some(source_id) = &source_id {
            unit.push(Mutation::LinkSource {
                chunk_id: chunk_id.clone(),
                source_id: source_id.clone(),
            })
            .await?;
        }

        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut mentioned: Vec<String> = Vec::new();
        for mention in extraction
            .entities
            .iter()
            .filter(|e| !extraction_config.is_time_type(&e.entity_type))
        {
            let resolution = resolver.resolve(unit.reader(), mention).await?;
            if let Some(mutation) = resolution.mutation {
                unit.push(mutation).await?;
            }
            if !mentioned.contains(&resolution.entity_id) {
                mentioned.push(resolution.entity_id.clone());
            }
            resolved.insert(mention.name.as_str(), resolution.entity_id);
        }

        for entity_id in mentioned {
            unit.push(Mutation::LinkMention {
                chunk_id: chunk_id.clone(),
                entity_id,
            })
            .await?;
        }

        let mut relations = Vec::new();
        for relation in &extraction.relations {
            let (Some(source), Some(target)) = (
                resolved.get(relation.source_name.as_str()),
                resolved.get(relation.target_name.as_str()),
            ) else {
                warn!(
                    source = %relation.source_name,
                    target = %relation.target_name,
                    "Skipping relation with unresolved endpoint"
                );
                continue;
            };

            let range = timestamps
                .get(relation.timestamp_name.as_str())
                .cloned()
                .unwrap_or_default();
            relations.push(Relation {
                source_entity_id: source.clone(),
                target_entity_id: target.clone(),
                relation_text: relation.description.clone(),
                start_date: range.start_date,
                end_date: range.end_date,
                source_id: source_id.clone().unwrap_or_else(|| chunk_id.clone()),
                chunk_id: chunk_id.clone(),
                embedding: None,
            });
        }

        self.embed_relations(&mut relations).await?;
        for relation in relations {
            unit.push(Mutation::MergeRelation { relation }).await?;
        }

        Ok(IngestReport {
            chunks: 1,
            entities: resolved.len(),
            relations: extraction.relations.len(),
        })
    }

    /// Embeds relation descriptions in one batch; blank descriptions stay
    /// without an embedding.
    async fn embed_relations(&self, relations: &mut [Relation]) -> Result<(), AppError> {
        let mut targets: Vec<&mut Relation> = relations
            .iter_mut()
            .filter(|r| !r.relation_text.trim().is_empty())
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = targets.iter().map(|r| r.relation_text.clone()).collect();
        let embeddings = self.embedders.text.embed(&texts).await?;
        for (relation, embedding) in targets.iter_mut().zip(embeddings) {
            relation.embedding = Some(embedding);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::FromRef;
    use crate::llm::testing::{HashEmbedder, ScriptedModel, StaticAnalyzer, StaticExtractor};
    use crate::models::{ExtractedEntity, ExtractedRelation};
    use crate::store::MemoryStore;

    fn context(store: &MemoryStore, extraction: Extraction) -> Context {
        Context::new(
            Arc::new(store.clone()),
            Embedders {
                text: Arc::new(HashEmbedder::new(32)),
                entity: None,
            },
            Arc::new(ScriptedModel::default()),
            Arc::new(StaticExtractor::new(extraction)),
            Arc::new(StaticAnalyzer::default()),
            Config::default(),
        )
    }

    fn acquisition() -> Extraction {
        Extraction {
            entities: vec![
                ExtractedEntity::new("2021-Q1", "quarter", "closing quarter"),
                ExtractedEntity::new("Acme Corp", "company", "buyer"),
                ExtractedEntity::new("Beta LLC", "company", "target"),
            ],
            relations: vec![
                ExtractedRelation {
                    timestamp_name: "2021-Q1".to_string(),
                    source_name: "Acme Corp".to_string(),
                    target_name: "Beta LLC".to_string(),
                    description: "Acme Corp acquired Beta LLC".to_string(),
                },
                ExtractedRelation {
                    timestamp_name: "2021-Q1".to_string(),
                    source_name: "Acme Corp".to_string(),
                    target_name: "Gamma Inc".to_string(),
                    description: "Acme Corp sold Gamma Inc".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_ingest_writes_quarter_relation() {
        let store = MemoryStore::new();
        let service = IngestService::from_ref(&context(&store, acquisition()));

        let report = service
            .ingest("In Q1 2021 Acme Corp acquired Beta LLC.", Some("10-K"))
            .await
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                chunks: 1,
                entities: 2,
                relations: 2
            }
        );
        assert_eq!(store.entity_count().await, 2);

        let relations = store.relations().await;
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].start_date.as_deref(), Some("2021-01-01"));
        assert_eq!(relations[0].end_date.as_deref(), Some("2021-03-31"));
        assert_eq!(relations[0].source_id, "10-K");
        assert!(relations[0].embedding.is_some());

        assert_eq!(store.chunk_count().await, 1);
        assert_eq!(store.chunk_source(&relations[0].chunk_id).await.as_deref(), Some("10-K"));
        assert_eq!(store.mentions(&relations[0].chunk_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_second_document_reuses_entities() {
        let store = MemoryStore::new();
        let service = IngestService::from_ref(&context(&store, acquisition()));

        service.ingest("First filing.", None).await.unwrap();
        service.ingest("Second filing.", None).await.unwrap();

        assert_eq!(store.entity_count().await, 2);
        assert_eq!(store.chunk_count().await, 2);
        // Without a document source each chunk is its own provenance.
        assert_eq!(store.relations().await.len(), 2);
    }

    /// Rejects blank input like OpenAI-compatible endpoints do.
    #[derive(Default)]
    struct StrictEmbedder {
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl crate::llm::Embedder for StrictEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            if texts.iter().any(|t| t.trim().is_empty()) {
                return Err(AppError::Embedding("input must not be empty".to_string()));
            }
            self.seen.lock().unwrap().extend(texts.iter().cloned());
            Ok(texts.iter().map(|t| HashEmbedder::new(8).vector(t)).collect())
        }
    }

    #[tokio::test]
    async fn test_blank_and_unresolved_relations_are_not_embedded() {
        let store = MemoryStore::new();
        let mut extraction = acquisition();
        extraction.relations.push(ExtractedRelation {
            timestamp_name: "2021-Q1".to_string(),
            source_name: "Acme Corp".to_string(),
            target_name: "Beta LLC".to_string(),
            description: "  ".to_string(),
        });
        let embedder = Arc::new(StrictEmbedder::default());
        let mut ctx = context(&store, extraction);
        ctx.embedders.text = embedder.clone() as Arc<dyn crate::llm::Embedder>;

        let report = IngestService::from_ref(&ctx)
            .ingest("In Q1 2021 Acme Corp acquired Beta LLC.", None)
            .await
            .unwrap();
        assert_eq!(report.chunks, 1);

        let seen = embedder.seen.lock().unwrap().clone();
        assert!(seen.contains(&"Acme Corp acquired Beta LLC".to_string()));
        assert!(!seen.contains(&"Acme Corp sold Gamma Inc".to_string()));

        let relations = store.relations().await;
        assert_eq!(relations.len(), 2);
        let blank = relations
            .iter()
            .find(|r| r.relation_text.trim().is_empty())
            .unwrap();
        assert!(blank.embedding.is_none());
    }

    #[tokio::test]
    async fn test_empty_document() {
        let store = MemoryStore::new();
        let service = IngestService::from_ref(&context(&store, acquisition()));
        let report = service.ingest("   ", None).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(store.chunk_count().await, 0);
    }
}
