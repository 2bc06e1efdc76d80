//! Question retrieval: understand, search three channels, rank and fuse.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, ExtractionConfig};
use crate::context::{AppAnalyzer, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::ingest::parse_timestamp_range;
use crate::llm::Embedders;
use crate::models::{LinkedEntity, QueryEntity, TimestampRange};
use crate::resolution::link_entities;
use crate::retrieval::{
    filter_by_window, fuse, merge_edges, rank_chunks, render_context, score_edges, Fused,
};
use crate::store::{AppStore, PageRankParams};

/// The evidence gathered for a question.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub question: String,
    /// Union of the question's time expressions; unbounded when it has none.
    pub window: TimestampRange,
    pub linked: Vec<LinkedEntity>,
    pub evidence: Vec<Fused>,
    /// Rendered evidence for the answering prompt.
    pub context: String,
}

/// Splits query entities into the time window they describe and the topical
/// entities to link.
///
/// Time expressions that do not normalize are ignored.
pub fn understand(config: &ExtractionConfig, entities: Vec<QueryEntity>) -> (TimestampRange, Vec<QueryEntity>) {
    let (temporal, topical): (Vec<QueryEntity>, Vec<QueryEntity>) = entities
        .into_iter()
        .partition(|e| config.is_time_type(&e.entity_type));

    let ranges: Vec<TimestampRange> = temporal
        .iter()
        .map(|e| parse_timestamp_range(&e.name))
        .filter(|r| !r.is_unbounded())
        .collect();

    (TimestampRange::union(&ranges), topical)
}

#[derive(FromContext, Clone)]
pub struct RetrievalService {
    store: AppStore,
    embedders: Embedders,
    analyzer: AppAnalyzer,
    config: Arc<Config>,
}

impl RetrievalService {
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval, AppError> {
        let settings = &self.config.retrieval;
        let store = self.store.as_ref();

        let (window, topical) = understand(
            &self.config.extraction,
            self.analyzer.analyze(question).await?,
        );
        let embedding = self.embedders.text.embed_one(question).await?;

        let entity_channel = async {
            let linked = link_entities(
                store,
                &topical,
                settings.entity_k,
                settings.entity_overlap_threshold,
                settings.type_strict,
            )
            .await?;
            let ids: Vec<String> = linked.iter().map(|l| l.entity_id.clone()).collect();
            let edges = store.edges_touching(&ids).await?;
            Ok::<_, AppError>((linked, edges))
        };

        let (chunk_hits, relation_hits, (linked, expansion_hits)) = tokio::try_join!(
            store.nearest_chunks(&embedding, settings.chunk_k, settings.chunk_min_score),
            store.nearest_relations(&embedding, settings.relation_k, settings.relation_min_score),
            entity_channel,
        )?;
        debug!(
            chunks = chunk_hits.len(),
            relations = relation_hits.len(),
            linked = linked.len(),
            expanded = expansion_hits.len(),
            "Candidate channels"
        );

        let edges = filter_by_window(merge_edges(relation_hits, expansion_hits), &window);
        let params = PageRankParams {
            damping: settings.damping,
            max_iterations: settings.max_iterations,
        };
        let scored = score_edges(store, edges, &params, settings.max_edges).await?;
        let chunks = rank_chunks(chunk_hits, settings.max_chunks);

        let evidence = fuse(&scored, &chunks, settings.rrf_k);
        let context = render_context(&evidence);
        info!(
            window = %window,
            edges = scored.len(),
            chunks = chunks.len(),
            "Retrieved evidence"
        );

        Ok(Retrieval {
            question: question.to_string(),
            window,
            linked,
            evidence,
            context,
        })
    }
}
