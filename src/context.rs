//! Application context providing dependency injection root.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::llm::{
    Embedder, Embedders, Extractor, LanguageModel, LlmExtractor, LlmQueryAnalyzer, OpenAiChat,
    OpenAiEmbedder, QueryAnalyzer,
};
use crate::store::{AppStore, CypherStore};

/// Shared chat model.
pub type AppLlm = Arc<dyn LanguageModel>;
/// Shared chunk extractor.
pub type AppExtractor = Arc<dyn Extractor>;
/// Shared question analyzer.
pub type AppAnalyzer = Arc<dyn QueryAnalyzer>;

/// Root application context for dependency injection.
///
/// The Context holds all shared dependencies and uses `#[derive(Context)]`
/// to generate `FromRef` implementations for each field, so every field
/// type must be distinct.
#[derive(ContextDerive, Clone)]
pub struct Context {
    /// Graph store (Neo4j, or in-memory for tests).
    pub store: AppStore,
    /// Text and entity-name embedders.
    pub embedders: Embedders,
    /// Chat model for answering and the agent.
    pub llm: AppLlm,
    pub extractor: AppExtractor,
    pub analyzer: AppAnalyzer,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a context from already-built collaborators.
    pub fn new(
        store: AppStore,
        embedders: Embedders,
        llm: AppLlm,
        extractor: AppExtractor,
        analyzer: AppAnalyzer,
        config: Config,
    ) -> Self {
        Self {
            store,
            embedders,
            llm,
            extractor,
            analyzer,
            config: Arc::new(config),
        }
    }

    /// Builds the production context: Neo4j store and OpenAI-compatible
    /// models. Missing model settings fail here, before any network call.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let llm: AppLlm = Arc::new(OpenAiChat::new(&config)?);
        let text: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(&config.text_embedding())?);
        let entity: Option<Arc<dyn Embedder>> = if config.resolver.strategy.uses_embeddings() {
            Some(Arc::new(OpenAiEmbedder::new(&config.entity_embedding())?))
        } else {
            None
        };

        let extractor: AppExtractor =
            Arc::new(LlmExtractor::new(llm.clone(), config.extraction.clone()));
        let analyzer: AppAnalyzer =
            Arc::new(LlmQueryAnalyzer::new(llm.clone(), config.extraction.clone()));

        let store: AppStore = Arc::new(CypherStore::connect(&config.neo4j).await?);
        debug!(strategy = ?config.resolver.strategy, "Context ready");

        Ok(Self::new(
            store,
            Embedders { text, entity },
            llm,
            extractor,
            analyzer,
            config,
        ))
    }
}
