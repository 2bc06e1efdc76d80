//! Chunk extraction through a chat model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::ingest::parse_extraction;
use crate::models::Extraction;

use super::chat::{ChatMessage, LanguageModel};
use super::prompts;

/// Extracts entities and timestamped relations from chunk text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Extraction, AppError>;
}

pub struct LlmExtractor {
    llm: Arc<dyn LanguageModel>,
    config: ExtractionConfig,
    system_prompt: String,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>, config: ExtractionConfig) -> Self {
        let system_prompt = prompts::extraction_system(&config);
        Self {
            llm,
            config,
            system_prompt,
        }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<Extraction, AppError> {
        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompts::extraction_user(&self.config, text)),
        ];
        let raw = self.llm.complete(&messages).await?;

        let extraction = parse_extraction(
            &raw,
            &self.config.tuple_delimiter,
            &self.config.record_delimiter,
        );
        if extraction.is_empty() {
            warn!(chars = raw.len(), "Extraction produced no usable records");
        } else {
            debug!(
                entities = extraction.entities.len(),
                relations = extraction.relations.len(),
                "Extracted records"
            );
        }
        Ok(extraction)
    }
}
