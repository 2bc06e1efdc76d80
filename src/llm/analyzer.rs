//! Question understanding through a chat model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::ingest::parse_query_entities;
use crate::models::QueryEntity;

use super::chat::{ChatMessage, LanguageModel};
use super::prompts;

/// Extracts the entities and time expressions a question mentions.
#[async_trait]
pub trait QueryAnalyzer: Send + Sync {
    async fn analyze(&self, question: &str) -> Result<Vec<QueryEntity>, AppError>;
}

pub struct LlmQueryAnalyzer {
    llm: Arc<dyn LanguageModel>,
    config: ExtractionConfig,
    system_prompt: String,
}

impl LlmQueryAnalyzer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: ExtractionConfig) -> Self {
        let system_prompt = prompts::query_system(&config);
        Self {
            llm,
            config,
            system_prompt,
        }
    }
}

#[async_trait]
impl QueryAnalyzer for LlmQueryAnalyzer {
    async fn analyze(&self, question: &str) -> Result<Vec<QueryEntity>, AppError> {
        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompts::query_user(question)),
        ];
        let raw = self.llm.complete(&messages).await?;
        let entities = parse_query_entities(
            &raw,
            &self.config.tuple_delimiter,
            &self.config.record_delimiter,
        );
        debug!(?entities, "Analyzed question");
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[tokio::test]
    async fn test_analyze_question() {
        let model = Arc::new(ScriptedModel::new([
            r#"("entity"|"Acme Corp"|"company");;("entity"|"2021-Q1"|"quarter")"#,
        ]));
        let analyzer = LlmQueryAnalyzer::new(model, ExtractionConfig::default());

        let entities = analyzer
            .analyze("What did Acme Corp buy in Q1 2021?")
            .await
            .unwrap();
        assert_eq!(
            entities,
            vec![
                QueryEntity::new("Acme Corp", "company"),
                QueryEntity::new("2021-Q1", "quarter"),
            ]
        );
    }
}
