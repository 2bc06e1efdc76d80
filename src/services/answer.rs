//! Grounded question answering over retrieved evidence.

use serde::Serialize;
use tracing::info;

use crate::context::{AppLlm, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::llm::{prompts, ChatMessage};
use crate::services::{Retrieval, RetrievalService};

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub retrieval: Retrieval,
}

#[derive(FromContext, Clone)]
pub struct AnswerService {
    retrieval: RetrievalService,
    llm: AppLlm,
}

impl AnswerService {
    /// Retrieves evidence for `question` and asks the model to answer from it.
    pub async fn answer(&self, question: &str) -> Result<Answer, AppError> {
        let retrieval = self.retrieval.retrieve(question).await?;

        let messages = [
            ChatMessage::system(prompts::ANSWER_SYSTEM),
            ChatMessage::user(prompts::answer_user(question, &retrieval.context)),
        ];
        let answer = self.llm.complete(&messages).await?.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::Llm("model returned an empty answer".to_string()));
        }

        info!(chars = answer.len(), "Answered question");
        Ok(Answer { answer, retrieval })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::di::FromRef;
    use crate::llm::testing::{HashEmbedder, ScriptedModel, StaticAnalyzer, StaticExtractor};
    use crate::llm::Embedders;
    use crate::retrieval::NO_CONTEXT;
    use crate::store::MemoryStore;

    fn context(model: Arc<ScriptedModel>) -> Context {
        Context::new(
            Arc::new(MemoryStore::new()),
            Embedders {
                text: Arc::new(HashEmbedder::new(16)),
                entity: None,
            },
            model,
            Arc::new(StaticExtractor::default()),
            Arc::new(StaticAnalyzer::default()),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn test_answer_from_empty_graph() {
        let model = Arc::new(ScriptedModel::new(["  Nothing is known.  "]));
        let service = AnswerService::from_ref(&context(model.clone()));

        let answer = service.answer("Who bought Beta?").await.unwrap();
        assert_eq!(answer.answer, "Nothing is known.");
        assert_eq!(answer.retrieval.context, NO_CONTEXT);

        let sent = model.requests();
        assert!(sent[0][1].content.contains(NO_CONTEXT));
        assert!(sent[0][1].content.contains("Who bought Beta?"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let service = AnswerService::from_ref(&context(Arc::new(ScriptedModel::new(["   "]))));
        assert!(matches!(
            service.answer("Who bought Beta?").await,
            Err(AppError::Llm(_))
        ));
    }
}
