//! Exploratory Cypher agent.
//!
//! The model alternates between issuing read-only queries and observing
//! their results until it commits to an answer.

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::context::{AppLlm, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::llm::{prompts, ChatMessage};
use crate::store::AppStore;

const QUERY_PREFIX: &str = "QUERY:";
const FINAL_PREFIX: &str = "FINAL:";

/// The agent's answer with the last query it ran.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub answer: String,
    pub cypher: Option<String>,
    pub rows: Vec<JsonValue>,
    pub steps: usize,
}

#[derive(FromContext, Clone)]
pub struct AgentService {
    store: AppStore,
    llm: AppLlm,
}

impl AgentService {
    /// Runs the query loop for at most `max_steps` model turns.
    pub async fn explore(&self, question: &str, max_steps: usize) -> Result<AgentOutcome, AppError> {
        let introspection = self.store.introspect().await.map_err(|e| {
            warn!(error = %e, "Schema introspection failed");
            e.to_string()
        });

        let mut messages = vec![
            ChatMessage::system(prompts::agent_system(introspection.as_ref().map_err(String::clone))),
            ChatMessage::user(prompts::agent_question(question)),
        ];
        let mut cypher: Option<String> = None;
        let mut rows: Vec<JsonValue> = Vec::new();

        for step in 1..=max_steps {
            let reply = self.llm.complete(&messages).await?;
            let reply = reply.trim();
            debug!(step, reply, "Agent turn");

            if let Some(answer) = reply.strip_prefix(FINAL_PREFIX) {
                info!(steps = step, "Agent answered");
                return Ok(AgentOutcome {
                    answer: answer.trim().to_string(),
                    cypher,
                    rows,
                    steps: step,
                });
            }

            let Some(query) = reply.strip_prefix(QUERY_PREFIX) else {
                let preview: String = reply.chars().take(200).collect();
                return Err(AppError::Agent(format!("unexpected reply: {}", preview)));
            };
            let query = query.trim().to_string();

            rows = match self.store.read_query(&query).await {
                Ok(rows) => rows,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Agent query failed");
                    vec![json!({ "__error__": e.to_string() })]
                }
            };

            messages.push(ChatMessage::assistant(reply));
            messages.push(ChatMessage::user(prompts::agent_observation(
                &query,
                &serde_json::to_string_pretty(&rows)?,
            )));
            cypher = Some(query);
        }

        Err(AppError::Agent(format!(
            "no final answer within {} steps",
            max_steps
        )))
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
    use crate::store::MemoryStore;

    fn service(replies: &[&str]) -> (AgentService, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        let context = Context::new(
            Arc::new(MemoryStore::new()),
            Embedders {
                text: Arc::new(HashEmbedder::new(8)),
                entity: None,
            },
            model.clone(),
            Arc::new(StaticExtractor::default()),
            Arc::new(StaticAnalyzer::default()),
            Config::default(),
        );
        (AgentService::from_ref(&context), model)
    }

    #[tokio::test]
    async fn test_final_answer_immediately() {
        let (agent, _) = service(&["FINAL: 42"]);
        let outcome = agent.explore("How many?", 5).await.unwrap();
        assert_eq!(outcome.answer, "42");
        assert_eq!(outcome.steps, 1);
        assert!(outcome.cypher.is_none());
    }

    #[tokio::test]
    async fn test_query_error_is_observed_not_fatal() {
        let (agent, model) = service(&[
            "QUERY: MATCH (e:Entity) RETURN count(e) AS n",
            "FINAL: unknown",
        ]);
        let outcome = agent.explore("How many entities?", 5).await.unwrap();

        assert_eq!(outcome.steps, 2);
        assert_eq!(
            outcome.cypher.as_deref(),
            Some("MATCH (e:Entity) RETURN count(e) AS n")
        );
        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.rows[0].get("__error__").is_some());

        let second_turn = &model.requests()[1];
        assert_eq!(second_turn.len(), 4);
        assert!(second_turn[3].content.contains("__error__"));
    }

    #[tokio::test]
    async fn test_unexpected_reply() {
        let (agent, _) = service(&["Let me think about it."]);
        assert!(matches!(
            agent.explore("?", 5).await,
            Err(AppError::Agent(_))
        ));
    }

    #[tokio::test]
    async fn test_step_budget() {
        let (agent, model) = service(&["QUERY: RETURN 1", "QUERY: RETURN 2", "FINAL: late"]);
        assert!(matches!(
            agent.explore("?", 2).await,
            Err(AppError::Agent(_))
        ));
        assert_eq!(model.requests().len(), 2);
    }
}
