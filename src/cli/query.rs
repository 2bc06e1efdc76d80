//! Query command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::di::FromRef;
use crate::services::{AnswerService, RetrievalService};

use super::App;

impl App {
    /// Print the fused evidence for a question, or an answer built from it.
    pub async fn run_query(&self, question: &str, answer: bool) -> Result<()> {
        let ctx = Context::connect(Config::load()?).await?;

        if answer {
            let answer = AnswerService::from_ref(&ctx).answer(question).await?;
            println!("{}", answer.answer);
            tracing::debug!("Evidence:\n{}", answer.retrieval.context);
        } else {
            let retrieval = RetrievalService::from_ref(&ctx).retrieve(question).await?;
            println!("{}", serde_json::to_string_pretty(&retrieval)?);
        }
        Ok(())
    }
}
