//! Explore command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::di::FromRef;
use crate::services::AgentService;

use super::App;

impl App {
    /// Run the Cypher agent and print its answer.
    pub async fn run_explore(&self, question: &str, max_steps: Option<usize>) -> Result<()> {
        let ctx = Context::connect(Config::load()?).await?;
        let max_steps = max_steps.unwrap_or(ctx.config.agent.max_steps);

        let outcome = AgentService::from_ref(&ctx)
            .explore(question, max_steps)
            .await?;

        println!("{}", outcome.answer);
        if let Some(cypher) = &outcome.cypher {
            tracing::info!("Last query ({} steps): {}", outcome.steps, cypher);
        }
        Ok(())
    }
}
