//! Ingest command handler.

use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::di::FromRef;
use crate::services::IngestService;

use super::App;

impl App {
    /// Read a document from disk and ingest it.
    pub async fn run_ingest(&self, file: &Path, source: Option<&str>) -> Result<()> {
        let text = tokio::fs::read_to_string(file)
            .await
            .wrap_err_with(|| format!("Failed to read {}", file.display()))?;

        let ctx = Context::connect(Config::load()?).await?;
        let report = IngestService::from_ref(&ctx).ingest(&text, source).await?;

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
