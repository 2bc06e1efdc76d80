//! Init command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::store::{CypherStore, GraphStore, IndexDimensions};

use super::App;

impl App {
    /// Run the init command to create the graph schema.
    pub async fn run_init(&self) -> Result<()> {
        let config = Config::load()?;

        tracing::info!("Connecting to Neo4j at {}", config.neo4j.uri);
        let store = CypherStore::connect(&config.neo4j)
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to connect: {}", e))?;

        let dimensions = IndexDimensions {
            text: config.text_embedding().dimensions,
            entity: config.entity_embedding().dimensions,
        };
        tracing::info!(
            "Ensuring schema (text dimensions: {}, entity dimensions: {})",
            dimensions.text,
            dimensions.entity
        );
        store
            .ensure_schema(dimensions)
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Schema setup failed: {}", e))?;

        let summary = store.introspect().await?;
        tracing::info!(
            "Schema ready: labels {:?}, relationship types {:?}",
            summary.labels,
            summary.relationship_types
        );
        Ok(())
    }
}
