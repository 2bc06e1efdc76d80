//! Personalized PageRank through an ephemeral GDS projection.

use std::collections::HashMap;

use tracing::{debug, warn};
use ulid::Ulid;

use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::store::{PageRankParams, Subgraph};

const NODE_QUERY: &str = "MATCH (e:Entity) WHERE e.id IN $node_ids RETURN id(e) AS id";

const RELATIONSHIP_QUERY: &str = "MATCH (a:Entity)-[r:RELATED_TO]->(b:Entity)
WHERE elementId(r) IN $edge_ids
RETURN id(a) AS source, id(b) AS target";

pub struct ProjectionRepository<'a, E: CypherExecutor + ?Sized> {
    graph: &'a E,
}

impl<'a, E: CypherExecutor + ?Sized> ProjectionRepository<'a, E> {
    pub fn new(graph: &'a E) -> Self {
        Self { graph }
    }

    /// Runs PageRank seeded on `subgraph.seeds` over a uniquely named
    /// projection of exactly the subgraph. The projection is dropped on
    /// every exit path.
    pub async fn page_rank(
        &self,
        subgraph: &Subgraph,
        params: &PageRankParams,
    ) -> Result<HashMap<String, f64>, AppError> {
        if subgraph.is_empty() {
            return Ok(HashMap::new());
        }

        let name = format!("ppr_{}", Ulid::new().to_string().to_lowercase());
        debug!(
            projection = %name,
            nodes = subgraph.nodes.len(),
            edges = subgraph.edges.len(),
            "Projecting subgraph"
        );

        let result = match self.project(&name, subgraph).await {
            Ok(()) => self.stream(&name, subgraph, params).await,
            Err(e) => Err(e),
        };

        match (result, self.drop(&name).await) {
            (Ok(scores), Ok(())) => Ok(scores),
            (Ok(_), Err(drop_error)) => Err(drop_error),
            (Err(e), drop_result) => {
                if let Err(drop_error) = drop_result {
                    warn!(projection = %name, error = %drop_error, "Failed to drop projection");
                }
                Err(e)
            }
        }
    }

    async fn project(&self, name: &str, subgraph: &Subgraph) -> Result<(), AppError> {
        let edge_ids: Vec<&str> = subgraph.edges.iter().map(|e| e.edge_id.as_str()).collect();
        self.graph
            .query(
                "CALL gds.graph.project.cypher(
                     $name,
                     $node_query,
                     $relationship_query,
                     {parameters: {node_ids: $node_ids, edge_ids: $edge_ids}}
                 )
                 YIELD graphName
                 RETURN graphName",
            )
            .param("name", name)
            .param("node_query", NODE_QUERY)
            .param("relationship_query", RELATIONSHIP_QUERY)
            .param("node_ids", &subgraph.nodes)
            .param("edge_ids", edge_ids)
            .fetch_all()
            .await?;
        Ok(())
    }

    async fn stream(
        &self,
        name: &str,
        subgraph: &Subgraph,
        params: &PageRankParams,
    ) -> Result<HashMap<String, f64>, AppError> {
        let rows = self
            .graph
            .query(
                "MATCH (seed:Entity) WHERE seed.id IN $seed_ids
                 WITH collect(seed) AS seeds
                 CALL gds.pageRank.stream($name, {
                     maxIterations: $max_iterations,
                     dampingFactor: $damping,
                     sourceNodes: seeds
                 })
                 YIELD nodeId, score
                 RETURN gds.util.asNode(nodeId).id AS entity_id, score",
            )
            .param("seed_ids", &subgraph.seeds)
            .param("name", name)
            .param("max_iterations", params.max_iterations)
            .param("damping", params.damping)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<(String, f64), AppError> {
                Ok((row.get("entity_id")?, row.get("score")?))
            })
            .collect()
    }

    async fn drop(&self, name: &str) -> Result<(), AppError> {
        self.graph
            .query("CALL gds.graph.drop($name, false) YIELD graphName RETURN graphName")
            .param("name", name)
            .fetch_all()
            .await?;
        Ok(())
    }
}
