//! Neo4j backend over the Bolt protocol.
//!
//! Parameters travel as typed Bolt values, never interpolated into the
//! statement. Result columns are converted to JSON, so statements should
//! return scalars, lists or maps rather than whole nodes.
//!
//! ```ignore
//! use tkgraph::graph::backends::neo4j::Neo4jClient;
//! use tkgraph::graph::QueryExt;
//!
//! let client = Neo4jClient::connect("bolt://localhost:7687", "neo4j", "secret").await?;
//! let rows = client.query("MATCH (e:Entity) RETURN e.name AS name").fetch_all().await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, Graph, Txn};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};

/// Neo4j graph client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

impl Neo4jClient {
    /// Connects to Neo4j and verifies the connection pool can be created.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, AppError> {
        let graph = Graph::new(uri, user, password).await?;
        Ok(Self {
            graph: Arc::new(graph),
        })
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let mut result = self
            .graph
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| query_error(cypher, e))? {
            rows.push(convert_row(cypher, &row));
        }
        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.graph
            .run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    type Tx<'a> = Neo4jTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        let txn = self.graph.start_txn().await?;
        Ok(Neo4jTransaction {
            txn: Mutex::new(txn),
        })
    }
}

/// An explicit Neo4j transaction.
///
/// Dropping it without [`commit`](Transaction::commit) leaves the server to
/// roll it back when the connection is recycled.
pub struct Neo4jTransaction {
    txn: Mutex<Txn>,
}

#[async_trait]
impl CypherExecutor for Neo4jTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let mut txn = self.txn.lock().await;
        let mut result = txn
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))?;

        let mut rows = Vec::new();
        while let Some(row) = result
            .next(txn.handle())
            .await
            .map_err(|e| query_error(cypher, e))?
        {
            rows.push(convert_row(cypher, &row));
        }
        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.txn
            .lock()
            .await
            .run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn commit(self) -> Result<(), AppError> {
        self.txn.into_inner().commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.txn.into_inner().rollback().await?;
        Ok(())
    }
}

fn build_query(cypher: &str, params: Params) -> neo4rs::Query {
    params
        .into_iter()
        .fold(neo4rs::query(cypher), |query, (name, value)| {
            query.param(&name, to_bolt(value))
        })
}

/// Converts a JSON parameter into the equivalent Bolt value.
fn to_bolt(value: JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => BoltType::from(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => BoltType::from(s),
        JsonValue::Array(items) => BoltType::List(BoltList {
            value: items.into_iter().map(to_bolt).collect(),
        }),
        JsonValue::Object(map) => BoltType::Map(BoltMap {
            value: map
                .into_iter()
                .map(|(k, v)| (BoltString::from(k), to_bolt(v)))
                .collect(),
        }),
    }
}

fn convert_row(cypher: &str, row: &neo4rs::Row) -> Result<Row, AppError> {
    row.to::<HashMap<String, JsonValue>>()
        .map(Row::new)
        .map_err(|e| AppError::Query {
            message: format!("failed to decode row: {}", e),
            query: cypher.to_string(),
        })
}

fn query_error(cypher: &str, error: neo4rs::Error) -> AppError {
    AppError::Query {
        message: error.to_string(),
        query: cypher.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bolt_scalars() {
        assert!(matches!(to_bolt(JsonValue::Null), BoltType::Null(_)));
        assert!(matches!(to_bolt(json!(true)), BoltType::Boolean(_)));
        assert!(matches!(to_bolt(json!(12)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(json!(0.85)), BoltType::Float(_)));
        assert!(matches!(to_bolt(json!("Acme")), BoltType::String(_)));
    }

    #[test]
    fn test_to_bolt_embedding_list() {
        match to_bolt(json!([0.1, 0.2, 0.3])) {
            BoltType::List(list) => {
                assert_eq!(list.value.len(), 3);
                assert!(list.value.iter().all(|v| matches!(v, BoltType::Float(_))));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_to_bolt_nested_map() {
        match to_bolt(json!({"id": "e1", "aliases": ["a", "b"]})) {
            BoltType::Map(map) => {
                assert_eq!(map.value.len(), 2);
                assert!(matches!(
                    map.value.get(&BoltString::from("aliases")),
                    Some(BoltType::List(_))
                ));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }
}
