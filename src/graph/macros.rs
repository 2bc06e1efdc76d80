//! Macro for inline Cypher queries.

/// Builds a [`Query`](crate::graph::Query) with named parameters.
///
/// ```ignore
/// use tkgraph::cypher;
///
/// cypher!(txn, "MATCH (c:Chunk {id: $chunk_id}) MATCH (e:Entity {id: $entity_id})
///               MERGE (c)-[:MENTIONS]->(e)",
///     chunk_id = chunk_id,
///     entity_id = entity_id,
/// )
/// .run()
/// .await?;
/// ```
#[macro_export]
macro_rules! cypher {
    ($graph:expr, $query:expr) => {
        $graph.query($query)
    };
    ($graph:expr, $query:expr, $($name:ident = $value:expr),+ $(,)?) => {
        $graph.query($query)$(.param(stringify!($name), $value))+
    };
}
