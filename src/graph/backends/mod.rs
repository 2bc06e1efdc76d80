//! Backend implementations for graph databases.
//!
//! A backend provides a client implementing
//! [`GraphClient`](crate::graph::GraphClient) and a transaction type
//! implementing [`CypherExecutor`](crate::graph::CypherExecutor) and
//! [`Transaction`](crate::graph::Transaction).
//!
//! | Backend | Module |
//! |---------|--------|
//! | Neo4j 5 (Bolt) | [`neo4j`] |

pub mod neo4j;
