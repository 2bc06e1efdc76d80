//! Graph store abstraction with a Neo4j and an in-memory implementation.
//!
//! Every write goes through a [`Mutation`]; [`UnitOfWork`] applies a batch of
//! them atomically inside one [`StoreTransaction`].

mod cypher;
mod memory;
mod mutation;
mod traits;

use std::sync::Arc;

pub use cypher::{CypherStore, CypherTransaction};
pub use memory::{MemoryStore, MemoryTransaction};
pub use mutation::{Mutation, UnitOfWork};
pub use traits::{
    GraphReader, GraphStore, GraphWriter, IndexDimensions, PageRankParams, PageRanker,
    SchemaSummary, StoreTransaction, Subgraph, SubgraphEdge,
};

/// Shared store handle held by the application context.
pub type AppStore = Arc<dyn GraphStore>;
