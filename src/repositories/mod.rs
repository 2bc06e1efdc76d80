//! Cypher statements per node and edge kind.
//!
//! Repositories borrow any [`CypherExecutor`](crate::graph::CypherExecutor),
//! so the same statement runs auto-committed on a client or inside an open
//! transaction.

mod chunk;
mod entity;
mod projection;
mod relation;
mod schema;

pub use chunk::ChunkRepository;
pub use entity::EntityRepository;
pub use projection::ProjectionRepository;
pub use relation::RelationRepository;
pub use schema::SchemaRepository;
