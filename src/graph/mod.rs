//! Backend-agnostic Cypher access.
//!
//! Repositories talk to any [`CypherExecutor`] through the [`Query`] builder,
//! so the same statements run on a client (auto-commit) or inside a
//! transaction obtained from [`GraphClient::begin`].
//!
//! ```ignore
//! use tkgraph::graph::{GraphClient, QueryExt, Transaction};
//!
//! let txn = client.begin().await?;
//! txn.query("MERGE (s:Source {id: $id})").param("id", "10-K 2021").run().await?;
//! txn.commit().await?;
//! ```

mod macros;
mod query;
mod row;
mod traits;

pub mod backends;

pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use traits::{CypherExecutor, GraphClient, Transaction};

#[doc(inline)]
pub use crate::cypher;
