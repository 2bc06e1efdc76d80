//! Entity resolution and query-entity linking.

mod lexical;
mod linker;
mod resolver;

pub use lexical::{alias_overlap, escape_lucene, jaccard, tokens};
pub use linker::link_entities;
pub use resolver::{EntityResolver, Resolution, ResolutionOutcome};
