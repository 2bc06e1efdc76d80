//! Ingestion building blocks: chunking, extraction parsing and timestamp
//! normalization. All of them are pure and never fail.

mod chunker;
mod parser;
mod timestamp;

pub use chunker::{Chunks, TextChunker};
pub use parser::{parse_extraction, parse_query_entities};
pub use timestamp::parse_timestamp_range;
