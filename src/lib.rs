//! tkgraph - Temporal Knowledge Graph
//!
//! Ingests documents into a graph of entities joined by dated relations and
//! answers time-aware questions from fused graph and text evidence.

pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod repositories;
pub mod resolution;
pub mod retrieval;
pub mod services;
pub mod store;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
