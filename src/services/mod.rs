//! Business logic services for the temporal knowledge graph.
//!
//! Services orchestrate the store, models and algorithms, using the
//! `FromContext` derive macro for dependency injection.

mod agent;
mod answer;
mod ingest;
mod retrieval;

pub use agent::{AgentOutcome, AgentService};
pub use answer::{Answer, AnswerService};
pub use ingest::{IngestReport, IngestService};
pub use retrieval::{understand, Retrieval, RetrievalService};
