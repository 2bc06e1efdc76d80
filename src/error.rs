//! Application error types.

use thiserror::Error;

/// Application-level errors for tkgraph.
#[derive(Error, Debug)]
pub enum AppError {
    // Neo4j errors
    #[error("Neo4j connection error: {0}")]
    Connection(#[from] neo4rs::Error),

    #[error("Neo4j query error: {message}")]
    Query { message: String, query: String },

    #[error("Internal error: {0}")]
    Internal(String),

    // Domain errors
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    // Embedding errors
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },

    // LLM errors
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Agent error: {0}")]
    Agent(String),
}

impl AppError {
    /// Whether the error must abort the whole run rather than the current request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::MissingConfig(_) | AppError::EmbeddingDimension { .. } | AppError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::EmbeddingDimension {
            expected: 4096,
            actual: 1536,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 4096, got 1536"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_query_error_not_fatal() {
        let err = AppError::Query {
            message: "boom".to_string(),
            query: "MATCH (n) RETURN n".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(AppError::MissingConfig("llm.model").is_fatal());
    }
}
