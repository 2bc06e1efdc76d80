//! Text embeddings over an OpenAI-compatible endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolvedEmbedding;
use crate::error::AppError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns.
    fn dimensions(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("no embedding returned".to_string()))
    }
}

/// The embedders the application uses.
#[derive(Clone)]
pub struct Embedders {
    /// Chunks, relation descriptions and questions.
    pub text: Arc<dyn Embedder>,
    /// Entity names; only present when the resolver matches by vector.
    pub entity: Option<Arc<dyn Embedder>>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Orders vectors by input index and checks count and dimensions.
fn validate(
    response: EmbeddingResponse,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, AppError> {
    let mut data = response.data;
    if data.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected_count,
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);

    data.into_iter()
        .map(|d| {
            if d.embedding.len() != dimensions {
                return Err(AppError::EmbeddingDimension {
                    expected: dimensions,
                    actual: d.embedding.len(),
                });
            }
            Ok(d.embedding)
        })
        .collect()
}

/// OpenAI-compatible embeddings client.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Fails before any request when the model or API key is missing.
    pub fn new(settings: &ResolvedEmbedding) -> Result<Self, AppError> {
        let model = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or(AppError::MissingConfig("embedding.model"))?;
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingConfig("embedding.api_key"))?;
        let http = Client::builder()
            .user_agent(concat!("tkgraph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimensions: settings.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Embedding(format!(
                "{} returned {}: {}",
                self.model, status, body
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        let vectors = validate(parsed, texts.len(), self.dimensions)?;
        debug!(model = %self.model, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BASE_URL;

    fn settings(model: Option<&str>) -> ResolvedEmbedding {
        ResolvedEmbedding {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some("sk-test".to_string()),
            model: model.map(String::from),
            dimensions: 3,
        }
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let err = OpenAiEmbedder::new(&settings(None)).unwrap_err();
        assert!(matches!(err, AppError::MissingConfig("embedding.model")));
        assert!(err.is_fatal());
        assert!(OpenAiEmbedder::new(&settings(Some("text-embedding-3-small"))).is_ok());
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let embedder = OpenAiEmbedder::new(&settings(Some("m"))).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_validate_orders_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[
                {"index":1,"embedding":[0.0,1.0,0.0]},
                {"index":0,"embedding":[1.0,0.0,0.0]}
            ]}"#,
        )
        .unwrap();
        let vectors = validate(response, 2, 3).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_validate_dimension_mismatch_is_fatal() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#).unwrap();
        let err = validate(response, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            AppError::EmbeddingDimension {
                expected: 3,
                actual: 2
            }
        ));
        assert!(err.is_fatal());
    }
}
