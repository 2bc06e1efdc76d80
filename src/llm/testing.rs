//! Deterministic offline stand-ins for the model collaborators.
//!
//! Used by unit tests, the end-to-end pipeline tests and anyone wiring the
//! services against [`MemoryStore`](crate::store::MemoryStore) without
//! network access.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Extraction, QueryEntity};
use crate::resolution::tokens;

use super::analyzer::QueryAnalyzer;
use super::chat::{ChatMessage, LanguageModel};
use super::embedding::Embedder;
use super::extractor::Extractor;

/// Bag-of-words embedder: each token bumps one hashed bucket, then the vector
/// is L2-normalized. Texts sharing tokens are similar.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            vector[fnv1a(&token) as usize % self.dimensions] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Replies with queued responses in order and records every request.
/// Fails with [`AppError::Llm`] once the queue is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        requests.push(messages.to_vec());
        drop(requests);

        self.replies
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?
            .pop_front()
            .ok_or_else(|| AppError::Llm("no scripted reply left".to_string()))
    }
}

/// Returns the same extraction for every chunk.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    extraction: Extraction,
}

impl StaticExtractor {
    pub fn new(extraction: Extraction) -> Self {
        Self { extraction }
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, _text: &str) -> Result<Extraction, AppError> {
        Ok(self.extraction.clone())
    }
}

/// Returns the same query entities for every question.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer {
    entities: Vec<QueryEntity>,
}

impl StaticAnalyzer {
    pub fn new(entities: Vec<QueryEntity>) -> Self {
        Self { entities }
    }
}

#[async_trait]
impl QueryAnalyzer for StaticAnalyzer {
    async fn analyze(&self, _question: &str) -> Result<Vec<QueryEntity>, AppError> {
        Ok(self.entities.clone())
    }
}
