//! Model collaborators: chat, embeddings, extraction and question analysis.

mod analyzer;
mod chat;
mod embedding;
mod extractor;

pub mod prompts;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analyzer::{LlmQueryAnalyzer, QueryAnalyzer};
pub use chat::{ChatMessage, LanguageModel, OpenAiChat};
pub use embedding::{Embedder, Embedders, OpenAiEmbedder};
pub use extractor::{Extractor, LlmExtractor};
