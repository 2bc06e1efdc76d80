//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/tkgraph/config.toml` (XDG) or platform config dir
//! 2. Project config: `.tkgraph.toml`
//! 3. Environment variables: `TKGRAPH_*` (nested keys separated by `__`)
//!
//! # Example
//!
//! ```toml
//! [neo4j]
//! uri = "bolt://localhost:7688"
//! password = "secret"
//!
//! [llm]
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//!
//! [embedding]
//! model = "text-embedding-3-large"
//! dimensions = 3072
//!
//! [resolver]
//! strategy = "lexical_overlap"
//! threshold = 0.5
//! ```
//!
//! Every algorithm component receives its own section at construction time;
//! nothing below this module reads the process environment.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub neo4j: Neo4jConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    /// Optional override for entity-name embeddings; falls back to `embedding`.
    pub entity_embedding: Option<EmbeddingConfig>,
    pub chunking: ChunkingConfig,
    pub extraction: ExtractionConfig,
    pub resolver: ResolverConfig,
    pub retrieval: RetrievalConfig,
    pub agent: AgentConfig,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687`.
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: None,
        }
    }
}

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL; falls back to the LLM base URL when unset.
    pub base_url: Option<String>,
    /// API key; falls back to the LLM API key when unset.
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Expected vector dimension. A mismatching response is fatal.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            dimensions: 4096,
        }
    }
}

/// Text chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
    /// A newline/sentence backup is only accepted this far into the window.
    pub min_split: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1600,
            overlap: 200,
            min_split: 200,
        }
    }
}

/// Extraction record format and entity taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub tuple_delimiter: String,
    pub record_delimiter: String,
    pub entity_types: Vec<String>,
    /// Entity types that denote time expressions rather than graph entities.
    pub time_types: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tuple_delimiter: "|".to_string(),
            record_delimiter: ";;".to_string(),
            entity_types: [
                "financial concept",
                "business segment",
                "event",
                "company",
                "person",
                "product",
                "location",
                "organization",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            time_types: ["date", "date_range", "quarter", "year"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExtractionConfig {
    /// Whether an extracted entity type denotes a time expression.
    pub fn is_time_type(&self, entity_type: &str) -> bool {
        entity_type == "timestamp" || self.time_types.iter().any(|t| t == entity_type)
    }
}

/// Entity matching policy. Exactly one is active per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Full-text candidates re-scored by token-set Jaccard over aliases.
    LexicalOverlap {
        #[serde(default = "default_candidate_k")]
        candidate_k: usize,
        #[serde(default = "default_overlap_threshold")]
        threshold: f64,
    },
    /// Full-text top hit above a threshold, else nearest entity-name embedding.
    ThresholdVector {
        #[serde(default = "default_fulltext_threshold")]
        fulltext_threshold: f64,
        #[serde(default = "default_vector_threshold")]
        vector_threshold: f64,
        #[serde(default = "default_vector_k")]
        vector_k: usize,
    },
}

fn default_candidate_k() -> usize {
    10
}

fn default_overlap_threshold() -> f64 {
    0.5
}

fn default_fulltext_threshold() -> f64 {
    0.75
}

fn default_vector_threshold() -> f64 {
    0.9
}

fn default_vector_k() -> usize {
    3
}

impl Default for MatchStrategy {
    fn default() -> Self {
        MatchStrategy::LexicalOverlap {
            candidate_k: default_candidate_k(),
            threshold: default_overlap_threshold(),
        }
    }
}

impl MatchStrategy {
    /// Whether new entities need a name embedding under this strategy.
    pub fn uses_embeddings(&self) -> bool {
        matches!(self, MatchStrategy::ThresholdVector { .. })
    }
}

/// Entity resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(flatten)]
    pub strategy: MatchStrategy,
    /// Restrict candidates to the mention's entity type.
    #[serde(default = "default_true")]
    pub type_strict: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            type_strict: true,
        }
    }
}

/// Query-time retrieval and fusion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunk_k: usize,
    pub chunk_min_score: f64,
    pub relation_k: usize,
    pub relation_min_score: f64,
    pub entity_k: usize,
    pub entity_overlap_threshold: f64,
    pub type_strict: bool,
    pub damping: f64,
    pub max_iterations: usize,
    pub max_edges: usize,
    pub max_chunks: usize,
    pub rrf_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_k: 8,
            chunk_min_score: 0.7,
            relation_k: 12,
            relation_min_score: 0.0,
            entity_k: 5,
            entity_overlap_threshold: 0.5,
            type_strict: true,
            damping: 0.85,
            max_iterations: 20,
            max_edges: 50,
            max_chunks: 12,
            rrf_k: 60,
        }
    }
}

/// Exploratory Cypher agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_steps: 5 }
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// The layered provider chain, exposed for inspection and tests.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".tkgraph.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("TKGRAPH_").split("__"))
    }

    /// User config path: ~/.config/tkgraph/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("tkgraph").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("tkgraph").join("config.toml"))
            .unwrap_or_default()
    }

    /// Chat model name, required before any extraction or answering call.
    pub fn llm_model(&self) -> Result<&str, AppError> {
        self.llm
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or(AppError::MissingConfig("llm.model"))
    }

    /// Chat API key, required before any extraction or answering call.
    pub fn llm_api_key(&self) -> Result<&str, AppError> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingConfig("llm.api_key"))
    }

    /// Embedding settings for chunk, relation and question text.
    pub fn text_embedding(&self) -> ResolvedEmbedding {
        self.resolve_embedding(&self.embedding)
    }

    /// Embedding settings for entity names.
    pub fn entity_embedding(&self) -> ResolvedEmbedding {
        let section = self.entity_embedding.as_ref().unwrap_or(&self.embedding);
        let mut resolved = self.resolve_embedding(section);
        if resolved.model.is_none() {
            resolved.model = self.embedding.model.clone();
        }
        resolved
    }

    fn resolve_embedding(&self, section: &EmbeddingConfig) -> ResolvedEmbedding {
        ResolvedEmbedding {
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| self.llm.base_url.clone()),
            api_key: section.api_key.clone().or_else(|| self.llm.api_key.clone()),
            model: section.model.clone(),
            dimensions: section.dimensions,
        }
    }
}

/// An embedding section with fallbacks to the LLM section applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEmbedding {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub dimensions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chunking.max_chars, 1600);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.rrf_k, 60);
        assert_eq!(config.retrieval.relation_k, 12);
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(
            config.resolver.strategy,
            MatchStrategy::LexicalOverlap {
                candidate_k: 10,
                threshold: 0.5
            }
        );
        assert!(config.extraction.is_time_type("timestamp"));
        assert!(config.extraction.is_time_type("quarter"));
        assert!(!config.extraction.is_time_type("company"));
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let config = Config::default();
        let err = config.llm_model().unwrap_err();
        assert!(matches!(err, AppError::MissingConfig("llm.model")));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_project_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".tkgraph.toml",
                r#"
                [llm]
                model = "gpt-4o-mini"

                [resolver]
                strategy = "threshold_vector"
                vector_threshold = 0.95

                [retrieval]
                max_edges = 20
                "#,
            )?;
            jail.set_env("TKGRAPH_RETRIEVAL__RRF_K", "30");

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
            assert_eq!(config.retrieval.max_edges, 20);
            assert_eq!(config.retrieval.rrf_k, 30);
            assert_eq!(config.retrieval.chunk_k, 8);
            assert_eq!(
                config.resolver.strategy,
                MatchStrategy::ThresholdVector {
                    fulltext_threshold: 0.75,
                    vector_threshold: 0.95,
                    vector_k: 3
                }
            );
            assert!(config.resolver.type_strict);
            Ok(())
        });
    }

    #[test]
    fn test_entity_embedding_falls_back() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-test".to_string());
        config.embedding.model = Some("text-embedding-3-large".to_string());
        config.entity_embedding = Some(EmbeddingConfig {
            dimensions: 1024,
            ..EmbeddingConfig::default()
        });

        let entity = config.entity_embedding();
        assert_eq!(entity.model.as_deref(), Some("text-embedding-3-large"));
        assert_eq!(entity.dimensions, 1024);
        assert_eq!(entity.api_key.as_deref(), Some("sk-test"));
        assert_eq!(entity.base_url, DEFAULT_BASE_URL);
    }
}
