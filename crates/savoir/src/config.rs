//! TOML configuration parsing.
//!
//! The application is configured through a single TOML file with one
//! section per concern. Every retrieval and chunking knob has a default
//! matching the engine's baseline, so a minimal config only needs the
//! database path.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use savoir_core::models::{ChunkingOptions, RagConfig, SplitStrategy};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_split_on")]
    pub split_on: SplitStrategy,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            split_on: default_split_on(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

impl ChunkingConfig {
    pub fn to_options(&self) -> ChunkingOptions {
        ChunkingOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            split_on: self.split_on,
            min_chunk_size: self.min_chunk_size,
            max_chunk_size: self.max_chunk_size,
        }
    }
}

fn default_chunk_size() -> usize {
    512
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_split_on() -> SplitStrategy {
    SplitStrategy::Sentence
}
fn default_min_chunk_size() -> usize {
    100
}
fn default_max_chunk_size() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_use_reranking")]
    pub use_reranking: bool,
    #[serde(default = "default_context_length")]
    pub context_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_results: default_max_results(),
            use_reranking: default_use_reranking(),
            context_length: default_context_length(),
        }
    }
}

impl RetrievalConfig {
    /// Fixed per-query config from the file; the adaptive analyzer in
    /// `savoir_core::query` is the usual alternative.
    pub fn to_rag_config(&self) -> RagConfig {
        RagConfig {
            enabled: true,
            selected_knowledge_base: None,
            similarity_threshold: self.similarity_threshold,
            max_results: self.max_results,
            use_reranking: self.use_reranking,
            context_length: self.context_length,
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.38
}
fn default_max_results() -> usize {
    5
}
fn default_use_reranking() -> bool {
    true
}
fn default_context_length() -> usize {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"local"`, `"openai"`, or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            max_tokens: default_max_tokens(),
            endpoint: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_max_tokens() -> usize {
    256
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
