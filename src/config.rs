//! TOML configuration parsing.
//!
//! Every section is optional; a missing config file yields the defaults.
//! After parsing, environment overrides are applied (`PORT` replaces the
//! port of `server.bind`) and the result is validated.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Manifest of statute text URLs, one per line.
pub const DEFAULT_MANIFEST_URL: &str = "https://gist.githubusercontent.com/yasinuzunoglu/e17910de5ef97cf1763def88d7f7bec2/raw/56bbfc87c01ef78af791521ac35470ee0526673f/tumlinkler";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub dump: DumpConfig,
}

/// How per-document fetches are scheduled.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// One request at a time with a fixed delay between requests.
    Sequential,
    /// All requests issued together.
    #[default]
    Concurrent,
}

impl std::str::FromStr for LoadStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(LoadStrategy::Sequential),
            "concurrent" => Ok(LoadStrategy::Concurrent),
            other => anyhow::bail!(
                "Unknown load strategy: '{}'. Must be sequential or concurrent.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,
    /// Load only the first N manifest entries; `0` loads the whole manifest.
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default)]
    pub strategy: LoadStrategy,
    /// Pause after each request in the sequential strategy.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts per document after a failed fetch.
    #[serde(default)]
    pub max_retries: u32,
    /// Upper bound on in-flight fetches in the concurrent strategy.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            max_documents: default_max_documents(),
            strategy: LoadStrategy::default(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            max_concurrency: None,
        }
    }
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}
fn default_max_documents() -> usize {
    100
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: None,
            batch_size: default_batch_size(),
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
fn default_model() -> String {
    "paraphrase-multilingual-minilm-l12-v2".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Results must score strictly above this cosine similarity.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_score: default_min_score(),
        }
    }
}

fn default_max_results() -> usize {
    5
}
fn default_min_score() -> f32 {
    0.1
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Vectors per upsert request.
    #[serde(default = "default_upsert_batch")]
    pub batch_size: usize,
    /// Characters of chunk text kept in vector metadata.
    #[serde(default = "default_metadata_text_limit")]
    pub metadata_text_limit: usize,
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            dimension: default_dimension(),
            metric: default_metric(),
            cloud: default_cloud(),
            region: default_region(),
            batch_size: default_upsert_batch(),
            metadata_text_limit: default_metadata_text_limit(),
            control_plane_url: default_control_plane_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_index_name() -> String {
    "kanunlar".to_string()
}
fn default_dimension() -> usize {
    384
}
fn default_metric() -> String {
    "cosine".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_upsert_batch() -> usize {
    100
}
fn default_metadata_text_limit() -> usize {
    1000
}
fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DumpConfig {
    #[serde(default = "default_documents_path")]
    pub documents_path: PathBuf,
    #[serde(default = "default_chunks_path")]
    pub chunks_path: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            documents_path: default_documents_path(),
            chunks_path: default_chunks_path(),
        }
    }
}

fn default_documents_path() -> PathBuf {
    PathBuf::from("kanunlar.json")
}
fn default_chunks_path() -> PathBuf {
    PathBuf::from("kanun_chunks.json")
}

/// Load configuration from `path` (defaults if the file does not exist),
/// then apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without environment overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

impl Config {
    /// Replace the port of `server.bind` with `port`, keeping the host.
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        let Some(port) = port else {
            return Ok(());
        };
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        let host = self
            .server
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.server.bind = format!("{}:{}", host, port);
        Ok(())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.max_results < 1 {
        anyhow::bail!("retrieval.max_results must be >= 1");
    }

    if !(-1.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0]");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if config.vector_store.batch_size == 0 {
        anyhow::bail!("vector_store.batch_size must be > 0");
    }

    if config.source.max_concurrency == Some(0) {
        anyhow::bail!("source.max_concurrency must be > 0 when set");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or local.",
            other
        ),
    }

    Ok(())
}
