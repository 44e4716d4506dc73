//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and the local provider:
//! - **[`LocalEmbedder`]**: runs a multilingual sentence-embedding model
//!   locally via fastembed; the model is loaded once and shared by every
//!   caller. No network calls after the initial model download.
//!
//! `embedding.provider = "disabled"` yields no embedder at all; callers
//! treat a missing embedder as "model not ready" and return empty results.
//!
//! Also provides [`cosine_similarity`] for ranking.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use kanun_qa::config::EmbeddingConfig;
//! # use kanun_qa::embedding::create_embedder;
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = EmbeddingConfig::default();
//! config.provider = "disabled".to_string();
//! assert!(create_embedder(&config).await?.is_none());
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
///
/// Implementations must be shareable across request handlers; the same
/// instance serves every call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"paraphrase-multilingual-minilm-l12-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let results = embedder.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Embed `texts` in batches of `batch_size`, preserving order.
pub async fn embed_batched(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embedder.embed(batch).await?;
        if embedded.len() != batch.len() {
            bail!(
                "Embedding provider returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            );
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for local inference with fastembed.
///
/// The ONNX model is downloaded from Hugging Face on first use and cached.
/// Inference runs on tokio's blocking pool; the model sits behind a mutex
/// because fastembed needs exclusive access while embedding.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbedder {
    /// Load the configured model. Blocks a worker thread while the model
    /// is downloaded and initialised.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        let fastembed_model = config_to_fastembed_model(&model_name)?;

        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))
        })
        .await??;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow::anyhow!("Local embedding model lock poisoned"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

/// Model name and dimensionality, falling back to the model's known size.
pub fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config.model.clone();
    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "paraphrase-multilingual-minilm-l12-v2" => 384,
        "paraphrase-multilingual-mpnet-base-v2" => 768,
        "multilingual-e5-small" => 384,
        "multilingual-e5-base" => 768,
        "multilingual-e5-large" => 1024,
        _ => 384,
    });
    (model_name, dims)
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "paraphrase-multilingual-minilm-l12-v2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "paraphrase-multilingual-mpnet-base-v2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2)
        }
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             paraphrase-multilingual-minilm-l12-v2, paraphrase-multilingual-mpnet-base-v2, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

/// Create the configured embedder.
///
/// | Config Value | Result |
/// |-------------|----------|
/// | `"disabled"` | `None` |
/// | `"local"` | [`LocalEmbedder`] (requires the `local-embeddings` feature) |
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    if !config.is_enabled() {
        return Ok(None);
    }
    match config.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => {
            let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::load(config).await?);
            Ok(Some(embedder))
        }
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-norm vector.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}
