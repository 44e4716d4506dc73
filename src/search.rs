//! Cosine-similarity retrieval over the article corpus.
//!
//! # Ranking Algorithm
//!
//! 1. Embed the question with the shared embedder.
//! 2. Compute cosine similarity against every chunk vector.
//! 3. Sort descending; the sort is stable, so ties keep corpus order.
//! 4. Keep the first `k` entries whose score is strictly greater than
//!    `min_score` (default `0.1`).
//!
//! Chunk vectors are computed once when the [`ChunkIndex`] is built and
//! reused for every query.

use anyhow::{bail, Result};

use crate::embedding::{cosine_similarity, embed_batched, embed_query, Embedder};
use crate::models::{Chunk, SearchResult};

/// Rank `corpus` rows against `query`.
///
/// Returns `(row index, score)` pairs, best first, at most `k` long, all
/// with `score > min_score`. NaN scores never qualify.
pub fn rank(query: &[f32], corpus: &[Vec<f32>], k: usize, min_score: f32) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let score = cosine_similarity(query, row);
            // NaN sorts last and never passes the threshold.
            (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(k)
        .filter(|(_, score)| *score > min_score)
        .collect()
}

/// In-memory corpus of chunks and their embedding vectors.
#[derive(Debug, Clone, Default)]
pub struct ChunkIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl ChunkIndex {
    /// An index with no chunks; every search returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Embed every chunk and build the index.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_batched(embedder, &texts, batch_size).await?;
        Self::from_parts(chunks, vectors)
    }

    /// Assemble an index from precomputed vectors.
    pub fn from_parts(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        Ok(Self { chunks, vectors })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-`k` chunks for `question`.
    ///
    /// An empty index short-circuits without calling the embedder.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        question: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(embedder, question).await?;
        Ok(self.search_vector(&query_vec, k, min_score))
    }

    /// Top-`k` chunks for an already embedded question.
    pub fn search_vector(&self, query_vec: &[f32], k: usize, min_score: f32) -> Vec<SearchResult> {
        rank(query_vec, &self.vectors, k, min_score)
            .into_iter()
            .map(|(i, score)| SearchResult::from_chunk(&self.chunks[i], score))
            .collect()
    }
}
