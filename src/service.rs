//! Query service: the loaded corpus plus the operations the HTTP layer and
//! the CLI expose over it.
//!
//! A [`KanunService`] is built once at startup and is read-only afterwards,
//! so it is shared between request handlers as `Arc<KanunService>`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::chunk::build_chunks;
use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::models::{Document, DocumentSummary, SearchResult};
use crate::search::ChunkIndex;

/// Snapshot reported by `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub kanun_sayisi: usize,
    pub chunk_sayisi: usize,
    pub model_loaded: bool,
    pub uptime_secs: i64,
}

pub struct KanunService {
    documents: Vec<Document>,
    index: ChunkIndex,
    embedder: Option<Arc<dyn Embedder>>,
    retrieval: RetrievalConfig,
    started_at: DateTime<Utc>,
}

impl KanunService {
    /// Build chunks for `documents` and embed them once.
    ///
    /// Without an embedder the index stays empty. An embedding failure is
    /// logged and also leaves the index empty; the documents stay listed.
    pub async fn build(
        documents: Vec<Document>,
        embedder: Option<Arc<dyn Embedder>>,
        retrieval: RetrievalConfig,
        batch_size: usize,
    ) -> Self {
        let chunks = build_chunks(&documents);
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "building chunk index"
        );

        let index = match &embedder {
            Some(embedder) => match ChunkIndex::build(chunks, embedder.as_ref(), batch_size).await
            {
                Ok(index) => index,
                Err(e) => {
                    tracing::error!(error = %e, "failed to embed corpus");
                    ChunkIndex::empty()
                }
            },
            None => {
                tracing::warn!("embedding model not loaded; answers will be empty");
                ChunkIndex::empty()
            }
        };

        Self::from_parts(documents, index, embedder, retrieval)
    }

    pub fn from_parts(
        documents: Vec<Document>,
        index: ChunkIndex,
        embedder: Option<Arc<dyn Embedder>>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            documents,
            index,
            embedder,
            retrieval,
            started_at: Utc::now(),
        }
    }

    /// Rank chunks for `question`.
    ///
    /// `max_results` overrides the configured result count. Without a loaded
    /// model the answer is empty rather than an error.
    pub async fn ask(&self, question: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        let k = max_results.unwrap_or(self.retrieval.max_results);
        let results = self
            .index
            .search(embedder.as_ref(), question, k, self.retrieval.min_score)
            .await?;
        tracing::debug!(question, k, found = results.len(), "question answered");
        Ok(results)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents.iter().map(Document::summary).collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn model_loaded(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn health(&self) -> Health {
        Health {
            status: "healthy",
            kanun_sayisi: self.documents.len(),
            chunk_sayisi: self.index.len(),
            model_loaded: self.model_loaded(),
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_document;
    use async_trait::async_trait;

    /// Maps each text to a one-hot vector over a tiny vocabulary.
    struct KeywordEmbedder;

    const VOCAB: [&str; 3] = ["hapis", "vergi", "evlilik"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }
        fn dims(&self) -> usize {
            VOCAB.len()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    VOCAB
                        .iter()
                        .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    fn corpus() -> Vec<Document> {
        vec![parse_document(
            "https://example.com/5237.txt",
            "Türk Ceza Kanunu\nMadde 1: Hapis cezası.\nMadde 2: Vergi kaçakçılığı.\nGeçici Madde 1: Evlilik.",
        )]
    }

    #[tokio::test]
    async fn test_ask_returns_best_match() {
        let service =
            KanunService::build(corpus(), Some(Arc::new(KeywordEmbedder)), RetrievalConfig::default(), 8)
                .await;
        assert_eq!(service.chunk_count(), 3);

        let answers = service.ask("vergi nedir", None).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].article.number, 2);
        assert!((answers[0].similarity_score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ask_without_model_is_empty() {
        let service = KanunService::build(corpus(), None, RetrievalConfig::default(), 8).await;
        assert!(service.ask("hapis", None).await.unwrap().is_empty());

        let health = service.health();
        assert!(!health.model_loaded);
        assert_eq!(health.kanun_sayisi, 1);
        assert_eq!(health.chunk_sayisi, 0);
    }

    #[tokio::test]
    async fn test_ask_max_results_override() {
        let service =
            KanunService::build(corpus(), Some(Arc::new(KeywordEmbedder)), RetrievalConfig::default(), 8)
                .await;
        assert!(service.ask("hapis vergi", Some(0)).await.unwrap().is_empty());
        assert_eq!(service.ask("hapis vergi", Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summaries() {
        let service = KanunService::build(corpus(), None, RetrievalConfig::default(), 8).await;
        let summaries = service.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].article_count, 2);
        assert_eq!(summaries[0].provisional_article_count, 1);
    }
}
