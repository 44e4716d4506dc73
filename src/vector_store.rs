//! External vector-database path (Pinecone).
//!
//! Instead of ranking in memory, chunks are embedded and upserted into a
//! Pinecone serverless index, and questions are answered by the index's own
//! top-K query. Correctness of ranking on this path is whatever the service
//! guarantees.
//!
//! # Flow
//!
//! ```text
//! kanun_chunks.json ─▶ embed (batches of 100) ─▶ POST /vectors/upsert
//! question ─▶ embed ─▶ POST /query ─▶ matches
//! ```
//!
//! Upload is not transactional across batches: an interrupted upload leaves
//! a partially populated index and is simply rerun (upserts are idempotent
//! by chunk id).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorStoreConfig;
use crate::embedding::{embed_query, Embedder};
use crate::models::{gazette_date, ArticleRef, Chunk, SearchResult};

/// Environment variable holding the Pinecone API key.
pub const API_KEY_ENV: &str = "PINECONE_API_KEY";

const API_VERSION: &str = "2024-07";

/// Polls of the control plane while waiting for a new index to become ready.
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub kanun_no: String,
    pub baslik: String,
    pub madde_no: ArticleRef,
    #[serde(
        default,
        with = "gazette_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub yayim_tarihi: Option<NaiveDate>,
    /// Chunk text, truncated to the configured character limit.
    pub text: String,
}

/// One vector to upsert.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>, text_limit: usize) -> Self {
        Self {
            id: chunk.id.clone(),
            values,
            metadata: VectorMetadata {
                kanun_no: chunk.document_id.clone(),
                baslik: chunk.title.clone(),
                madde_no: chunk.article,
                yayim_tarihi: chunk.publication_date,
                text: chunk.text.chars().take(text_limit).collect(),
            },
        }
    }
}

/// A match returned by the vector store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

impl StoreMatch {
    pub fn into_search_result(self) -> SearchResult {
        SearchResult {
            document_id: self.metadata.kanun_no,
            title: self.metadata.baslik,
            article: self.metadata.madde_no,
            publication_date: self.metadata.yayim_tarihi,
            source_url: None,
            text: self.metadata.text,
            similarity_score: self.score,
        }
    }
}

/// Storage and similarity search delegated to an external service.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite vectors by id. Returns the number upserted.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// The service's own top-K ranking for `vector`.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoreMatch>>;
}

/// Read the API key; its absence is a fatal setup error.
pub fn api_key_from_env() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!(
            "{} environment variable not set. Create an API key in the Pinecone console and export it.",
            API_KEY_ENV
        ),
    }
}

// ============ Pinecone ============

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<StoreMatch>,
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: usize,
}

/// Pinecone serverless index client.
pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    index_name: String,
    /// Data-plane base URL, e.g. `https://kanunlar-abc123.svc.pinecone.io`.
    host: String,
}

impl PineconeStore {
    /// Connect to the configured index, creating it first when missing.
    pub async fn connect(config: &VectorStoreConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let control = config.control_plane_url.trim_end_matches('/');

        let list: IndexList = send_json(
            client
                .get(format!("{}/indexes", control))
                .header("Api-Key", &api_key)
                .header("X-Pinecone-API-Version", API_VERSION),
        )
        .await
        .context("Failed to list Pinecone indexes")?;

        let existing = list
            .indexes
            .into_iter()
            .find(|index| index.name == config.index_name);

        let host = match existing {
            Some(IndexDescription {
                host: Some(host), ..
            }) => host,
            // Listed but still initialising: no host yet.
            Some(_) => wait_until_ready(&client, control, &api_key, &config.index_name).await?,
            None => {
                tracing::info!(index = %config.index_name, "creating Pinecone index");
                let body = serde_json::json!({
                    "name": config.index_name,
                    "dimension": config.dimension,
                    "metric": config.metric,
                    "spec": {
                        "serverless": {
                            "cloud": config.cloud,
                            "region": config.region,
                        }
                    }
                });
                let _: serde_json::Value = send_json(
                    client
                        .post(format!("{}/indexes", control))
                        .header("Api-Key", &api_key)
                        .header("X-Pinecone-API-Version", API_VERSION)
                        .json(&body),
                )
                .await
                .context("Failed to create Pinecone index")?;

                wait_until_ready(&client, control, &api_key, &config.index_name).await?
            }
        };

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        tracing::info!(index = %config.index_name, host = %host, "Pinecone index ready");

        Ok(Self {
            client,
            api_key,
            index_name: config.index_name.clone(),
            host: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

async fn wait_until_ready(
    client: &reqwest::Client,
    control: &str,
    api_key: &str,
    index_name: &str,
) -> Result<String> {
    for attempt in 0..READY_POLL_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        let desc: IndexDescription = send_json(
            client
                .get(format!("{}/indexes/{}", control, index_name))
                .header("Api-Key", api_key)
                .header("X-Pinecone-API-Version", API_VERSION),
        )
        .await
        .context("Failed to describe Pinecone index")?;

        let ready = desc.status.map(|s| s.ready).unwrap_or(false);
        match desc.host {
            Some(host) if ready => return Ok(host),
            _ => tracing::debug!(index = index_name, attempt, "waiting for index"),
        }
    }

    bail!(
        "Pinecone index '{}' not ready after {} polls",
        index_name,
        READY_POLL_ATTEMPTS
    )
}

/// Send a request and decode a JSON body, turning non-2xx into an error
/// carrying the response text.
async fn send_json<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("Pinecone API error {}: {}", status, body_text);
    }
    Ok(response.json().await?)
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let body = serde_json::json!({ "vectors": records });
        let resp: UpsertResponse = send_json(
            self.client
                .post(format!("{}/vectors/upsert", self.host))
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(&body),
        )
        .await?;
        Ok(resp.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoreMatch>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let resp: QueryResponse = send_json(
            self.client
                .post(format!("{}/query", self.host))
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(&body),
        )
        .await?;
        Ok(resp.matches)
    }
}

/// Embed and upsert `chunks` in batches of `batch_size`.
///
/// Returns the total number of vectors sent. Stops at the first failing
/// batch; batches already upserted stay in the index.
pub async fn upload_chunks(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
    text_limit: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let total_batches = chunks.len().div_ceil(batch_size);
    let mut uploaded = 0usize;

    for (i, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values, text_limit))
            .collect();

        store
            .upsert(&records)
            .await
            .with_context(|| format!("Upsert of batch {} failed", i + 1))?;
        uploaded += records.len();
        tracing::info!(
            batch = i + 1,
            total_batches,
            vectors = records.len(),
            "batch uploaded"
        );
    }

    Ok(uploaded)
}

/// Embed `question` and return the store's top-`top_k` matches.
pub async fn search_store(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    question: &str,
    top_k: usize,
) -> Result<Vec<StoreMatch>> {
    let vector = embed_query(embedder, question).await?;
    store.query(&vector, top_k).await
}
