//! Document loading from a remote manifest or a local folder.
//!
//! The manifest is a plain-text file with one document URL per line. Each
//! listed document is fetched and parsed into a [`Document`]. Loading never
//! fails as a whole: a manifest that cannot be fetched yields zero
//! documents, and a document that cannot be fetched is logged and skipped.
//!
//! Two scheduling strategies are available:
//! - **sequential**: one request at a time with a fixed pause after each.
//! - **concurrent**: all requests in flight together (optionally bounded
//!   by `max_concurrency`); results are kept in manifest order.
//!
//! Both load only the first `max_documents` manifest entries (`0` = all).

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

use crate::config::{LoadStrategy, SourceConfig};
use crate::extract::{kanun_no_from_path, parse_document, parse_document_with_id};
use crate::models::Document;

/// User agent string identifying this loader.
const USER_AGENT: &str = concat!("kanun-qa/", env!("CARGO_PKG_VERSION"));

/// Base delay for exponential backoff between retries (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How often the sequential strategy logs progress.
const PROGRESS_EVERY: usize = 50;

/// Split manifest text into URLs: lines trimmed, blank lines dropped.
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first `max` entries of `urls`; `max == 0` keeps all of them.
pub fn cap_urls(urls: &[String], max: usize) -> &[String] {
    if max == 0 {
        urls
    } else {
        &urls[..urls.len().min(max)]
    }
}

/// HTTP document loader sharing one client across all requests.
pub struct Loader {
    client: reqwest::Client,
    config: SourceConfig,
}

impl Loader {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch the manifest and return its URLs.
    ///
    /// Any failure is logged and results in an empty list.
    pub async fn fetch_manifest(&self) -> Vec<String> {
        match self.fetch_text(&self.config.manifest_url).await {
            Ok(text) => {
                let urls = parse_manifest(&text);
                tracing::info!(count = urls.len(), "manifest loaded");
                urls
            }
            Err(e) => {
                tracing::error!(
                    url = %self.config.manifest_url,
                    error = %e,
                    "failed to load manifest"
                );
                Vec::new()
            }
        }
    }

    /// Fetch and parse a single document.
    pub async fn fetch_document(&self, url: &str) -> Result<Document> {
        let text = self.fetch_text(url).await?;
        Ok(parse_document(url, &text))
    }

    /// GET `url` as text, retrying up to `max_retries` extra times with
    /// exponential backoff (500ms, 1s, 2s, ...).
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1).min(5));
                tracing::debug!(url, attempt, delay_ms = delay, "retrying after delay");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let result = async {
                let response = self.client.get(url).send().await?.error_for_status()?;
                response.text().await
            }
            .await;

            match result {
                Ok(text) => return Ok(text),
                Err(e) => {
                    // Client errors other than 429 will not succeed on retry.
                    let permanent = e
                        .status()
                        .map(|s| s.is_client_error() && s.as_u16() != 429)
                        .unwrap_or(false);
                    last_err = Some(e);
                    if permanent {
                        break;
                    }
                }
            }
        }

        match last_err {
            Some(e) => Err(e).with_context(|| format!("GET {} failed", url)),
            None => bail!("GET {} failed", url),
        }
    }

    /// Fetch documents one at a time, pausing `request_delay_ms` after each
    /// request. Failed documents are skipped.
    pub async fn load_sequential(&self, urls: &[String]) -> Vec<Document> {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let total = urls.len();
        let mut documents = Vec::with_capacity(total);

        for (i, url) in urls.iter().enumerate() {
            tracing::debug!(url = %url, position = i + 1, total, "fetching document");

            match self.fetch_document(url).await {
                Ok(doc) => {
                    documents.push(doc);
                    if documents.len() % PROGRESS_EVERY == 0 {
                        tracing::info!(loaded = documents.len(), total, "loading documents");
                    }
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "skipping document"),
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        documents
    }

    /// Fetch all documents together and keep the successful ones, in
    /// manifest order.
    pub async fn load_concurrent(&self, urls: &[String]) -> Vec<Document> {
        let limit = self
            .config
            .max_concurrency
            .unwrap_or(urls.len())
            .max(1);

        let results: Vec<(&String, Result<Document>)> = stream::iter(urls)
            .map(|url| async move { (url, self.fetch_document(url).await) })
            .buffered(limit)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(url, result)| match result {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "skipping document");
                    None
                }
            })
            .collect()
    }

    /// Fetch `urls` with the configured strategy.
    pub async fn load_urls(&self, urls: &[String]) -> Vec<Document> {
        match self.config.strategy {
            LoadStrategy::Sequential => self.load_sequential(urls).await,
            LoadStrategy::Concurrent => self.load_concurrent(urls).await,
        }
    }

    /// Manifest → first `max_documents` entries → configured strategy.
    pub async fn load_all(&self) -> Vec<Document> {
        let urls = self.fetch_manifest().await;
        if urls.is_empty() {
            tracing::warn!("no document URLs found");
            return Vec::new();
        }

        let selected = cap_urls(&urls, self.config.max_documents);
        tracing::info!(
            selected = selected.len(),
            available = urls.len(),
            strategy = ?self.config.strategy,
            "loading documents"
        );

        let documents = self.load_urls(selected).await;
        tracing::info!(loaded = documents.len(), "documents loaded");
        documents
    }
}

/// Parse every `*.txt` file directly inside `dir`, sorted by file name.
///
/// The document id is the file stem and the source is the file path.
/// Unreadable files are logged and skipped.
pub fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        bail!("Statute folder does not exist: {}", dir.display());
    }

    let mut documents = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(text) => {
                let source = path.display().to_string();
                documents.push(parse_document_with_id(
                    kanun_no_from_path(path),
                    &source,
                    &text,
                ));
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping file"),
        }
    }

    tracing::info!(count = documents.len(), dir = %dir.display(), "statute files processed");
    Ok(documents)
}
