//! CLI command implementations.
//!
//! Each `run_*` function backs one `kanun` subcommand. Progress is logged
//! through `tracing`; the command's result is printed to stdout.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunk::build_chunks;
use crate::config::{Config, LoadStrategy};
use crate::dump::{load_chunks, load_documents, save_chunks, save_documents};
use crate::embedding::{create_embedder, Embedder};
use crate::loader::{load_directory, Loader};
use crate::models::{gazette_date, Document, SearchResult};
use crate::service::KanunService;
use crate::vector_store::{api_key_from_env, search_store, upload_chunks, PineconeStore};

/// Characters of chunk text shown per result.
const EXCERPT_CHARS: usize = 200;

/// `kanun load`: fetch the manifest, parse every document, and write both
/// JSON dumps.
pub async fn run_load(
    config: &Config,
    max: Option<usize>,
    strategy: Option<LoadStrategy>,
) -> Result<()> {
    let mut source = config.source.clone();
    if let Some(max) = max {
        source.max_documents = max;
    }
    if let Some(strategy) = strategy {
        source.strategy = strategy;
    }

    let loader = Loader::new(source)?;
    let documents = loader.load_all().await;
    write_dumps(config, &documents)
}

/// `kanun process <dir>`: parse local `*.txt` statute files and write both
/// JSON dumps.
pub fn run_process(config: &Config, dir: &Path) -> Result<()> {
    let documents = load_directory(dir)?;
    write_dumps(config, &documents)
}

fn write_dumps(config: &Config, documents: &[Document]) -> Result<()> {
    let chunks = build_chunks(documents);
    save_documents(&config.dump.documents_path, documents)?;
    save_chunks(&config.dump.chunks_path, &chunks)?;

    let articles: usize = documents.iter().map(|d| d.articles.len()).sum();
    let provisional: usize = documents.iter().map(|d| d.provisional_articles.len()).sum();

    println!("load");
    println!("  documents: {}", documents.len());
    println!("  articles: {}", articles);
    println!("  provisional articles: {}", provisional);
    println!("  chunks: {}", chunks.len());
    println!("  documents file: {}", config.dump.documents_path.display());
    println!("  chunks file: {}", config.dump.chunks_path.display());
    Ok(())
}

/// `kanun ask "<question>"`: answer from the documents dump with in-memory
/// ranking.
pub async fn run_ask(config: &Config, question: &str, limit: Option<usize>) -> Result<()> {
    let documents = load_documents(&config.dump.documents_path)
        .context("No documents dump found; run `kanun load` first")?;
    if !config.embedding.is_enabled() {
        println!("Embedding model disabled; no answers.");
        return Ok(());
    }
    let embedder = create_embedder(&config.embedding).await?;

    let service = KanunService::build(
        documents,
        embedder,
        config.retrieval.clone(),
        config.embedding.batch_size,
    )
    .await;

    let results = service.ask(question, limit).await?;
    print_results(&results);
    Ok(())
}

async fn require_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match create_embedder(&config.embedding).await? {
        Some(embedder) => Ok(embedder),
        None => bail!("The vector store requires an embedding provider; embedding.provider is disabled"),
    }
}

/// `kanun upload`: embed the chunks dump and upsert it into Pinecone.
pub async fn run_upload(config: &Config, chunks_path: Option<PathBuf>) -> Result<()> {
    let api_key = api_key_from_env()?;
    let path = chunks_path.unwrap_or_else(|| config.dump.chunks_path.clone());
    let chunks = load_chunks(&path)?;
    if chunks.is_empty() {
        println!("upload");
        println!("  no chunks in {}", path.display());
        return Ok(());
    }

    let embedder = require_embedder(config).await?;
    let store = PineconeStore::connect(&config.vector_store, api_key).await?;
    let uploaded = upload_chunks(
        &store,
        embedder.as_ref(),
        &chunks,
        config.vector_store.batch_size,
        config.vector_store.metadata_text_limit,
    )
    .await?;

    println!("upload");
    println!("  index: {}", store.index_name());
    println!("  chunks: {}", chunks.len());
    println!("  uploaded: {}", uploaded);
    Ok(())
}

/// `kanun query "<question>"`: ask the Pinecone index directly.
pub async fn run_query(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let api_key = api_key_from_env()?;
    let embedder = require_embedder(config).await?;
    let store = PineconeStore::connect(&config.vector_store, api_key).await?;

    let top_k = top_k.unwrap_or(config.retrieval.max_results);
    let matches = search_store(&store, embedder.as_ref(), question, top_k).await?;
    let results: Vec<SearchResult> = matches
        .into_iter()
        .map(|m| m.into_search_result())
        .collect();
    print_results(&results);
    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} / {}",
            i + 1,
            result.similarity_score,
            result.title,
            result.article
        );
        println!("    kanun_no: {}", result.document_id);
        if let Some(date) = result.publication_date {
            println!("    yayim_tarihi: {}", date.format(gazette_date::FORMAT));
        }
        if let Some(ref url) = result.source_url {
            println!("    url: {}", url);
        }
        let excerpt: String = result.text.chars().take(EXCERPT_CHARS).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!();
    }
}
