//! Article-level chunk builder.
//!
//! Flattens every loaded [`Document`] into one [`Chunk`] per article,
//! ordinary articles first, then provisional ones, each in source order.
//!
//! Chunk ids are derived from the document id, the article kind, and the
//! article number (`4721_madde_3`, `4721_gecici_1`). A repeated
//! (kind, number) pair inside one document gets an occurrence suffix
//! (`4721_madde_3_2`) so ids stay unique and deterministic. Each chunk also
//! carries a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::{Article, ArticleKind, ArticleRef, Chunk, Document};

/// Build the full chunk corpus for a set of documents.
///
/// Pure function of its input; rerun whenever the document set changes.
pub fn build_chunks(documents: &[Document]) -> Vec<Chunk> {
    documents.iter().flat_map(document_chunks).collect()
}

/// Chunks for a single document.
pub fn document_chunks(doc: &Document) -> Vec<Chunk> {
    let mut seen: HashMap<ArticleRef, u32> = HashMap::new();
    let ordinary = doc
        .articles
        .iter()
        .map(|a| (ArticleKind::Ordinary, a));
    let provisional = doc
        .provisional_articles
        .iter()
        .map(|a| (ArticleKind::Provisional, a));

    ordinary
        .chain(provisional)
        .map(|(kind, article)| {
            let article_ref = ArticleRef {
                kind,
                number: article.number,
            };
            let occurrence = seen.entry(article_ref).or_insert(0);
            *occurrence += 1;
            make_chunk(doc, article_ref, article, *occurrence)
        })
        .collect()
}

/// Deterministic chunk id; `occurrence` is 1 for the first article with a
/// given kind and number.
pub fn chunk_id(document_id: &str, article: ArticleRef, occurrence: u32) -> String {
    let base = format!(
        "{}_{}_{}",
        document_id,
        article.kind.id_segment(),
        article.number
    );
    if occurrence > 1 {
        format!("{}_{}", base, occurrence)
    } else {
        base
    }
}

/// Text submitted to the embedding model for one article.
pub fn chunk_text(title: &str, article: ArticleRef, body: &str) -> String {
    format!("Kanun: {}\n{}: {}", title, article, body)
}

/// Hex SHA-256 of chunk text.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(doc: &Document, article_ref: ArticleRef, article: &Article, occurrence: u32) -> Chunk {
    let text = chunk_text(&doc.title, article_ref, &article.body);
    let hash = text_hash(&text);

    Chunk {
        id: chunk_id(&doc.id, article_ref, occurrence),
        text,
        document_id: doc.id.clone(),
        title: doc.title.clone(),
        article: article_ref,
        publication_date: doc.publication_date,
        source_url: Some(doc.source_url.clone()),
        hash,
    }
}
