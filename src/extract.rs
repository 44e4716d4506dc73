//! Article extraction from raw statute text.
//!
//! A statute document is plain text whose first line is the title. Its body
//! contains `Madde N:` sections (ordinary articles) and `Geçici Madde N:`
//! sections (provisional articles), plus an optional publication-date label.
//!
//! Extraction is a single left-to-right scan over section markers. Each
//! marker opens a section whose body runs until the next marker of either
//! kind, or the end of the text. A `Madde` that belongs to `Geçici Madde`
//! is always part of the provisional marker.
//!
//! The extractor trusts the source formatting: article numbers are not
//! checked for uniqueness or order.

use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::{gazette_date, Article, ArticleKind, Document};

/// Title used when the first line of a document is empty.
pub const UNKNOWN_TITLE: &str = "Bilinmeyen Kanun";

/// `Madde 12:` or `Geçici Madde 3:`; group 1 is present for provisional markers.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(Geçici)\s+)?Madde\s+([0-9]+):").expect("valid regex")
});

static PUBLICATION_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Yayımlandığı Resmî Gazete Tarihi: ([0-9]{2}\.[0-9]{2}\.[0-9]{4})")
        .expect("valid regex")
});

/// Ordinary and provisional articles of one document, each in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArticles {
    pub articles: Vec<Article>,
    pub provisional: Vec<Article>,
}

/// A section marker located in the source text.
struct Marker {
    kind: ArticleKind,
    number: Option<u32>,
    start: usize,
    end: usize,
}

fn scan_markers(text: &str) -> Vec<Marker> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = if caps.get(1).is_some() {
                ArticleKind::Provisional
            } else {
                ArticleKind::Ordinary
            };
            // Leading zeros are accepted; numbers beyond u32 still bound the
            // previous section but produce no article of their own.
            let number = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            Some(Marker {
                kind,
                number,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Split statute text into ordinary and provisional articles.
///
/// Bodies are trimmed and empty bodies are dropped. Text without any marker
/// yields two empty lists.
pub fn extract_articles(text: &str) -> ExtractedArticles {
    let markers = scan_markers(text);
    let mut out = ExtractedArticles::default();

    for (i, marker) in markers.iter().enumerate() {
        let body_end = markers.get(i + 1).map(|m| m.start).unwrap_or(text.len());
        let body = text[marker.end..body_end].trim();
        let Some(number) = marker.number else {
            continue;
        };
        if body.is_empty() {
            continue;
        }
        let article = Article::new(number, body);
        match marker.kind {
            ArticleKind::Ordinary => out.articles.push(article),
            ArticleKind::Provisional => out.provisional.push(article),
        }
    }

    out
}

/// First line of the text, trimmed, or [`UNKNOWN_TITLE`] when it is empty.
pub fn extract_title(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        first.to_string()
    }
}

/// Publication date from the `Yayımlandığı Resmî Gazete Tarihi: DD.MM.YYYY` label.
///
/// Returns `None` when the label is missing or the date is not a real
/// calendar date.
pub fn extract_publication_date(text: &str) -> Option<NaiveDate> {
    let caps = PUBLICATION_DATE.captures(text)?;
    let raw = caps.get(1)?.as_str();
    match NaiveDate::parse_from_str(raw, gazette_date::FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(date = raw, error = %e, "ignoring invalid publication date");
            None
        }
    }
}

/// Document id from a source URL: the last path segment without `.txt`.
pub fn kanun_no_from_url(url: &str) -> String {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let filename = path.rsplit('/').next().unwrap_or(&path);
    filename
        .strip_suffix(".txt")
        .unwrap_or(filename)
        .to_string()
}

/// Document id from a local file path: the file stem.
pub fn kanun_no_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Parse raw text fetched from `url` into a [`Document`].
pub fn parse_document(url: &str, text: &str) -> Document {
    parse_document_with_id(kanun_no_from_url(url), url, text)
}

/// Parse raw text into a [`Document`] with an explicit id.
pub fn parse_document_with_id(id: String, source: &str, text: &str) -> Document {
    let ExtractedArticles {
        articles,
        provisional,
    } = extract_articles(text);

    Document {
        id,
        title: extract_title(text),
        publication_date: extract_publication_date(text),
        articles,
        provisional_articles: provisional,
        raw_text: text.to_string(),
        source_url: source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_example_document() {
        let text = "Örnek Kanun\nMadde 1: Birinci madde.\nMadde 2: İkinci madde.\nGeçici Madde 1: Geçici hüküm.";
        let out = extract_articles(text);
        assert_eq!(
            out.articles,
            vec![
                Article::new(1, "Birinci madde."),
                Article::new(2, "İkinci madde.")
            ]
        );
        assert_eq!(out.provisional, vec![Article::new(1, "Geçici hüküm.")]);
    }

    #[test]
    fn test_leading_zeros_normalized() {
        let out = extract_articles("Madde 0001: Bir.\nMadde 0010: On.");
        let numbers: Vec<u32> = out.articles.iter().map(|a| a.number).collect();
        assert_eq!(numbers, vec![1, 10]);
    }

    #[test]
    fn test_no_markers_is_empty() {
        let out = extract_articles("Sadece başlık\nHiç madde yok.");
        assert!(out.articles.is_empty());
        assert!(out.provisional.is_empty());
        assert_eq!(extract_articles(""), ExtractedArticles::default());
    }

    #[test]
    fn test_bodies_trimmed_and_multiline() {
        let text = "Kanun\nMadde 1:\n\n  Birinci fıkra.\n  İkinci fıkra.  \n\nMadde 2: Son.";
        let out = extract_articles(text);
        assert_eq!(out.articles[0].body, "Birinci fıkra.\n  İkinci fıkra.");
        assert_eq!(out.articles[1].body, "Son.");
    }

    #[test]
    fn test_empty_body_dropped() {
        let out = extract_articles("Madde 1:   \nMadde 2: Dolu.");
        assert_eq!(out.articles, vec![Article::new(2, "Dolu.")]);
    }

    #[test]
    fn test_duplicates_and_order_pass_through() {
        let out = extract_articles("Madde 5: a\nMadde 3: b\nMadde 5: c");
        let numbers: Vec<u32> = out.articles.iter().map(|a| a.number).collect();
        assert_eq!(numbers, vec![5, 3, 5]);
    }

    #[test]
    fn test_provisional_before_ordinary_bounds_body() {
        let out = extract_articles("Geçici Madde 1: Önce.\nMadde 4: Sonra.");
        assert_eq!(out.provisional, vec![Article::new(1, "Önce.")]);
        assert_eq!(out.articles, vec![Article::new(4, "Sonra.")]);
    }

    #[test]
    fn test_marker_whitespace_variants() {
        let out = extract_articles("Geçici\tMadde\n 2: x\nMadde   7: y");
        assert_eq!(out.provisional, vec![Article::new(2, "x")]);
        assert_eq!(out.articles, vec![Article::new(7, "y")]);
    }

    #[test]
    fn test_overflowing_number_still_bounds() {
        let out = extract_articles("Madde 1: kısa\nMadde 99999999999: taşan");
        assert_eq!(out.articles, vec![Article::new(1, "kısa")]);
    }

    #[test]
    fn test_title() {
        assert_eq!(extract_title("  Türk Medeni Kanunu \nMadde 1: x"), "Türk Medeni Kanunu");
        assert_eq!(extract_title(""), UNKNOWN_TITLE);
        assert_eq!(extract_title("\nMadde 1: x"), UNKNOWN_TITLE);
    }

    #[test]
    fn test_publication_date() {
        let text = "Kanun\nYayımlandığı Resmî Gazete Tarihi: 08.12.1926\nMadde 1: x";
        assert_eq!(
            extract_publication_date(text),
            NaiveDate::from_ymd_opt(1926, 12, 8)
        );
        assert_eq!(extract_publication_date("Kanun\nMadde 1: x"), None);
        assert_eq!(
            extract_publication_date("Yayımlandığı Resmî Gazete Tarihi: 31.02.2020"),
            None
        );
    }

    #[test]
    fn test_kanun_no_from_url() {
        assert_eq!(
            kanun_no_from_url("https://gist.githubusercontent.com/u/abc/raw/def/5237.txt"),
            "5237"
        );
        assert_eq!(kanun_no_from_url("https://example.com/a/b/noext"), "noext");
        assert_eq!(kanun_no_from_url("relative/path/743.txt"), "743");
    }

    #[test]
    fn test_parse_document() {
        let url = "https://example.com/raw/4721.txt";
        let text = "Türk Medeni Kanunu\nYayımlandığı Resmî Gazete Tarihi: 08.12.2001\nMadde 1: Kanun, sözüyle ve özüyle değindiği bütün konularda uygulanır.";
        let doc = parse_document(url, text);
        assert_eq!(doc.id, "4721");
        assert_eq!(doc.title, "Türk Medeni Kanunu");
        assert_eq!(doc.publication_date, NaiveDate::from_ymd_opt(2001, 12, 8));
        assert_eq!(doc.articles.len(), 1);
        assert!(doc.provisional_articles.is_empty());
        assert_eq!(doc.source_url, url);
        assert_eq!(doc.raw_text, text);
    }
}
