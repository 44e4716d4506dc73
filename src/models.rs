//! Core data models used throughout Kanun QA.
//!
//! These types represent the documents, articles, chunks, and search results
//! that flow through the extraction and retrieval pipeline. Rust field names
//! are English; the JSON wire names follow the API contract (`kanun_no`,
//! `baslik`, `madde_no`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single numbered article (madde) of a statute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "madde_no")]
    pub number: u32,
    #[serde(rename = "icerik")]
    pub body: String,
}

impl Article {
    pub fn new(number: u32, body: impl Into<String>) -> Self {
        Self {
            number,
            body: body.into(),
        }
    }
}

/// Whether an article is an ordinary `Madde` or a provisional `Geçici Madde`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleKind {
    Ordinary,
    Provisional,
}

impl ArticleKind {
    /// Segment used inside chunk identifiers.
    pub fn id_segment(self) -> &'static str {
        match self {
            ArticleKind::Ordinary => "madde",
            ArticleKind::Provisional => "gecici",
        }
    }

    /// Marker text as it appears in statute documents.
    pub fn marker(self) -> &'static str {
        match self {
            ArticleKind::Ordinary => "Madde",
            ArticleKind::Provisional => "Geçici Madde",
        }
    }
}

/// Reference to an article within a document: its kind plus its number.
///
/// On the wire an ordinary article is the bare integer (`3`) and a
/// provisional one is the label `"Geçici 3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArticleRef {
    pub kind: ArticleKind,
    pub number: u32,
}

impl ArticleRef {
    pub fn ordinary(number: u32) -> Self {
        Self {
            kind: ArticleKind::Ordinary,
            number,
        }
    }

    pub fn provisional(number: u32) -> Self {
        Self {
            kind: ArticleKind::Provisional,
            number,
        }
    }
}

impl fmt::Display for ArticleRef {
    /// Formats as the source marker, e.g. `Madde 3` or `Geçici Madde 3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.number)
    }
}

const PROVISIONAL_LABEL: &str = "Geçici";

impl FromStr for ArticleRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, digits) = match s.strip_prefix(PROVISIONAL_LABEL) {
            Some(rest) => (ArticleKind::Provisional, rest.trim()),
            None => (ArticleKind::Ordinary, s),
        };
        let number = digits
            .parse::<u32>()
            .map_err(|_| format!("invalid article reference: '{}'", s))?;
        Ok(Self { kind, number })
    }
}

impl Serialize for ArticleRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.kind {
            ArticleKind::Ordinary => serializer.serialize_u32(self.number),
            ArticleKind::Provisional => {
                serializer.serialize_str(&format!("{} {}", PROVISIONAL_LABEL, self.number))
            }
        }
    }
}

impl<'de> Deserialize<'de> for ArticleRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Vector stores hand numeric metadata back as floats.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(u32),
            Float(f64),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Integer(n) => Ok(ArticleRef::ordinary(n)),
            Raw::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
                Ok(ArticleRef::ordinary(f as u32))
            }
            Raw::Float(f) => Err(serde::de::Error::custom(format!(
                "invalid article number: {}",
                f
            ))),
            Raw::Label(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A parsed statute document.
///
/// Created by the loader from raw text and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Derived from the source filename (without `.txt`).
    #[serde(rename = "kanun_no")]
    pub id: String,
    /// First line of the raw text.
    #[serde(rename = "baslik")]
    pub title: String,
    /// Resmî Gazete publication date, if the label was present.
    #[serde(rename = "yayim_tarihi", default, with = "gazette_date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "maddeler")]
    pub articles: Vec<Article>,
    #[serde(rename = "gecici_maddeler", default)]
    pub provisional_articles: Vec<Article>,
    #[serde(rename = "full_content")]
    pub raw_text: String,
    /// URL (or local path) the text was read from.
    #[serde(rename = "gist_url")]
    pub source_url: String,
}

impl Document {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            publication_date: self.publication_date,
            article_count: self.articles.len(),
            provisional_article_count: self.provisional_articles.len(),
        }
    }
}

/// Lightweight listing entry for `GET /kanunlar`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    #[serde(rename = "kanun_no")]
    pub id: String,
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "yayim_tarihi", with = "gazette_date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "madde_sayisi")]
    pub article_count: usize,
    #[serde(rename = "gecici_madde_sayisi")]
    pub provisional_article_count: usize,
}

/// One independently retrievable article plus a copy of its document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// `"Kanun: {title}\n{marker} {n}: {body}"`.
    pub text: String,
    #[serde(rename = "kanun_no")]
    pub document_id: String,
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "madde_no")]
    pub article: ArticleRef,
    #[serde(rename = "yayim_tarihi", default, with = "gazette_date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "gist_url", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// SHA-256 of `text`. Dumps without it get it recomputed on load.
    #[serde(default)]
    pub hash: String,
}

/// A ranked answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "kanun_no")]
    pub document_id: String,
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "madde_no")]
    pub article: ArticleRef,
    #[serde(rename = "yayim_tarihi", with = "gazette_date")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "gist_url", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub text: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity_score: f32,
}

impl SearchResult {
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            document_id: chunk.document_id.clone(),
            title: chunk.title.clone(),
            article: chunk.article,
            publication_date: chunk.publication_date,
            source_url: chunk.source_url.clone(),
            text: chunk.text.clone(),
            similarity_score,
        }
    }
}

/// Serde adapter for `Option<NaiveDate>` in the Resmî Gazete `DD.MM.YYYY` format.
pub mod gazette_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
