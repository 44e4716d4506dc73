//! JSON hand-off artifacts between pipeline stages.
//!
//! The extraction stage writes the parsed documents (`kanunlar.json`) and
//! the flattened chunk list (`kanun_chunks.json`); the vector-store upload
//! stage and the offline `ask` command read them back. Files are
//! pretty-printed UTF-8 without ASCII escaping.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::chunk::text_hash;
use crate::models::{Chunk, Document};

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn save_documents(path: &Path, documents: &[Document]) -> Result<()> {
    write_json(path, documents)?;
    tracing::info!(count = documents.len(), path = %path.display(), "documents saved");
    Ok(())
}

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    read_json(path)
}

pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    write_json(path, chunks)?;
    tracing::info!(count = chunks.len(), path = %path.display(), "chunks saved");
    Ok(())
}

pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let mut chunks: Vec<Chunk> = read_json(path)?;
    for chunk in chunks.iter_mut().filter(|c| c.hash.is_empty()) {
        chunk.hash = text_hash(&chunk.text);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::build_chunks;
    use crate::extract::parse_document;
    use crate::models::ArticleRef;

    #[test]
    fn test_chunk_dump_keeps_wire_names_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("kanun_chunks.json");
        let doc = parse_document(
            "https://example.com/5237.txt",
            "Türk Ceza Kanunu\nYayımlandığı Resmî Gazete Tarihi: 12.10.2004\nMadde 1: Amaç.\nGeçici Madde 2: Geçiş.",
        );
        let chunks = build_chunks(&[doc]);
        save_chunks(&path, &chunks).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"madde_no\": \"Geçici 2\""));
        assert!(raw.contains("\"yayim_tarihi\": \"12.10.2004\""));

        let reloaded = load_chunks(&path).unwrap();
        assert_eq!(reloaded, chunks);
        assert_eq!(reloaded[1].article, ArticleRef::provisional(2));
    }

    #[test]
    fn test_document_dump_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kanunlar.json");
        let doc = parse_document("https://example.com/1.txt", "Başlık\nMadde 1: x");
        save_documents(&path, std::slice::from_ref(&doc)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["kanun_no"], "1");
        assert_eq!(value[0]["maddeler"][0]["icerik"], "x");
        assert!(value[0]["yayim_tarihi"].is_null());
        assert_eq!(load_documents(&path).unwrap(), vec![doc]);
    }

    #[test]
    fn test_chunks_without_hash_get_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kanun_chunks.json");
        let raw = serde_json::json!([{
            "id": "5237_madde_1",
            "text": "Kanun: Türk Ceza Kanunu\nMadde 1: Amaç.",
            "kanun_no": "5237",
            "baslik": "Türk Ceza Kanunu",
            "madde_no": 1,
            "yayim_tarihi": "12.10.2004",
            "gist_url": "https://example.com/5237.txt"
        }]);
        std::fs::write(&path, raw.to_string()).unwrap();

        let chunks = load_chunks(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].hash, text_hash(&chunks[0].text));
        assert_eq!(chunks[0].hash.len(), 64);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_chunks(&dir.path().join("absent.json")).is_err());
    }
}
