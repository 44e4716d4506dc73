//! # Kanun QA
//!
//! Semantic question answering over Turkish statutes (kanunlar).
//!
//! Statute texts are fetched from a remote manifest (or read from a local
//! folder), split into numbered articles, embedded with a multilingual
//! sentence-embedding model, and served through an HTTP API that ranks
//! articles by cosine similarity to a question.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────────┐
//! │ Manifest │──▶│  Extract   │──▶│  Chunk   │──▶│ Embed + Rank │
//! │ / folder │   │ Madde N:   │   │ 1/article│   │  in memory   │
//! └──────────┘   └───────────┘   └────┬─────┘   └──────┬───────┘
//!                                     │                │
//!                                     ▼                ▼
//!                              ┌────────────┐    ┌──────────┐
//!                              │ JSON dumps │    │   HTTP   │
//!                              │ → Pinecone │    │   API    │
//!                              └────────────┘    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Article, title and date extraction |
//! | [`loader`] | Manifest and local-folder loading |
//! | [`chunk`] | One chunk per article |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`search`] | Cosine-similarity ranking |
//! | [`vector_store`] | Pinecone upload and query |
//! | [`dump`] | JSON hand-off files |
//! | [`service`] | Query service state |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command bodies |

pub mod chunk;
pub mod commands;
pub mod config;
pub mod dump;
pub mod embedding;
pub mod extract;
pub mod loader;
pub mod models;
pub mod search;
pub mod server;
pub mod service;
pub mod vector_store;
