//! # Kanun QA CLI (`kanun`)
//!
//! ## Usage
//!
//! ```bash
//! kanun --config ./config/kanun.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kanun serve` | Load statutes from the manifest and start the HTTP API |
//! | `kanun load` | Fetch statutes and write `kanunlar.json` / `kanun_chunks.json` |
//! | `kanun process <dir>` | Same as `load`, from local `*.txt` files |
//! | `kanun ask "<question>"` | Answer from the documents dump |
//! | `kanun upload` | Embed the chunks dump and upsert it into Pinecone |
//! | `kanun query "<question>"` | Ask the Pinecone index |
//!
//! ## Examples
//!
//! ```bash
//! # Fetch the first 20 statutes one at a time
//! kanun load --max 20 --strategy sequential
//!
//! # Ask offline against the dump
//! kanun ask "Hırsızlık suçunun cezası nedir?" --limit 3
//!
//! # Serve on a different port
//! PORT=9000 kanun serve
//! ```
//!
//! Log verbosity is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kanun_qa::commands;
use kanun_qa::config::{self, LoadStrategy};
use kanun_qa::server;

/// Kanun QA: semantic question answering over Turkish statutes.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kanun.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kanun",
    about = "Kanun QA: semantic question answering over Turkish statutes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kanun.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/kanun.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the corpus and start the HTTP API.
    ///
    /// Binds to `[server].bind`; the `PORT` environment variable replaces
    /// its port.
    Serve,

    /// Fetch statutes from the manifest and write the JSON dumps.
    Load {
        /// Maximum number of manifest entries to load (0 = all).
        #[arg(long)]
        max: Option<usize>,

        /// Loading strategy: `sequential` or `concurrent`.
        #[arg(long)]
        strategy: Option<LoadStrategy>,
    },

    /// Parse local `*.txt` statute files and write the JSON dumps.
    Process {
        /// Folder containing one `<kanun_no>.txt` file per statute.
        dir: PathBuf,
    },

    /// Answer a question from the documents dump.
    Ask {
        question: String,

        /// Maximum number of answers.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Embed the chunks dump and upsert it into the Pinecone index.
    ///
    /// Requires `PINECONE_API_KEY`.
    Upload {
        /// Chunks dump to upload (defaults to `[dump].chunks_path`).
        #[arg(long)]
        chunks: Option<PathBuf>,
    },

    /// Ask the Pinecone index directly.
    ///
    /// Requires `PINECONE_API_KEY`.
    Query {
        question: String,

        /// Number of matches to return.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Load { max, strategy } => {
            commands::run_load(&cfg, max, strategy).await?;
        }
        Commands::Process { dir } => {
            commands::run_process(&cfg, &dir)?;
        }
        Commands::Ask { question, limit } => {
            commands::run_ask(&cfg, &question, limit).await?;
        }
        Commands::Upload { chunks } => {
            commands::run_upload(&cfg, chunks).await?;
        }
        Commands::Query { question, top_k } => {
            commands::run_query(&cfg, &question, top_k).await?;
        }
    }

    Ok(())
}
