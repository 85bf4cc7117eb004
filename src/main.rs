//! # Carrel CLI
//!
//! The `carrel` binary drives the ingestion and retrieval pipeline from the
//! command line. The upload transport and user identity are supplied
//! directly: a file path or URL, and a `--user` id treated as an opaque
//! filter key.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `carrel init` | Create the vector collection if absent |
//! | `carrel add <file-or-url> --user <id>` | Ingest one source |
//! | `carrel ask "<question>" --user <id>` | Answer a question from the user's corpus |
//! | `carrel purge --user <id>` | Delete the user's whole corpus |
//! | `carrel status` | Show collection point counts |

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use carrel::config::Config;
use carrel::embedding::OpenAiEmbedder;
use carrel::extract::{FileKind, Source};
use carrel::index::{purge_user, QdrantIndex, VectorIndex};
use carrel::llm::OpenAiCompletion;
use carrel::models::ChatTurn;
use carrel::{ingest, rag};

/// Carrel — ask questions over your own documents.
#[derive(Parser)]
#[command(
    name = "carrel",
    about = "Ask questions over your own documents",
    version,
    long_about = "Carrel ingests PDFs, CSVs, plain text, web pages, and YouTube videos \
    into a per-user-isolated vector index, and answers natural-language questions \
    grounded in the owning user's corpus."
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file falls back to defaults.
    #[arg(long, global = true, default_value = "./config/carrel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector collection if it does not exist.
    ///
    /// Idempotent — safe to run on every startup.
    Init,

    /// Ingest one source: a PDF/CSV/TXT file, a web page URL, or a YouTube URL.
    Add {
        /// File path or URL.
        source: String,

        /// Owning user id; every stored chunk is stamped with it.
        #[arg(long)]
        user: String,

        /// Override the file-type detection (pdf, csv, txt).
        #[arg(long)]
        kind: Option<String>,
    },

    /// Ask a question answered from the user's own corpus.
    Ask {
        /// The question.
        question: String,

        /// User id whose corpus is searched.
        #[arg(long)]
        user: String,

        /// JSON file with prior conversation turns
        /// (`[{"role":"user","content":"..."}]`).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Number of chunks retrieved for grounding.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Delete every stored chunk belonging to a user.
    Purge {
        #[arg(long)]
        user: String,
    },

    /// Show collection point counts.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let index = QdrantIndex::new(&config.index)?;
            index.ensure_collection(config.embedding.dims).await?;
            let info = index.collection_info().await?;
            println!("init {}", config.index.collection);
            println!("  dimensions: {}", config.embedding.dims);
            println!("  points: {}", info.points_count);
            println!("ok");
        }

        Commands::Add { source, user, kind } => {
            let embedder = OpenAiEmbedder::new(&config.embedding)?;
            let index = QdrantIndex::new(&config.index)?;
            index.ensure_collection(config.embedding.dims).await?;

            let source = resolve_source(&source, kind.as_deref())?;
            let count = ingest::ingest(&config, &embedder, &index, &source, &user).await?;

            println!("add");
            println!("  user: {}", user);
            println!("  chunks stored: {}", count);
            println!("ok");
        }

        Commands::Ask {
            question,
            user,
            history,
            top_k,
        } => {
            let embedder = OpenAiEmbedder::new(&config.embedding)?;
            let index = QdrantIndex::new(&config.index)?;
            let llm = OpenAiCompletion::new(&config.llm)?;

            let history = load_history(history.as_deref())?;
            let k = top_k.unwrap_or(config.llm.top_k);

            let result =
                rag::answer(&embedder, &index, &llm, &question, &history, &user, k).await?;

            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!("\nSources:");
                for source in &result.sources {
                    let mut line = format!("  [{}] {}", source.kind, source.name);
                    if let Some(page) = source.page {
                        line.push_str(&format!(" (page {page})"));
                    }
                    if let Some(video_id) = &source.video_id {
                        line.push_str(&format!(" (video {video_id})"));
                    }
                    println!("{line}");
                }
            }
        }

        Commands::Purge { user } => {
            let index = QdrantIndex::new(&config.index)?;
            let deleted = purge_user(&index, &user).await?;
            println!("purge");
            println!("  user: {}", user);
            println!("  points deleted: {}", deleted);
            println!("ok");
        }

        Commands::Status => {
            let index = QdrantIndex::new(&config.index)?;
            let info = index.collection_info().await?;
            println!("status {}", config.index.collection);
            println!("  points: {}", info.points_count);
        }
    }

    Ok(())
}

/// Turn the CLI argument into a pipeline source: URLs pass through, file
/// paths get a kind from the override or the extension.
fn resolve_source(raw: &str, kind_override: Option<&str>) -> Result<Source> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(Source::Url(raw.to_string()));
    }

    let path = PathBuf::from(raw);
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    let kind = match kind_override {
        Some("pdf") => FileKind::Pdf,
        Some("csv") => FileKind::Csv,
        Some("txt") => FileKind::Txt,
        Some(other) => bail!("Unknown kind '{}'. Use pdf, csv, or txt.", other),
        None => FileKind::from_extension(&path).ok_or_else(|| {
            anyhow::anyhow!(
                "Cannot infer file type of {}; pass --kind pdf|csv|txt",
                path.display()
            )
        })?,
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| raw.to_string());

    Ok(Source::File {
        path,
        filename,
        kind,
    })
}

fn load_history(path: Option<&std::path::Path>) -> Result<Vec<ChatTurn>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history file: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse history file: {}", path.display()))
        }
        None => Ok(Vec::new()),
    }
}
