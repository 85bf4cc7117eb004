//! # Carrel
//!
//! Ask questions over your own documents. Carrel ingests heterogeneous
//! sources — PDFs, CSVs, plain text, web pages, YouTube videos — into a
//! shared vector index with per-user isolation, and answers natural-language
//! questions grounded in the owning user's corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌───────────┐
//! │  Extractor    │──▶│  Chunk + Embed    │──▶│  Qdrant   │
//! │ pdf/csv/txt/  │   │  4000/800 windows │   │ user_id-  │
//! │ web/youtube   │   │  3072-dim vectors │   │ filtered  │
//! └──────────────┘   └───────────────────┘   └────┬──────┘
//!                                                 │
//!                       ┌─────────────────────────┤
//!                       ▼                         ▼
//!                 ┌──────────┐             ┌────────────┐
//!                 │ Retrieve │────────────▶│  Compose + │
//!                 │  top-k   │             │  Generate  │
//!                 └──────────┘             └────────────┘
//! ```
//!
//! Extraction carries fallbacks for awkward sources: OCR for scanned PDFs,
//! caption-scrape then audio transcription for videos. Every stored chunk is
//! stamped with its owning user's id, and the payload filter on that id is
//! the sole multi-tenancy boundary in the data plane.
//!
//! ## Quick Start
//!
//! ```bash
//! carrel init                                    # create the collection
//! carrel add report.pdf --user alice             # ingest a file
//! carrel add https://youtu.be/dQw4w9WgXcQ --user alice
//! carrel ask "what does the report conclude?" --user alice
//! carrel purge --user alice                      # delete alice's corpus
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-source-type extraction with fallbacks |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding service boundary |
//! | [`index`] | Vector index contract and Qdrant client |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`retrieve`] | Tenant-filtered similarity retrieval |
//! | [`prompt`] | Policy-driven prompt composition |
//! | [`llm`] | Language-model boundary |
//! | [`rag`] | Question answering + source citation |
//! | [`error`] | Stage-qualified error taxonomy |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod retrieve;
