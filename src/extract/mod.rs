//! Multi-source text extraction.
//!
//! Converts a raw source — an uploaded file or a URL — into plain text units
//! with provenance metadata. Each source type has its own strategy, and the
//! expensive ones carry fallbacks: OCR for sparse-text PDFs, and
//! caption-scrape then audio-transcription for videos.
//!
//! Extraction failures abort the whole ingestion for that source; no partial
//! document is ever stored.

pub mod csv_file;
pub mod pdf;
pub mod text;
pub mod web;
pub mod youtube;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::models::{DocMeta, SourceKind, TextUnit};

/// A source handed to the pipeline by the upload transport: file bytes on
/// disk plus the original filename, or a URL string.
#[derive(Debug, Clone)]
pub enum Source {
    File {
        path: PathBuf,
        filename: String,
        kind: FileKind,
    },
    Url(String),
}

/// Uploadable file types. The transport is responsible for allow-listing;
/// this is only used to pick the extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Csv,
    Txt,
}

impl FileKind {
    pub fn from_extension(path: &Path) -> Option<FileKind> {
        match path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("pdf") => Some(FileKind::Pdf),
            Some("csv") => Some(FileKind::Csv),
            Some("txt") | Some("md") | Some("text") => Some(FileKind::Txt),
            _ => None,
        }
    }

    fn source_kind(self) -> SourceKind {
        match self {
            FileKind::Pdf => SourceKind::Pdf,
            FileKind::Csv => SourceKind::Csv,
            FileKind::Txt => SourceKind::Txt,
        }
    }
}

/// Extract text units from a source for one owning user.
///
/// Every returned unit carries the user id, source identifier, and source
/// type; PDF units additionally carry their page number, video units their
/// video id.
pub async fn extract(
    config: &ExtractConfig,
    source: &Source,
    user_id: &str,
) -> Result<Vec<TextUnit>, ExtractError> {
    match source {
        Source::File {
            path,
            filename,
            kind,
        } => {
            let mut meta = DocMeta::new(user_id, kind.source_kind(), filename);
            meta.filename = Some(filename.clone());
            match kind {
                FileKind::Pdf => pdf::extract_pdf(config, path, &meta).await,
                FileKind::Csv => csv_file::extract_csv(path, &meta),
                FileKind::Txt => text::extract_text(path, &meta),
            }
        }
        Source::Url(url) => {
            if url.contains("youtube.com") || url.contains("youtu.be") {
                let mut meta = DocMeta::new(user_id, SourceKind::Youtube, url);
                meta.url = Some(url.clone());
                youtube::extract_youtube(config, url, &meta).await
            } else {
                let mut meta = DocMeta::new(user_id, SourceKind::Url, url);
                meta.url = Some(url.clone());
                web::extract_web(config, url, &meta).await
            }
        }
    }
}

/// Run an external command with a bounded timeout, failing on a non-zero
/// exit. Used for every process invocation (rasterizer, OCR, downloader) so
/// a wedged tool cannot hang an ingestion forever.
pub(crate) async fn run_command(
    program: &str,
    args: &[&OsStr],
    timeout: Duration,
) -> Result<Output, ExtractError> {
    let mut cmd = tokio::process::Command::new(program);
    // A timed-out child must not outlive the dropped future.
    cmd.args(args).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            ExtractError::command(program, format!("timed out after {}s", timeout.as_secs()))
        })?
        .map_err(|e| {
            ExtractError::command(program, format!("failed to start: {e}. Is it installed?"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::command(program, stderr.trim().to_string()));
    }

    Ok(output)
}
