//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Each pipeline stage has its own error enum so callers can tell a failed
//! extraction (nothing stored) from a failed ingestion (embedding or index
//! call died mid-pipeline) from a failed retrieval or generation. Extraction
//! failures abort the whole ingestion for that source; retrieval returning
//! zero documents is *not* an error and never appears here.

use thiserror::Error;

/// Extraction produced no usable text, or an extraction step failed outright.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source parsed but contained nothing to index (empty file, zero CSV rows).
    #[error("document is empty: {0}")]
    EmptyDocument(String),

    /// The URL did not match any recognized video URL shape.
    #[error("unrecognized video URL: {0}")]
    InvalidUrl(String),

    /// The source yielded text, but less than the minimum for its type.
    #[error("insufficient content: got {got} chars, need at least {need}")]
    InsufficientContent { got: usize, need: usize },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An external command (pdftoppm, tesseract, yt-dlp) failed or timed out.
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("audio transcription failed: {0}")]
    Transcription(String),
}

impl ExtractError {
    pub(crate) fn command(command: &str, message: impl Into<String>) -> Self {
        ExtractError::Command {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// The ingestion pipeline failed after extraction succeeded.
///
/// No partial set of chunks is guaranteed present; the caller owns the retry,
/// and a retry will store fresh points rather than overwrite.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("embedding failed for chunk {chunk}: {message}")]
    Embed { chunk: usize, message: String },

    #[error("vector index error: {0}")]
    Index(String),
}

/// A query-time failure in the embedding or index call.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("query embedding failed: {0}")]
    Embed(String),

    #[error("vector index error: {0}")]
    Index(String),
}

/// The language-model call failed. Surfaced unchanged to the caller; the
/// pipeline does not retry generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("completion transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion response contained no content")]
    MissingContent,

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
}
