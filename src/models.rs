//! Core data types that flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of source a text unit was extracted from.
///
/// Serialized into the index payload under the `type` key. `PdfOcr` marks the
/// OCR addendum appended to a sparse-text PDF; it is a payload tag, not an
/// uploadable source kind of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    Csv,
    Txt,
    Url,
    Youtube,
    PdfOcr,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Csv => "csv",
            SourceKind::Txt => "txt",
            SourceKind::Url => "url",
            SourceKind::Youtube => "youtube",
            SourceKind::PdfOcr => "pdf_ocr",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stamped onto every text unit and inherited by every chunk.
///
/// `user_id` is set once at ingestion and never mutated; it is the only
/// multi-tenancy key in the data plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Original identifier: filename for uploads, URL for web sources.
    pub source: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// 1-based page number for PDF-derived units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl DocMeta {
    pub fn new(user_id: &str, kind: SourceKind, source: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            source: source.to_string(),
            uploaded_at: Utc::now(),
            filename: None,
            url: None,
            video_id: None,
            page: None,
        }
    }
}

/// A contiguous piece of extracted text plus its provenance, before chunking.
///
/// One unit per PDF page, per CSV row, or per whole text/web/video blob.
#[derive(Debug, Clone)]
pub struct TextUnit {
    pub text: String,
    pub meta: DocMeta,
}

/// A chunk of unit text after splitting, ready to embed and store.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub meta: DocMeta,
}

/// The payload persisted with each index point. Identical shape to [`DocMeta`]
/// plus the chunk text, so a search hit can be projected straight back into a
/// [`RetrievedDoc`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    #[serde(flatten)]
    pub meta: DocMeta,
}

/// One point to upsert: freshly minted id, embedding vector, payload.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A transient, read-only projection of an index point plus its similarity
/// score. Produced by one retrieval call and discarded after the answer.
#[derive(Debug, Clone)]
pub struct RetrievedDoc {
    pub text: String,
    pub meta: DocMeta,
    pub score: f32,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of caller-supplied conversation history. The pipeline reads the
/// most recent few turns and never persists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Citation projection attached to every answer: the top retrieved documents
/// by score, independent of what the model actually cited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// The final answer plus its cited sources.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_kind_under_type_key() {
        let payload = PointPayload {
            text: "hello".to_string(),
            meta: DocMeta::new("u1", SourceKind::Pdf, "report.pdf"),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "pdf");
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["source"], "report.pdf");
        assert!(json.get("page").is_none());
    }

    #[test]
    fn payload_roundtrip_preserves_fields() {
        let mut meta = DocMeta::new("u2", SourceKind::Youtube, "https://youtu.be/abc123xyz00");
        meta.video_id = Some("abc123xyz00".to_string());
        let payload = PointPayload {
            text: "transcript".to_string(),
            meta,
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: PointPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.meta.kind, SourceKind::Youtube);
        assert_eq!(back.meta.source, payload.meta.source);
        assert_eq!(back.text, payload.text);
        assert_eq!(back.meta.video_id.as_deref(), Some("abc123xyz00"));
    }

    #[test]
    fn pdf_ocr_kind_serializes_with_underscore() {
        assert_eq!(
            serde_json::to_value(SourceKind::PdfOcr).unwrap(),
            serde_json::json!("pdf_ocr")
        );
    }
}
