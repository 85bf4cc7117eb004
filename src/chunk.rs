//! Overlapping fixed-size text chunker.
//!
//! Splits extracted text units into windows of at most `max_chars` bytes,
//! preferring to break at a paragraph, then line, then sentence, then word
//! boundary, with a hard character cut only when a window contains no natural
//! boundary at all. Successive windows overlap by up to `overlap_chars` so a
//! fact spanning a boundary remains retrievable from at least one chunk.
//!
//! All cuts land on UTF-8 character boundaries.

use crate::models::{Chunk, DocMeta, TextUnit};
use chrono::{DateTime, Utc};

/// Break-point separators in preference order.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Caller-supplied metadata applied to every chunk, taking precedence over
/// the unit's own values on collision.
#[derive(Debug, Clone, Default)]
pub struct MetaOverrides {
    pub user_id: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Split every unit and stamp the resulting chunks.
pub fn split_units(
    units: &[TextUnit],
    max_chars: usize,
    overlap_chars: usize,
    overrides: &MetaOverrides,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for unit in units {
        let meta = apply_overrides(&unit.meta, overrides);
        for piece in split_text(&unit.text, max_chars, overlap_chars) {
            chunks.push(Chunk {
                text: piece,
                meta: meta.clone(),
            });
        }
    }
    chunks
}

fn apply_overrides(meta: &DocMeta, overrides: &MetaOverrides) -> DocMeta {
    let mut merged = meta.clone();
    if let Some(user_id) = &overrides.user_id {
        merged.user_id = user_id.clone();
    }
    if let Some(uploaded_at) = overrides.uploaded_at {
        merged.uploaded_at = uploaded_at;
    }
    merged
}

/// Split one text into overlapping windows. Empty input yields no chunks;
/// text within the limit yields exactly one.
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    assert!(max_chars > 0, "max_chars must be positive");
    assert!(
        overlap_chars < max_chars,
        "overlap must be smaller than the chunk size"
    );

    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let remaining = &text[start..];
        if remaining.len() <= max_chars {
            let piece = remaining.trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }
            break;
        }

        let window_end = floor_char_boundary(text, start + max_chars);
        let cut = start + find_break(&text[start..window_end]);

        let piece = text[start..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        // Step back by the overlap for the next window, but never stall.
        // `cut` itself is always char-aligned, so falling back to it is safe.
        let mut next = floor_char_boundary(text, cut.saturating_sub(overlap_chars));
        if next <= start {
            next = cut;
        }
        start = next;
    }

    chunks
}

/// Byte offset to cut the window at: after the last occurrence of the
/// highest-preference separator present, or the full window when none is.
fn find_break(window: &str) -> usize {
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let cut = pos + sep.len();
            if cut > 0 {
                return cut;
            }
        }
    }
    window.len()
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    const MAX: usize = 4000;
    const OVERLAP: usize = 800;

    #[test]
    fn short_text_single_chunk() {
        let chunks = split_text("Hello, world!", MAX, OVERLAP);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(split_text("", MAX, OVERLAP).is_empty());
        assert!(split_text("   \n\n  ", MAX, OVERLAP).is_empty());
    }

    #[test]
    fn every_chunk_within_limit() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(400);
        let chunks = split_text(&text, MAX, OVERLAP);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX, "chunk of {} bytes exceeds limit", chunk.len());
        }
    }

    #[test]
    fn adjacent_chunks_overlap() {
        let text = "word ".repeat(2000);
        let chunks = split_text(&text, MAX, OVERLAP);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            // The tail of one chunk reappears at the head of the next.
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count().saturating_sub(100))
                .collect();
            assert!(
                pair[1].contains(tail.trim()),
                "no overlap between adjacent chunks"
            );
        }
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let first = "a".repeat(3000);
        let second = "b".repeat(3000);
        let text = format!("{first}\n\n{second}");
        let chunks = split_text(&text, MAX, OVERLAP);
        // The cut lands on the paragraph break, not mid-"b".
        assert_eq!(chunks[0], first);
    }

    #[test]
    fn prefers_sentence_over_word_boundary() {
        let sentence = "This is a sentence that ends here. ";
        let text = sentence.repeat(200);
        let chunks = split_text(&text, MAX, OVERLAP);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.ends_with('.'),
                "expected sentence-boundary cut, got: ...{}",
                &chunk[chunk.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn hard_cut_without_any_boundary() {
        let text = "x".repeat(10_000);
        let chunks = split_text(&text, MAX, OVERLAP);
        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0].len(), MAX);
    }

    #[test]
    fn multibyte_text_cuts_on_char_boundaries() {
        let text = "日本語のテキストです。".repeat(500);
        let chunks = split_text(&text, MAX, OVERLAP);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX);
            // Constructing the String would already have panicked on a bad
            // boundary; check the content survived intact too.
            assert!(chunk.contains('日') || chunk.contains('。'));
        }
    }

    #[test]
    fn early_boundary_in_multibyte_text_still_makes_progress() {
        // A word boundary just past the overlap width, then a long run with
        // no boundaries at all, in multibyte text.
        let text = format!("{} {}", "あ".repeat(267), "x".repeat(9000));
        let chunks = split_text(&text, MAX, OVERLAP);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX);
        }
        let total: usize = chunks.iter().map(String::len).sum();
        assert!(total >= text.len() - OVERLAP * chunks.len());
    }

    #[test]
    fn deterministic() {
        let text = "Alpha beta gamma. ".repeat(500);
        assert_eq!(split_text(&text, MAX, OVERLAP), split_text(&text, MAX, OVERLAP));
    }

    #[test]
    fn caller_metadata_wins_on_collision() {
        let unit = TextUnit {
            text: "content".to_string(),
            meta: DocMeta::new("original-user", SourceKind::Txt, "notes.txt"),
        };
        let overrides = MetaOverrides {
            user_id: Some("override-user".to_string()),
            uploaded_at: None,
        };
        let chunks = split_units(&[unit], MAX, OVERLAP, &overrides);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].meta.user_id, "override-user");
        assert_eq!(chunks[0].meta.source, "notes.txt");
    }

    #[test]
    fn unit_metadata_inherited_by_every_chunk() {
        let mut meta = DocMeta::new("u1", SourceKind::Pdf, "doc.pdf");
        meta.page = Some(3);
        let unit = TextUnit {
            text: "sentence one. ".repeat(500),
            meta,
        };
        let chunks = split_units(&[unit], MAX, OVERLAP, &MetaOverrides::default());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.meta.page, Some(3));
            assert_eq!(chunk.meta.kind, SourceKind::Pdf);
        }
    }
}
