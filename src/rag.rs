//! Question answering over a user's corpus: retrieve, compose, generate,
//! cite.

use tracing::info;

use crate::embedding::Embedder;
use crate::error::GenerateError;
use crate::index::VectorIndex;
use crate::llm::CompletionModel;
use crate::models::{ChatTurn, RagAnswer, RetrievedDoc, SourceRef};
use crate::prompt;
use crate::retrieve::retrieve;

/// How many of the top retrieved documents are cited back to the caller.
const CITED_SOURCES: usize = 5;

/// Answer returned when the user's corpus has nothing relevant.
const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant information in your uploaded \
    documents. Please ensure you've uploaded documents related to your question.";

/// Answer a question from one user's corpus.
///
/// Zero retrieved documents short-circuits to a fixed "no relevant
/// information" answer with no sources — it is not a failure. Generation
/// errors surface unchanged; there is no local retry. The cited sources are
/// the top documents by similarity, independent of what the model actually
/// used.
pub async fn answer(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    llm: &dyn CompletionModel,
    query: &str,
    history: &[ChatTurn],
    user_id: &str,
    top_k: usize,
) -> Result<RagAnswer, GenerateError> {
    let docs = retrieve(embedder, index, query, user_id, top_k).await?;
    info!(user_id, retrieved = docs.len(), "answering query");

    if docs.is_empty() {
        return Ok(RagAnswer {
            answer: NO_RESULTS_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let prompt = prompt::compose(&docs, history, query);
    let answer = llm.complete(&prompt).await?;

    Ok(RagAnswer {
        answer,
        sources: cite(&docs),
    })
}

/// Project the top documents (already sorted by descending similarity) into
/// the citation shape.
fn cite(docs: &[RetrievedDoc]) -> Vec<SourceRef> {
    docs.iter()
        .take(CITED_SOURCES)
        .map(|doc| SourceRef {
            name: doc
                .meta
                .filename
                .clone()
                .unwrap_or_else(|| doc.meta.source.clone()),
            kind: doc.meta.kind,
            page: doc.meta.page,
            video_id: doc.meta.video_id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocMeta, SourceKind};

    fn doc(kind: SourceKind, source: &str, score: f32) -> RetrievedDoc {
        RetrievedDoc {
            text: "text".to_string(),
            meta: DocMeta::new("u1", kind, source),
            score,
        }
    }

    #[test]
    fn cites_at_most_five_sources() {
        let docs: Vec<RetrievedDoc> = (0..8)
            .map(|i| doc(SourceKind::Txt, &format!("doc-{i}.txt"), 1.0 - i as f32 * 0.1))
            .collect();
        let sources = cite(&docs);
        assert_eq!(sources.len(), 5);
        assert_eq!(sources[0].name, "doc-0.txt");
        assert_eq!(sources[4].name, "doc-4.txt");
    }

    #[test]
    fn citation_prefers_filename_and_keeps_location() {
        let mut meta = DocMeta::new("u1", SourceKind::Pdf, "ignored");
        meta.filename = Some("report.pdf".to_string());
        meta.page = Some(7);
        let docs = vec![RetrievedDoc {
            text: "t".to_string(),
            meta,
            score: 0.8,
        }];
        let sources = cite(&docs);
        assert_eq!(sources[0].name, "report.pdf");
        assert_eq!(sources[0].page, Some(7));
        assert_eq!(sources[0].video_id, None);
    }
}
