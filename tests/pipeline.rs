//! End-to-end pipeline tests over in-memory service fakes.
//!
//! The embedding, index, and completion clients are injected collaborators,
//! so the whole ingest → retrieve → compose → answer flow runs hermetically:
//! a deterministic bag-of-words embedder stands in for the embedding service
//! and a cosine-scoring vector store stands in for the index.

use std::io::Write;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use carrel::config::Config;
use carrel::embedding::Embedder;
use carrel::error::{GenerateError, IngestError};
use carrel::extract::{FileKind, Source};
use carrel::index::{purge_user, CollectionInfo, ScoredPoint, VectorIndex};
use carrel::ingest::ingest;
use carrel::llm::CompletionModel;
use carrel::models::IndexPoint;
use carrel::rag::answer;
use carrel::retrieve::retrieve;

const DIMS: usize = 64;

/// Deterministic bag-of-words embedder: texts sharing words get similar
/// vectors, which is all nearest-neighbor retrieval needs in a test.
struct FakeEmbedder {
    fail: bool,
}

impl FakeEmbedder {
    fn new() -> Self {
        Self { fail: false }
    }
}

fn bucket(word: &str) -> usize {
    let hash = word
        .bytes()
        .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    hash as usize % DIMS
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("embedding service unavailable");
        }
        let mut vector = vec![0.0f32; DIMS];
        for word in text.to_lowercase().split_whitespace() {
            vector[bucket(word)] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// In-memory vector store with the same contract as the real index:
/// filtered cosine search, scroll, delete.
#[derive(Default)]
struct FakeIndex {
    points: Mutex<Vec<IndexPoint>>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn ensure_collection(&self, _dims: usize) -> Result<()> {
        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            points_count: self.points.lock().unwrap().len() as u64,
        })
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        self.points.lock().unwrap().extend(points);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let points = self.points.lock().unwrap();
        let mut hits: Vec<ScoredPoint> = points
            .iter()
            .filter(|p| p.payload.meta.user_id == user_id)
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll_user_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .points
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.payload.meta.user_id == user_id)
            .map(|p| p.id.clone())
            .collect())
    }

    async fn delete(&self, point_ids: &[String]) -> Result<()> {
        self.points
            .lock()
            .unwrap()
            .retain(|p| !point_ids.contains(&p.id));
        Ok(())
    }
}

/// Records the prompt it was handed and returns a canned answer.
#[derive(Default)]
struct FakeLlm {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionModel for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("a grounded answer".to_string())
    }
}

fn txt_source(content: &str) -> (tempfile::NamedTempFile, Source) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    let source = Source::File {
        path: file.path().to_path_buf(),
        filename: "notes.txt".to_string(),
        kind: FileKind::Txt,
    };
    (file, source)
}

#[tokio::test]
async fn ingest_then_retrieve_finds_the_document() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();

    let (_file, source) = txt_source(
        "The mitochondria is the powerhouse of the cell. Photosynthesis happens in chloroplasts.",
    );
    let stored = ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap();
    assert_eq!(stored, 1);

    let docs = retrieve(&embedder, &index, "mitochondria powerhouse cell", "alice", 15)
        .await
        .unwrap();
    assert!(!docs.is_empty());
    assert!(docs[0].text.contains("mitochondria"));
    assert!(docs[0].score > 0.0);
}

#[tokio::test]
async fn retrieval_is_isolated_per_user() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();

    let (_file, source) = txt_source("Secret quarterly revenue projections for the board.");
    ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap();

    let bob_docs = retrieve(&embedder, &index, "quarterly revenue projections", "bob", 15)
        .await
        .unwrap();
    assert!(bob_docs.is_empty(), "bob must not see alice's chunks");

    let alice_docs = retrieve(&embedder, &index, "quarterly revenue projections", "alice", 15)
        .await
        .unwrap();
    assert_eq!(alice_docs.len(), 1);
}

#[tokio::test]
async fn payload_survives_store_and_search_roundtrip() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();

    let (_file, source) = txt_source("A perfectly ordinary sentence about llamas.");
    ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap();

    let docs = retrieve(&embedder, &index, "ordinary sentence llamas", "alice", 15)
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].meta.kind, carrel::models::SourceKind::Txt);
    assert_eq!(docs[0].meta.source, "notes.txt");
    assert_eq!(docs[0].text, "A perfectly ordinary sentence about llamas.");
}

#[tokio::test]
async fn csv_rows_become_separate_chunks() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,role\nAda,engineer\nGrace,admiral").unwrap();
    let source = Source::File {
        path: file.path().to_path_buf(),
        filename: "people.csv".to_string(),
        kind: FileKind::Csv,
    };

    let stored = ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn purge_removes_exactly_the_users_points() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();

    let (_f1, source1) = txt_source("Alice's first document about sailing.");
    let (_f2, source2) = txt_source("Alice's second document about knots.");
    let (_f3, source3) = txt_source("Bob's document about carpentry.");
    ingest(&config, &embedder, &index, &source1, "alice").await.unwrap();
    ingest(&config, &embedder, &index, &source2, "alice").await.unwrap();
    ingest(&config, &embedder, &index, &source3, "bob").await.unwrap();

    let deleted = purge_user(&index, "alice").await.unwrap();
    assert_eq!(deleted, 2);

    assert!(retrieve(&embedder, &index, "sailing knots", "alice", 15)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        retrieve(&embedder, &index, "carpentry document", "bob", 15)
            .await
            .unwrap()
            .len(),
        1
    );

    // Purging an already-empty corpus deletes nothing.
    assert_eq!(purge_user(&index, "alice").await.unwrap(), 0);
}

#[tokio::test]
async fn empty_corpus_answers_without_calling_the_model() {
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();
    let llm = FakeLlm::default();

    let result = answer(&embedder, &index, &llm, "anything at all?", &[], "nobody", 15)
        .await
        .unwrap();

    assert!(result.answer.contains("couldn't find any relevant information"));
    assert!(result.sources.is_empty());
    assert!(llm.prompts.lock().unwrap().is_empty(), "model must not be called");
}

#[tokio::test]
async fn answer_grounds_the_prompt_and_cites_sources() {
    let config = Config::default();
    let embedder = FakeEmbedder::new();
    let index = FakeIndex::default();
    let llm = FakeLlm::default();

    let (_file, source) = txt_source("The warranty lasts twentyfour months from purchase.");
    ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap();

    let result = answer(
        &embedder,
        &index,
        &llm,
        "how long does the warranty last",
        &[],
        "alice",
        15,
    )
    .await
    .unwrap();

    assert_eq!(result.answer, "a grounded answer");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].name, "notes.txt");

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("twentyfour months"));
    assert!(prompts[0].contains("[TXT: notes.txt]"));
    assert!(prompts[0].contains("how long does the warranty last"));
}

#[tokio::test]
async fn embedding_failure_fails_the_whole_ingestion() {
    let config = Config::default();
    let embedder = FakeEmbedder { fail: true };
    let index = FakeIndex::default();

    let (_file, source) = txt_source("Content that will never be embedded.");
    let err = ingest(&config, &embedder, &index, &source, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Embed { .. }));

    // Nothing was stored.
    assert_eq!(index.collection_info().await.unwrap().points_count, 0);
}
