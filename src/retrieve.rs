//! Query-time retrieval: embed the question, run a tenant-filtered
//! similarity search, return ranked documents.

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::RetrieveError;
use crate::index::VectorIndex;
use crate::models::RetrievedDoc;

/// Retrieve the `k` most similar chunks owned by `user_id`.
///
/// The `user_id` payload filter is the sole multi-tenancy boundary: no chunk
/// outside it is ever visible to this query. An empty result is success —
/// the corpus simply has nothing relevant — and is never an error.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    query: &str,
    user_id: &str,
    k: usize,
) -> Result<Vec<RetrievedDoc>, RetrieveError> {
    let vector = embedder
        .embed(query)
        .await
        .map_err(|e| RetrieveError::Embed(e.to_string()))?;

    let hits = index
        .search(&vector, user_id, k)
        .await
        .map_err(|e| RetrieveError::Index(e.to_string()))?;

    debug!(user_id, hits = hits.len(), "retrieval complete");

    Ok(hits
        .into_iter()
        .map(|hit| RetrievedDoc {
            text: hit.payload.text,
            meta: hit.payload.meta,
            score: hit.score,
        })
        .collect())
}
