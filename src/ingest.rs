//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for one uploaded source:
//! extract → chunk → embed → index upsert, stamping every chunk with the
//! owning user's id.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{split_units, MetaOverrides};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::IngestError;
use crate::extract::{self, Source};
use crate::index::VectorIndex;
use crate::models::{IndexPoint, PointPayload};

/// Ingest one source for one user. Returns the number of chunks stored.
///
/// Chunks are embedded one at a time, in sequence; callers needing
/// throughput should parallelize across documents, not within one. The
/// upsert blocks until the index acknowledges the write.
///
/// If any embedding or upsert call fails the whole ingestion fails and no
/// partial set of chunks is guaranteed present. Retrying stores points under
/// fresh ids, so a retry after partial failure can leave duplicates — the
/// caller owns deduplication if it matters.
pub async fn ingest(
    config: &Config,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    source: &Source,
    user_id: &str,
) -> Result<usize, IngestError> {
    let units = extract::extract(&config.extract, source, user_id).await?;
    debug!(units = units.len(), user_id, "extraction complete");

    // One upload timestamp for every chunk of this source, and the caller's
    // user id wins over anything the extractor stamped.
    let overrides = MetaOverrides {
        user_id: Some(user_id.to_string()),
        uploaded_at: Some(Utc::now()),
    };
    let chunks = split_units(
        &units,
        config.chunking.max_chars,
        config.chunking.overlap_chars,
        &overrides,
    );
    info!(chunks = chunks.len(), user_id, "chunked source");

    let mut points = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let vector = embedder
            .embed(&chunk.text)
            .await
            .map_err(|e| IngestError::Embed {
                chunk: i,
                message: e.to_string(),
            })?;
        points.push(IndexPoint {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: PointPayload {
                text: chunk.text.clone(),
                meta: chunk.meta.clone(),
            },
        });
    }

    let stored = points.len();
    index
        .upsert(points)
        .await
        .map_err(|e| IngestError::Index(e.to_string()))?;

    info!(stored, user_id, "ingestion complete");
    Ok(stored)
}
