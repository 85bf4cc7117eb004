//! Vector index contract and the Qdrant REST implementation.
//!
//! The pipeline consumes the index through the narrow [`VectorIndex`] trait:
//! idempotent collection creation, blocking point upsert, tenant-filtered
//! similarity search, and scroll/delete for bulk purge. The payload filter on
//! `user_id` is the sole multi-tenancy boundary in the data plane — no chunk
//! outside the filter is ever visible to a user's queries.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::models::{IndexPoint, PointPayload};

/// A similarity search hit: payload plus score, ranked descending.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: PointPayload,
}

/// Point and vector counts for the collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// The persistent collection of `(id, vector, payload)` points.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if absent (cosine distance, `dims` vector size).
    /// Safe to call on every startup.
    async fn ensure_collection(&self, dims: usize) -> Result<()>;

    async fn collection_info(&self) -> Result<CollectionInfo>;

    /// Store points, blocking until the write is acknowledged.
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Nearest-neighbor search restricted to one user's points.
    async fn search(&self, vector: &[f32], user_id: &str, limit: usize)
        -> Result<Vec<ScoredPoint>>;

    /// Ids of every point owned by `user_id`.
    async fn scroll_user_ids(&self, user_id: &str) -> Result<Vec<String>>;

    /// Delete points by id, blocking until acknowledged.
    async fn delete(&self, point_ids: &[String]) -> Result<()>;
}

/// Delete a user's whole corpus. Returns the number of points removed.
///
/// This is a scroll-then-delete two-step and is not atomic with respect to a
/// concurrent ingestion for the same user: a point upserted between the
/// scroll and the delete survives the purge.
pub async fn purge_user(index: &dyn VectorIndex, user_id: &str) -> Result<usize> {
    let ids = index.scroll_user_ids(user_id).await?;
    if ids.is_empty() {
        info!(user_id, "no points to purge");
        return Ok(0);
    }
    index.delete(&ids).await?;
    info!(user_id, count = ids.len(), "purged user points");
    Ok(ids.len())
}

/// Qdrant over its REST API.
pub struct QdrantIndex {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionEntry>,
}

#[derive(Deserialize)]
struct CollectionEntry {
    name: String,
}

#[derive(Deserialize)]
struct InfoResponse {
    result: InfoResult,
}

#[derive(Deserialize)]
struct InfoResult {
    #[serde(default)]
    points_count: Option<u64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: serde_json::Value,
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    id: serde_json::Value,
}

impl QdrantIndex {
    /// Build a client from configuration. `QDRANT_API_KEY` is read from the
    /// environment when present.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        req
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Qdrant {} failed ({}): {}", what, status, body);
        }
        Ok(resp)
    }

    fn user_filter(user_id: &str) -> serde_json::Value {
        json!({
            "must": [
                { "key": "user_id", "match": { "value": user_id } }
            ]
        })
    }

    fn id_to_string(id: &serde_json::Value) -> String {
        match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        let resp = self
            .request(reqwest::Method::GET, "/collections")
            .send()
            .await?;
        let listing: CollectionsResponse = Self::check(resp, "list collections").await?.json().await?;

        let exists = listing
            .result
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": dims, "distance": "Cosine" }
        });
        let resp = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(resp, "create collection").await?;
        info!(collection = %self.collection, dims, "created collection");
        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/collections/{}", self.collection),
            )
            .send()
            .await?;
        let info: InfoResponse = Self::check(resp, "collection info").await?.json().await?;
        Ok(CollectionInfo {
            points_count: info.result.points_count.unwrap_or(0),
        })
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = json!({ "points": points });
        let resp = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}/points?wait=true", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(resp, "upsert").await?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let body = json!({
            "vector": vector,
            "filter": Self::user_filter(user_id),
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/search", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        let parsed: SearchResponse = Self::check(resp, "search").await?.json().await?;

        let hits = parsed
            .result
            .into_iter()
            .filter_map(|hit| {
                hit.payload.map(|payload| ScoredPoint {
                    id: Self::id_to_string(&hit.id),
                    score: hit.score,
                    payload,
                })
            })
            .collect();
        Ok(hits)
    }

    async fn scroll_user_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let body = json!({
            "filter": Self::user_filter(user_id),
            "limit": 10_000,
            "with_payload": false,
            "with_vector": false,
        });
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/scroll", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        let parsed: ScrollResponse = Self::check(resp, "scroll").await?.json().await?;
        Ok(parsed
            .result
            .points
            .iter()
            .map(|p| Self::id_to_string(&p.id))
            .collect())
    }

    async fn delete(&self, point_ids: &[String]) -> Result<()> {
        if point_ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "points": point_ids });
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/delete?wait=true", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(resp, "delete").await?;
        Ok(())
    }
}
