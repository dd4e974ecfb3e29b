use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::application::{ScoredPoint, VectorRepository};
use crate::domain::{DomainError, PointFilter, PointPayload, VectorPoint};

const DEFAULT_BASE_URL: &str = "http://localhost:6333";

/// Page size for scroll requests; scrolling continues until the caller's
/// limit or the end of the collection.
const SCROLL_PAGE: usize = 256;

/// HTTP client for a Qdrant-compatible vector store.
///
/// One instance manages one named collection. Point ids are supplied by the
/// caller (deterministic UUID-shaped hashes), so upserting the same message
/// twice replaces rather than duplicates. Payloads are deserialized and
/// validated on every read; an unknown shape or schema version is a storage
/// error, not silently passed through.
pub struct QdrantVectorRepository {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl QdrantVectorRepository {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base.trim_end_matches('/').to_string(),
            collection: collection.into(),
        }
    }

    /// Construct against `QDRANT_URL`, falling back to the local default.
    pub fn from_env(collection: impl Into<String>) -> Self {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(url, collection)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    async fn post_json(&self, url: &str, body: Value) -> Result<Value, DomainError> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Vector store request failed: {}", e)))?;

        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, DomainError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::storage(format!(
                "Vector store returned {}: {}",
                status, body
            )));
        }
        response
            .json()
            .await
            .map_err(|e| DomainError::storage(format!("Invalid vector store response: {}", e)))
    }

    fn parse_payload(raw: Value) -> Result<PointPayload, DomainError> {
        let payload: PointPayload = serde_json::from_value(raw)
            .map_err(|e| DomainError::storage(format!("Unreadable point payload: {}", e)))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Exact-match and range predicates combined with AND.
    fn build_filter(filter: &PointFilter) -> Option<Value> {
        let mut must = Vec::new();
        if let Some(ref channel_id) = filter.channel_id {
            must.push(json!({ "key": "channel_id", "match": { "value": channel_id } }));
        }
        if let Some((oldest, newest)) = filter.time_range {
            must.push(json!({ "key": "timestamp", "range": { "gte": oldest, "lte": newest } }));
        }
        if must.is_empty() {
            None
        } else {
            Some(json!({ "must": must }))
        }
    }
}

#[async_trait]
impl VectorRepository for QdrantVectorRepository {
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), DomainError> {
        let url = self.collection_url("");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Vector store request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status().as_u16() != 404 {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::storage(format!(
                "Vector store returned {}: {}",
                status, body
            )));
        }

        debug!(
            "Creating collection {} ({} dimensions)",
            self.collection, dimensions
        );
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Vector store request failed: {}", e)))?;
        Self::parse_response(response).await.map(|_| ())
    }

    async fn upsert_points(&self, points: &[VectorPoint]) -> Result<(), DomainError> {
        if points.is_empty() {
            return Ok(());
        }

        let body: Vec<Value> = points
            .iter()
            .map(|p| {
                Ok(json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": serde_json::to_value(&p.payload)
                        .map_err(|e| DomainError::storage(format!("Unserializable payload: {}", e)))?,
                }))
            })
            .collect::<Result<_, DomainError>>()?;

        let url = format!("{}?wait=true", self.collection_url("/points"));
        let response = self
            .client
            .put(&url)
            .json(&json!({ "points": body }))
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Vector store request failed: {}", e)))?;
        Self::parse_response(response).await?;

        debug!("Upserted {} points into {}", points.len(), self.collection);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(min_score) = min_score {
            body["score_threshold"] = json!(min_score);
        }
        if let Some(f) = Self::build_filter(filter) {
            body["filter"] = f;
        }

        let value = self
            .post_json(&self.collection_url("/points/search"), body)
            .await?;
        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| DomainError::storage(format!("Invalid search response: {}", e)))?;

        response
            .result
            .into_iter()
            .map(|hit| {
                let id = match hit.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Ok(ScoredPoint {
                    id,
                    score: hit.score,
                    payload: Self::parse_payload(hit.payload)?,
                })
            })
            .collect()
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<PointPayload>, DomainError> {
        let mut payloads = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE.min(limit - payloads.len()),
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(f) = Self::build_filter(filter) {
                body["filter"] = f;
            }
            if let Some(ref offset) = offset {
                body["offset"] = offset.clone();
            }

            let value = self
                .post_json(&self.collection_url("/points/scroll"), body)
                .await?;
            let response: ScrollResponse = serde_json::from_value(value)
                .map_err(|e| DomainError::storage(format!("Invalid scroll response: {}", e)))?;

            for point in response.result.points {
                payloads.push(Self::parse_payload(point.payload)?);
            }

            offset = response.result.next_page_offset.filter(|v| !v.is_null());
            if offset.is_none() || payloads.len() >= limit {
                break;
            }
        }

        Ok(payloads)
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let value = self
            .post_json(&self.collection_url("/points/count"), json!({ "exact": true }))
            .await?;
        let response: CountResponse = serde_json::from_value(value)
            .map_err(|e| DomainError::storage(format!("Invalid count response: {}", e)))?;
        Ok(response.result.count)
    }

    async fn drop_collection(&self) -> Result<(), DomainError> {
        let response = self
            .client
            .delete(self.collection_url(""))
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Vector store request failed: {}", e)))?;
        Self::parse_response(response).await.map(|_| ())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    #[serde(default)]
    points: Vec<ScrollPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_combines_with_and() {
        let filter = PointFilter {
            channel_id: Some("C1".to_string()),
            time_range: Some((100.0, 200.0)),
        };
        let value = QdrantVectorRepository::build_filter(&filter).expect("filter");

        let must = value["must"].as_array().expect("must clause");
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "channel_id");
        assert_eq!(must[1]["range"]["gte"], 100.0);
    }

    #[test]
    fn test_empty_filter_omitted() {
        assert!(QdrantVectorRepository::build_filter(&PointFilter::default()).is_none());
    }

    #[test]
    fn test_hit_id_string_or_uuid() {
        let hit: SearchHit = serde_json::from_value(json!({
            "id": "8c4b4b8e-0000-4000-8000-000000000000",
            "score": 0.92,
            "payload": {}
        }))
        .expect("deserialize");
        assert_eq!(hit.id.as_str().unwrap().len(), 36);
    }
}
