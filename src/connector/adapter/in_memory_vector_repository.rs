use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::{ScoredPoint, VectorRepository};
use crate::domain::{DomainError, PointFilter, PointPayload, VectorPoint};

/// In-memory vector store keyed by point id.
///
/// Backs `--mock` runs and tests. Upsert semantics match the HTTP store:
/// an existing id is fully replaced, so idempotency properties hold here
/// too.
pub struct InMemoryVectorRepository {
    points: Mutex<HashMap<String, VectorPoint>>,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self {
            points: Mutex::new(HashMap::new()),
        }
    }

    fn matches(payload: &PointPayload, filter: &PointFilter) -> bool {
        let fields = payload.fields();
        if let Some(ref channel_id) = filter.channel_id {
            if fields.channel_id != *channel_id {
                return false;
            }
        }
        if let Some((oldest, newest)) = filter.time_range {
            if fields.timestamp < oldest || fields.timestamp > newest {
                return false;
            }
        }
        true
    }
}

impl Default for InMemoryVectorRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn ensure_collection(&self, _dimensions: usize) -> Result<(), DomainError> {
        Ok(())
    }

    async fn upsert_points(&self, points: &[VectorPoint]) -> Result<(), DomainError> {
        let mut store = self.points.lock().await;
        for point in points {
            store.insert(point.id.clone(), point.clone());
        }
        debug!("Saved {} points to memory", points.len());
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let store = self.points.lock().await;

        let mut scored: Vec<ScoredPoint> = store
            .values()
            .filter(|p| Self::matches(&p.payload, filter))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(min_score) = min_score {
            scored.retain(|p| p.score >= min_score);
        }
        scored.truncate(limit);

        Ok(scored)
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<PointPayload>, DomainError> {
        let store = self.points.lock().await;
        Ok(store
            .values()
            .filter(|p| Self::matches(&p.payload, filter))
            .take(limit)
            .map(|p| p.payload.clone())
            .collect())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let store = self.points.lock().await;
        Ok(store.len() as u64)
    }

    async fn drop_collection(&self) -> Result<(), DomainError> {
        let mut store = self.points.lock().await;
        store.clear();
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{point_id, IndexVariant, Message, MessagePayload};

    fn sample_point(channel_id: &str, ts: &str, vector: Vec<f32>) -> VectorPoint {
        let message = Message::new(channel_id, ts, "U1", "hello");
        let payload = PointPayload::Message(MessagePayload::from_message(&message, "general"));
        VectorPoint::new(
            point_id(channel_id, ts, IndexVariant::Plaintext),
            vector,
            payload,
        )
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_point() {
        let repo = InMemoryVectorRepository::new();

        let first = sample_point("C1", "100.000100", vec![1.0, 0.0]);
        let second = sample_point("C1", "100.000100", vec![0.0, 1.0]);
        repo.upsert_points(&[first]).await.unwrap();
        repo.upsert_points(&[second]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_channel_filter() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_points(&[
            sample_point("C1", "100.000100", vec![1.0, 0.0]),
            sample_point("C2", "100.000200", vec![1.0, 0.0]),
        ])
        .await
        .unwrap();

        let filter = PointFilter {
            channel_id: Some("C1".to_string()),
            time_range: None,
        };
        let hits = repo.search(&[1.0, 0.0], &filter, 10, None).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.fields().channel_id, "C1");
    }

    #[tokio::test]
    async fn test_time_range_filter() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_points(&[
            sample_point("C1", "100.000100", vec![1.0, 0.0]),
            sample_point("C1", "500.000100", vec![1.0, 0.0]),
        ])
        .await
        .unwrap();

        let filter = PointFilter {
            channel_id: None,
            time_range: Some((400.0, 600.0)),
        };
        let payloads = repo.scroll(&filter, 10).await.unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].fields().ts, "500.000100");
    }

    #[tokio::test]
    async fn test_min_score_and_ordering() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_points(&[
            sample_point("C1", "100.000100", vec![1.0, 0.0]),
            sample_point("C1", "100.000200", vec![0.6, 0.8]),
            sample_point("C1", "100.000300", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

        let hits = repo
            .search(&[1.0, 0.0], &PointFilter::default(), 10, Some(0.5))
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits.iter().all(|h| h.score >= 0.5));
    }
}
