use async_trait::async_trait;

use crate::domain::{DomainError, PointFilter, PointPayload, VectorPoint};

/// A point returned by nearest-neighbor search.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: PointPayload,
}

/// Persistence for vector points in one named collection.
///
/// Upserting an existing id fully replaces the prior vector and payload
/// (last-write-wins, no merge); payloads are validated on every read.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Create the collection if missing. Idempotent.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), DomainError>;

    async fn upsert_points(&self, points: &[VectorPoint]) -> Result<(), DomainError>;

    /// Nearest-neighbor search. Results are ordered by descending score and
    /// every returned score is `>= min_score` when one is given.
    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, DomainError>;

    /// Filtered payload scan without a query vector.
    async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<PointPayload>, DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;

    async fn drop_collection(&self) -> Result<(), DomainError>;
}
