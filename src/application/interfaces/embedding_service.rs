use async_trait::async_trait;

use crate::domain::DomainError;

/// Generates vector embeddings from message text and queries.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts, preserving input order. Implementations may
    /// split into provider-sized sub-batches internally; a failed sub-batch
    /// fails the whole call.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError>;

    /// Output dimensionality, fixed per model.
    fn dimensions(&self) -> usize;
}
