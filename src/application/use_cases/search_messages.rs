use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::{EmbeddingService, VectorRepository};
use crate::domain::{DomainError, FieldCipher, PointPayload, SearchQuery, SearchResult};

/// Semantic search over the message index.
///
/// Embeds the query, runs filtered nearest-neighbor search, and returns
/// hits ordered by descending score. In the encrypted variant every payload
/// is decrypted before it reaches the caller — ciphertext never escapes.
pub struct SearchMessagesUseCase {
    vector_repo: Arc<dyn VectorRepository>,
    embedding: Arc<dyn EmbeddingService>,
    cipher: Option<Arc<FieldCipher>>,
}

impl SearchMessagesUseCase {
    pub fn new(
        vector_repo: Arc<dyn VectorRepository>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            vector_repo,
            embedding,
            cipher: None,
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<FieldCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub async fn execute(&self, query: SearchQuery) -> Result<Vec<SearchResult>, DomainError> {
        let start_time = Instant::now();

        let query_vector = self.embedding.embed_query(query.query()).await?;
        let mut points = self
            .vector_repo
            .search(
                &query_vector,
                &query.filter(),
                query.limit(),
                query.min_score(),
            )
            .await?;

        // Repositories already order by score; enforce it here so the
        // contract holds for every backend.
        points.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut results = Vec::with_capacity(points.len());
        for point in points {
            let fields = match (point.payload, self.cipher.as_deref()) {
                (PointPayload::Message(fields), _) => fields,
                (PointPayload::EncryptedMessage(fields), Some(cipher)) => {
                    cipher.decrypt_payload(fields)?
                }
                (PointPayload::EncryptedMessage(_), None) => {
                    return Err(DomainError::crypto(
                        "Encrypted payload in a search without an encryption key",
                    ));
                }
            };
            results.push(SearchResult::new(fields, point.score));
        }

        debug!(
            "Search \"{}\" matched {} points",
            query.query(),
            results.len()
        );
        info!(
            "Found {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(results)
    }
}
