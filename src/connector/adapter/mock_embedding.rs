use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::DomainError;

pub const MOCK_DIMENSIONS: usize = 384;

/// Deterministic offline embedding service.
///
/// Each word maps to a seeded unit vector; a text embeds as the normalized
/// sum of its word vectors. Texts sharing words therefore score higher
/// cosine similarity than unrelated texts, which is enough signal for
/// offline runs and for search tests without a provider.
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self {
            dimensions: MOCK_DIMENSIONS,
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..self.dimensions)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            for (slot, value) in vector.iter_mut().zip(self.token_vector(&token)) {
                *slot += value;
            }
            tokens += 1;
        }

        if tokens == 0 {
            // No tokens at all: hash the raw text so the vector stays
            // deterministic and non-zero.
            vector = self.token_vector(text);
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.generate_embedding(t)).collect();
        debug!("Generated {} mock embeddings", vectors.len());
        Ok(vectors)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        Ok(self.generate_embedding(query))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
