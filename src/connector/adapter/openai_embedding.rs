use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::DomainError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

const EMBEDDINGS_PATH: &str = "/v1/embeddings";
/// Provider payload cap: texts per request.
const BATCH_SIZE: usize = 100;

/// HTTP client for an OpenAI-compatible embeddings endpoint.
///
/// Batches of any size are accepted and split into sub-batches of
/// [`BATCH_SIZE`]; sub-batches run sequentially, never concurrently, and
/// output order is restored from the provider's `index` field rather than
/// response position. One failed sub-batch fails the whole call.
///
/// Configured from the environment:
///
/// ```text
/// OPENAI_API_KEY=sk-...
/// OPENAI_BASE_URL=https://api.openai.com   # optional override
/// ```
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            url: format!("{}{}", base.trim_end_matches('/'), EMBEDDINGS_PATH),
            model: model.into(),
            dimensions,
        }
    }

    pub fn from_env() -> Result<Self, DomainError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| DomainError::embedding("OPENAI_API_KEY environment variable not set"))?;
        let base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, base, DEFAULT_MODEL, DEFAULT_DIMENSIONS))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let request = ApiRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::embedding(format!(
                "Embedding API returned {}: {}",
                status, body
            )));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        if api_response.data.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "Provider returned {} embeddings for {} inputs",
                api_response.data.len(),
                texts.len()
            )));
        }

        // Place each vector by its provider-assigned index so provider-side
        // reordering cannot scramble the output.
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in api_response.data {
            let slot = vectors.get_mut(datum.index).ok_or_else(|| {
                DomainError::embedding(format!("Provider returned out-of-range index {}", datum.index))
            })?;
            if datum.embedding.len() != self.dimensions {
                return Err(DomainError::embedding(format!(
                    "Expected {}-dimensional vectors, got {}",
                    self.dimensions,
                    datum.embedding.len()
                )));
            }
            *slot = Some(datum.embedding);
        }

        vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| {
                    DomainError::embedding(format!("Provider response missing index {}", i))
                })
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            debug!(
                "Embedding sub-batch {} ({} texts)",
                i + 1,
                batch.len()
            );
            all.extend(self.embed_batch(batch).await?);
        }
        Ok(all)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        let mut vectors = self.embed_batch(&[query.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DomainError::embedding("Empty embedding response"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct ApiResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}
