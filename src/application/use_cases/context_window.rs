use std::sync::Arc;

use tracing::debug;

use crate::application::VectorRepository;
use crate::domain::{DomainError, FieldCipher, MessagePayload, PointFilter, PointPayload};

/// Upper bound on messages pulled for one context window.
const SCROLL_LIMIT: usize = 500;

/// Reconstructs the conversation around a search hit: every indexed message
/// in a channel within ±window minutes of a center timestamp, in
/// chronological order.
pub struct ContextWindowUseCase {
    vector_repo: Arc<dyn VectorRepository>,
    cipher: Option<Arc<FieldCipher>>,
}

impl ContextWindowUseCase {
    pub fn new(vector_repo: Arc<dyn VectorRepository>) -> Self {
        Self {
            vector_repo,
            cipher: None,
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<FieldCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub async fn execute(
        &self,
        channel_id: &str,
        center_ts: &str,
        window_minutes: u64,
    ) -> Result<Vec<MessagePayload>, DomainError> {
        let center = center_ts.parse::<f64>().map_err(|_| {
            DomainError::invalid_input(format!("Invalid message timestamp: {}", center_ts))
        })?;
        let window = window_minutes as f64 * 60.0;

        let filter = PointFilter {
            channel_id: Some(channel_id.to_string()),
            time_range: Some((center - window, center + window)),
        };

        let payloads = self.vector_repo.scroll(&filter, SCROLL_LIMIT).await?;
        debug!(
            "Context window ±{}min around {} in {}: {} messages",
            window_minutes,
            center_ts,
            channel_id,
            payloads.len()
        );

        let mut messages = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let fields = match (payload, self.cipher.as_deref()) {
                (PointPayload::Message(fields), _) => fields,
                (PointPayload::EncryptedMessage(fields), Some(cipher)) => {
                    cipher.decrypt_payload(fields)?
                }
                (PointPayload::EncryptedMessage(_), None) => {
                    return Err(DomainError::crypto(
                        "Encrypted payload in a context read without an encryption key",
                    ));
                }
            };
            messages.push(fields);
        }

        messages.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(messages)
    }
}
