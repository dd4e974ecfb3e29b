use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::Message;
use crate::domain::DomainError;

/// Current payload schema version. The index layer performs no automatic
/// migration: payloads carrying another version are rejected on read.
pub const PAYLOAD_VERSION: u32 = 1;

/// Index variant a point belongs to. Plaintext and encrypted points live in
/// separate collections and must never share ids, so the encrypted variant
/// contributes a suffix to the identity preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexVariant {
    Plaintext,
    Encrypted,
}

impl IndexVariant {
    fn id_suffix(&self) -> Option<&'static str> {
        match self {
            IndexVariant::Plaintext => None,
            IndexVariant::Encrypted => Some("enc"),
        }
    }
}

/// Deterministic, UUID-shaped point id for `(channel, ts, variant)`.
///
/// SHA-256 over `"{channel}:{ts}"` (plus `":enc"` for the encrypted
/// variant), truncated to 16 bytes and rendered as a hyphenated UUID so the
/// vector store accepts it as a native point id. Stable across processes
/// and runs, which is what makes re-sync and re-embedding idempotent.
pub fn point_id(channel_id: &str, ts: &str, variant: IndexVariant) -> String {
    let mut hasher = Sha256::new();
    hasher.update(channel_id.as_bytes());
    hasher.update(b":");
    hasher.update(ts.as_bytes());
    if let Some(suffix) = variant.id_suffix() {
        hasher.update(b":");
        hasher.update(suffix.as_bytes());
    }
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// Message fields stored alongside a vector.
///
/// In the encrypted variant `user_name` and `text` hold ciphertext strings
/// (`iv:tag:ciphertext`, base64); absent fields stay `None` in both
/// variants so optionality survives the encryption round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub version: u32,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub text: Option<String>,
    pub ts: String,
    /// Numeric form of `ts` for range filters.
    pub timestamp: f64,
    pub thread_ts: Option<String>,
    pub is_thread_parent: bool,
}

impl MessagePayload {
    pub fn from_message(message: &Message, channel_name: &str) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            channel_id: message.channel_id.clone(),
            channel_name: channel_name.to_string(),
            user_id: message.user_id.clone(),
            user_name: message.user_name.clone(),
            text: Some(message.text.clone()).filter(|t| !t.is_empty()),
            ts: message.ts.clone(),
            timestamp: message.ts_f64(),
            thread_ts: message.thread_ts.clone(),
            is_thread_parent: message.is_thread_parent(),
        }
    }
}

/// Tagged payload stored with every point.
///
/// The discriminant makes plaintext and encrypted payloads distinct wire
/// shapes; payloads are deserialized and then validated at the store
/// boundary, never trusted implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointPayload {
    Message(MessagePayload),
    EncryptedMessage(MessagePayload),
}

impl PointPayload {
    pub fn fields(&self) -> &MessagePayload {
        match self {
            PointPayload::Message(fields) => fields,
            PointPayload::EncryptedMessage(fields) => fields,
        }
    }

    pub fn variant(&self) -> IndexVariant {
        match self {
            PointPayload::Message(_) => IndexVariant::Plaintext,
            PointPayload::EncryptedMessage(_) => IndexVariant::Encrypted,
        }
    }

    /// Schema check applied after deserialization.
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = self.fields();
        if fields.version != PAYLOAD_VERSION {
            return Err(DomainError::invalid_input(format!(
                "Unsupported payload version {} (expected {})",
                fields.version, PAYLOAD_VERSION
            )));
        }
        if fields.channel_id.is_empty() || fields.ts.is_empty() {
            return Err(DomainError::invalid_input(
                "Payload missing channel id or timestamp",
            ));
        }
        Ok(())
    }
}

/// An (id, vector, payload) triple as stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

impl VectorPoint {
    pub fn new(id: String, vector: Vec<f32>, payload: PointPayload) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }
}
