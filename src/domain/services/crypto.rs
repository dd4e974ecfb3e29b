//! Field-level AES-256-GCM encryption for the encrypted index variant.
//!
//! Only free-text payload fields (author display name, message text) are
//! encrypted; structural fields stay in the clear so the vector store can
//! still filter on them. Ciphertext wire format: `iv:tag:ciphertext`, each
//! part standard base64. Every call draws a fresh random 128-bit IV.

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::domain::models::MessagePayload;
use crate::domain::DomainError;

/// AES-256-GCM with a 16-byte nonce, matching the serialized IV width.
type WideIvCipher = AesGcm<Aes256, U16>;

const KEY_HEX_LEN: usize = 64;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Encrypts and decrypts individual payload fields.
///
/// Constructed once at startup from a 64-hex-character secret; construction
/// fails with a descriptive error before any network activity if the key is
/// missing or malformed.
pub struct FieldCipher {
    cipher: WideIvCipher,
}

impl FieldCipher {
    pub fn from_hex_key(hex_key: &str) -> Result<Self, DomainError> {
        let hex_key = hex_key.trim();
        if hex_key.len() != KEY_HEX_LEN {
            return Err(DomainError::crypto(format!(
                "Encryption key must be exactly {} hex characters (got {})",
                KEY_HEX_LEN,
                hex_key.len()
            )));
        }
        let key_bytes = hex::decode(hex_key).map_err(|_| {
            DomainError::crypto("Encryption key contains non-hex characters")
        })?;

        let key = Key::<WideIvCipher>::from_slice(&key_bytes);
        Ok(Self {
            cipher: WideIvCipher::new(key),
        })
    }

    /// Encrypt a non-empty string into `iv:tag:ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, DomainError> {
        let nonce = WideIvCipher::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| DomainError::crypto("Encryption failed"))?;

        // The aead output is ciphertext with the auth tag appended; the wire
        // format carries them as separate base64 parts.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}",
            BASE64.encode(nonce),
            BASE64.encode(tag),
            BASE64.encode(ciphertext)
        ))
    }

    /// Decrypt an `iv:tag:ciphertext` string produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, serialized: &str) -> Result<String, DomainError> {
        let parts: Vec<&str> = serialized.split(':').collect();
        if parts.len() != 3 {
            return Err(DomainError::crypto(
                "Malformed ciphertext: expected iv:tag:ciphertext",
            ));
        }

        let iv = BASE64
            .decode(parts[0])
            .map_err(|_| DomainError::crypto("Malformed ciphertext: bad IV encoding"))?;
        let tag = BASE64
            .decode(parts[1])
            .map_err(|_| DomainError::crypto("Malformed ciphertext: bad tag encoding"))?;
        let ciphertext = BASE64
            .decode(parts[2])
            .map_err(|_| DomainError::crypto("Malformed ciphertext: bad body encoding"))?;

        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(DomainError::crypto(
                "Malformed ciphertext: unexpected IV or tag length",
            ));
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_ref())
            .map_err(|_| DomainError::crypto("Decryption failed: wrong key or tampered data"))?;

        String::from_utf8(plaintext)
            .map_err(|_| DomainError::crypto("Decrypted data is not valid UTF-8"))
    }

    /// Absent or empty fields stay absent: never store an encrypted empty
    /// string, so optionality survives the round trip.
    pub fn encrypt_field(&self, value: Option<&str>) -> Result<Option<String>, DomainError> {
        match value {
            Some(v) if !v.is_empty() => Ok(Some(self.encrypt(v)?)),
            _ => Ok(None),
        }
    }

    pub fn decrypt_field(&self, value: Option<&str>) -> Result<Option<String>, DomainError> {
        match value {
            Some(v) if !v.is_empty() => Ok(Some(self.decrypt(v)?)),
            _ => Ok(None),
        }
    }

    /// Encrypt the free-text fields of a payload, leaving structure intact.
    pub fn encrypt_payload(&self, mut payload: MessagePayload) -> Result<MessagePayload, DomainError> {
        payload.user_name = self.encrypt_field(payload.user_name.as_deref())?;
        payload.text = self.encrypt_field(payload.text.as_deref())?;
        Ok(payload)
    }

    pub fn decrypt_payload(&self, mut payload: MessagePayload) -> Result<MessagePayload, DomainError> {
        payload.user_name = self.decrypt_field(payload.user_name.as_deref())?;
        payload.text = self.decrypt_field(payload.text.as_deref())?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Message, MessagePayload};

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn cipher() -> FieldCipher {
        FieldCipher::from_hex_key(TEST_KEY).expect("valid test key")
    }

    #[test]
    fn test_roundtrip() {
        let cipher = cipher();
        let plaintext = "quarterly budget discussion";

        let sealed = cipher.encrypt(plaintext).expect("encrypt");
        assert_ne!(sealed, plaintext);
        assert_eq!(sealed.split(':').count(), 3);

        let opened = cipher.decrypt(&sealed).expect("decrypt");
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let cipher = cipher();
        let a = cipher.encrypt("same input").expect("encrypt");
        let b = cipher.encrypt("same input").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_validation() {
        assert!(FieldCipher::from_hex_key("").is_err());
        assert!(FieldCipher::from_hex_key("abc123").is_err());
        // Right length, wrong charset
        let bad = "zz".repeat(32);
        assert!(FieldCipher::from_hex_key(&bad).is_err());
        assert!(FieldCipher::from_hex_key(TEST_KEY).is_ok());
    }

    #[test]
    fn test_optional_fields_stay_absent() {
        let cipher = cipher();
        assert_eq!(cipher.encrypt_field(None).expect("encrypt"), None);
        assert_eq!(cipher.encrypt_field(Some("")).expect("encrypt"), None);
        assert_eq!(cipher.decrypt_field(None).expect("decrypt"), None);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let cipher = cipher();
        let sealed = cipher.encrypt("sensitive").expect("encrypt");

        let mut parts: Vec<String> = sealed.split(':').map(String::from).collect();
        parts[2] = BASE64.encode(b"tampered body");
        assert!(cipher.decrypt(&parts.join(":")).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = cipher().encrypt("secret").expect("encrypt");

        let other_key = "f".repeat(64);
        let other = FieldCipher::from_hex_key(&other_key).expect("valid key");
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_payload_roundtrip() {
        let cipher = cipher();
        let message = Message::new("C1", "100.000100", "U1", "the budget looks tight")
            .with_user_name("alice");
        let payload = MessagePayload::from_message(&message, "finance");

        let encrypted = cipher.encrypt_payload(payload.clone()).expect("encrypt");
        assert_ne!(encrypted.text, payload.text);
        assert_ne!(encrypted.user_name, payload.user_name);
        // Structural fields untouched
        assert_eq!(encrypted.channel_id, payload.channel_id);
        assert_eq!(encrypted.ts, payload.ts);

        let decrypted = cipher.decrypt_payload(encrypted).expect("decrypt");
        assert_eq!(decrypted.text, payload.text);
        assert_eq!(decrypted.user_name, payload.user_name);
    }
}
