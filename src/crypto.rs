//! At-rest encryption for tenant ERP credentials.
//!
//! Current payloads are AES-256-GCM with a random 96-bit IV and a 128-bit
//! tag, hex encoded and stored as one JSON string. Rows written by older
//! deployments hold `<iv hex>:<ciphertext hex>` AES-256-CBC payloads, which
//! can still be opened when a legacy key is configured.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

use crate::config::Config;

type LegacyDecryptor = cbc::Decryptor<aes::Aes256>;

const IV_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const LEGACY_IV_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encrypt() called with empty text")]
    EmptyPlaintext,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid encrypted payload: {0}")]
    Malformed(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: invalid key or corrupted data")]
    Decrypt,

    #[error("legacy payload found but no legacy key is configured")]
    LegacyKeyMissing,
}

/// Hex encoded AES-256-GCM output, serialized as the stored JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub iv: String,
    pub content: String,
    pub tag: String,
}

pub struct CredentialCipher {
    key: [u8; KEY_LENGTH],
    legacy_key: Option<[u8; KEY_LENGTH]>,
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("legacy", &self.legacy_key.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialCipher {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self {
            key,
            legacy_key: None,
        }
    }

    pub fn with_legacy_key(mut self, key: [u8; KEY_LENGTH]) -> Self {
        self.legacy_key = Some(key);
        self
    }

    /// GCM key from `erp_secret_key` (hex); legacy key from the first 32 bytes
    /// of `encryption_secret` when it is long enough.
    pub fn from_config(cfg: &Config) -> Result<Self, CryptoError> {
        let raw = hex::decode(cfg.erp_secret_key.trim())
            .map_err(|_| CryptoError::InvalidKey("ERP_SECRET_KEY must be a valid hex string".into()))?;
        let key: [u8; KEY_LENGTH] = raw.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "invalid ERP_SECRET_KEY length: {} bytes (expected 32 bytes for aes-256-gcm)",
                raw.len()
            ))
        })?;

        let mut cipher = Self::new(key);
        if let Some(prefix) = cfg.encryption_secret.as_bytes().get(..KEY_LENGTH) {
            let mut legacy = [0u8; KEY_LENGTH];
            legacy.copy_from_slice(prefix);
            cipher = cipher.with_legacy_key(legacy);
        }
        Ok(cipher)
    }

    pub fn encrypt(&self, text: &str) -> Result<EncryptedPayload, CryptoError> {
        if text.is_empty() {
            return Err(CryptoError::EmptyPlaintext);
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), text.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        let (content, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);

        Ok(EncryptedPayload {
            iv: hex::encode(iv),
            content: hex::encode(content),
            tag: hex::encode(tag),
        })
    }

    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<String, CryptoError> {
        if payload.iv.is_empty() || payload.content.is_empty() || payload.tag.is_empty() {
            return Err(CryptoError::Malformed(
                "decrypt() called with invalid encrypted payload".into(),
            ));
        }

        let iv = decode_hex("iv", &payload.iv)?;
        if iv.len() != IV_LENGTH {
            return Err(CryptoError::Malformed(format!(
                "iv must be {IV_LENGTH} bytes, got {}",
                iv.len()
            )));
        }
        let tag = decode_hex("tag", &payload.tag)?;
        if tag.len() != TAG_LENGTH {
            return Err(CryptoError::Malformed(format!(
                "tag must be {TAG_LENGTH} bytes, got {}",
                tag.len()
            )));
        }
        let mut sealed = decode_hex("content", &payload.content)?;
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plain = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Decrypt)
    }

    /// Encrypt and render the storage form.
    pub fn seal(&self, text: &str) -> Result<String, CryptoError> {
        let payload = self.encrypt(text)?;
        serde_json::to_string(&payload).map_err(|_| CryptoError::Encrypt)
    }

    /// Open a stored credential in either the JSON GCM form or the legacy
    /// colon-delimited CBC form.
    pub fn open(&self, stored: &str) -> Result<String, CryptoError> {
        let stored = stored.trim();
        if stored.starts_with('{') {
            let payload: EncryptedPayload = serde_json::from_str(stored)
                .map_err(|_| CryptoError::Malformed("Failed to parse encrypted payload".into()))?;
            return self.decrypt(&payload);
        }

        match stored.split_once(':') {
            Some((iv, content)) if !iv.is_empty() && !content.is_empty() => {
                self.decrypt_legacy(iv, content)
            }
            _ => Err(CryptoError::Malformed(
                "Invalid encrypted payload structure".into(),
            )),
        }
    }

    fn decrypt_legacy(&self, iv_hex: &str, content_hex: &str) -> Result<String, CryptoError> {
        let key = self.legacy_key.ok_or(CryptoError::LegacyKeyMissing)?;
        let iv = decode_hex("iv", iv_hex)?;
        if iv.len() != LEGACY_IV_LENGTH {
            return Err(CryptoError::Malformed(format!(
                "legacy iv must be {LEGACY_IV_LENGTH} bytes, got {}",
                iv.len()
            )));
        }
        let content = decode_hex("content", content_hex)?;

        let decryptor = LegacyDecryptor::new_from_slices(&key, &iv)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let plain = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&content)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Decrypt)
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|_| CryptoError::Malformed(format!("{field} is not valid hex")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    const KEY: [u8; 32] = [7u8; 32];
    const LEGACY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

    fn cipher() -> CredentialCipher {
        CredentialCipher::new(KEY).with_legacy_key(LEGACY)
    }

    fn legacy_payload(text: &str) -> String {
        let iv = [3u8; 16];
        let enc = cbc::Encryptor::<aes::Aes256>::new_from_slices(&LEGACY, &iv).unwrap();
        let ct = enc.encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());
        format!("{}:{}", hex::encode(iv), hex::encode(ct))
    }

    #[test]
    fn sealed_credentials_open_again() {
        let c = cipher();
        let stored = c.seal("api-secret-123").unwrap();
        assert_eq!(c.open(&stored).unwrap(), "api-secret-123");
    }

    #[test]
    fn stored_form_is_hex_json() {
        let stored = cipher().seal("k").unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["iv"].as_str().unwrap().len(), IV_LENGTH * 2);
        assert_eq!(value["tag"].as_str().unwrap().len(), TAG_LENGTH * 2);
        assert_eq!(value["content"].as_str().unwrap().len(), 2);
    }

    #[test]
    fn each_encryption_uses_a_fresh_iv() {
        let c = cipher();
        let a = c.encrypt("same").unwrap();
        let b = c.encrypt("same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.content, b.content);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(cipher().encrypt(""), Err(CryptoError::EmptyPlaintext));
    }

    #[test]
    fn tampered_tag_fails() {
        let c = cipher();
        let mut payload = c.encrypt("secret").unwrap();
        let flipped = if payload.tag.starts_with('0') { "1" } else { "0" };
        payload.tag.replace_range(0..1, flipped);
        assert_eq!(c.decrypt(&payload), Err(CryptoError::Decrypt));
    }

    #[test]
    fn wrong_key_fails() {
        let stored = cipher().seal("secret").unwrap();
        let other = CredentialCipher::new([9u8; 32]);
        assert_eq!(other.open(&stored), Err(CryptoError::Decrypt));
    }

    #[test]
    fn legacy_cbc_payload_still_opens() {
        let stored = legacy_payload("legacy-api-key");
        assert_eq!(cipher().open(&stored).unwrap(), "legacy-api-key");
    }

    #[test]
    fn legacy_payload_without_legacy_key() {
        let stored = legacy_payload("legacy-api-key");
        let c = CredentialCipher::new(KEY);
        assert_eq!(c.open(&stored), Err(CryptoError::LegacyKeyMissing));
    }

    #[test]
    fn incomplete_json_payload_is_malformed() {
        let err = cipher().open(r#"{"iv":"00","content":"00"}"#).unwrap_err();
        assert!(matches!(err, CryptoError::Malformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            cipher().open("not-encrypted"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn from_config_derives_both_keys() {
        let cfg = Config {
            erp_secret_key: hex::encode(KEY),
            encryption_secret: "0123456789abcdef0123456789abcdef-extra".to_string(),
            ..Config::default()
        };
        let c = CredentialCipher::from_config(&cfg).unwrap();
        assert_eq!(c.open(&legacy_payload("x1")).unwrap(), "x1");
    }
}
