//! Per-value secret encryption.
//!
//! [`CryptoProvider`] is the seam the store encrypts through. The bundled
//! [`AesGcmCryptoProvider`] derives an environment-scoped AES-256-GCM key from
//! the project id and the environment name.

use std::fmt;

use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Marks text produced by [`AesGcmCryptoProvider::encrypt`].
pub const CIPHERTEXT_PREFIX: &str = "crypto_";

const NONCE_LEN: usize = 12;

/// Reversible encryption of a single string value.
///
/// Implementations must be pure functions of their input and key so they
/// can be called from several tasks at once.
pub trait CryptoProvider: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}

/// AES-256-GCM with a random nonce per value.
///
/// Output: `crypto_` + base64(nonce ‖ ciphertext ‖ tag).
#[derive(Clone)]
pub struct AesGcmCryptoProvider {
    cipher: Aes256Gcm,
}

impl fmt::Debug for AesGcmCryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmCryptoProvider").finish_non_exhaustive()
    }
}

impl AesGcmCryptoProvider {
    /// Key = SHA-256(`project_id` ":" `env_name`).
    pub fn for_environment(project_id: &str, env_name: &str) -> Result<Self, CryptoError> {
        if project_id.is_empty() {
            return Err(CryptoError::new("project id is empty"));
        }
        let mut hasher = Sha256::new();
        hasher.update(project_id.as_bytes());
        hasher.update(b":");
        hasher.update(env_name.as_bytes());
        let key = hasher.finalize();
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| CryptoError::new("invalid key length"))?;
        Ok(Self { cipher })
    }
}

impl CryptoProvider for AesGcmCryptoProvider {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::new("encryption failed"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(payload)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let encoded = ciphertext
            .strip_prefix(CIPHERTEXT_PREFIX)
            .ok_or_else(|| CryptoError::new("value is not encrypted (missing prefix)"))?;
        let payload = STANDARD
            .decode(encoded)
            .map_err(|err| CryptoError::new(format!("invalid base64: {err}")))?;
        if payload.len() < NONCE_LEN {
            return Err(CryptoError::new("ciphertext too short"));
        }
        let (nonce_bytes, body) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|_| CryptoError::new("decryption failed (wrong key or corrupted data)"))?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::new("decrypted value is not UTF-8"))
    }
}
