//! Telephone number cipher.
//!
//! AES-256-GCM keyed by the SHA-256 digest of `CRYPTO_KEY`. The stored form
//! is base64 of `nonce || ciphertext`, so every encryption of the same number
//! yields a different string.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption key not configured")]
    KeyMissing,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed: {0}")]
    Decrypt(&'static str),
}

#[derive(Clone)]
pub struct PhoneCipher {
    key: Option<[u8; 32]>,
}

impl PhoneCipher {
    #[must_use]
    pub fn new(passphrase: Option<&str>) -> Self {
        let key = passphrase.map(|p| Sha256::digest(p.as_bytes()).into());
        Self { key }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        let key = self.key.as_ref().ok_or(CryptoError::KeyMissing)?;
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Encrypt)
    }

    /// Encrypt a plaintext telephone number.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyMissing`] when no key is configured.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = self.cipher()?;
        let nonce_bytes: [u8; NONCE_LEN] = rand::rng().random();
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a value produced by [`PhoneCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error if no key is configured or the value was not sealed
    /// with this key.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let cipher = self.cipher()?;
        let raw = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::Decrypt("not base64"))?;
        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::Decrypt("too short"));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decrypt("authentication failed"))?;
        String::from_utf8(plain).map_err(|_| CryptoError::Decrypt("not utf-8"))
    }

    /// Decrypt for display. Without a key the stored value is returned as-is;
    /// undecryptable values come back empty.
    #[must_use]
    pub fn reveal(&self, stored: &str) -> String {
        if !self.is_configured() {
            return stored.to_owned();
        }
        match self.decrypt(stored) {
            Ok(plain) => plain,
            Err(e) => {
                tracing::warn!(error = %e, "stored telephone could not be decrypted");
                String::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "crypto_test.rs"]
mod tests;
