//! Keyed signing of cache key sets.

use std::fmt;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::keys::{CacheKeyError, CacheKeySet};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("fragment signing secret must not be empty")]
    EmptySecret,
    #[error("fragment signing secret rejected: {0}")]
    InvalidSecret(String),
}

/// Signs cache key sets with HMAC-SHA256 under a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignerError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let mac = <HmacSha256 as KeyInit>::new_from_slice(secret)
            .map_err(|err| SignerError::InvalidSecret(err.to_string()))?;
        Ok(Self { mac })
    }

    /// Lowercase hex token for `keys`; fails when required keys are absent.
    pub fn sign(&self, keys: &CacheKeySet) -> Result<String, CacheKeyError> {
        let payload = keys.signing_payload()?;
        let mut mac = self.mac.clone();
        mac.update(&payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Compare `supplied` with the token recomputed from `keys` in constant time.
    pub fn verify(&self, keys: &CacheKeySet, supplied: &str) -> Result<bool, CacheKeyError> {
        let expected = self.sign(keys)?;
        Ok(expected.as_bytes().ct_eq(supplied.as_bytes()).into())
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}
