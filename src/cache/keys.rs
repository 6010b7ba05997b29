//! Cache key sets identifying a block fragment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BLOCK_ID_KEY: &str = "block_id";
pub const UPDATED_AT_KEY: &str = "updated_at";

/// Keys covered by the fragment token, in canonical order.
const SIGNED_KEYS: [&str; 2] = [BLOCK_ID_KEY, UPDATED_AT_KEY];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyError {
    #[error("cache keys must not be empty")]
    Empty,
    #[error("missing required cache key `{0}`")]
    Missing(&'static str),
}

/// Ordered string mapping describing what a cache entry represents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKeySet(BTreeMap<String, String>);

impl CacheKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_block(block_id: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Self::new()
            .with(BLOCK_ID_KEY, block_id)
            .with(UPDATED_AT_KEY, updated_at)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn block_id(&self) -> Option<&str> {
        self.get(BLOCK_ID_KEY)
    }

    /// Fail fast unless the set carries both `block_id` and `updated_at`.
    pub fn validate(&self) -> Result<(), CacheKeyError> {
        if self.is_empty() {
            return Err(CacheKeyError::Empty);
        }
        for key in SIGNED_KEYS {
            if !self.0.contains_key(key) {
                return Err(CacheKeyError::Missing(key));
            }
        }
        Ok(())
    }

    /// Canonical byte form of the signed keys.
    ///
    /// Each key and value is written as a big-endian `u64` length followed by
    /// its bytes, so no pair of distinct key sets can share an encoding.
    pub(crate) fn signing_payload(&self) -> Result<Vec<u8>, CacheKeyError> {
        self.validate()?;

        let mut payload = Vec::new();
        for key in SIGNED_KEYS {
            let value = self.get(key).ok_or(CacheKeyError::Missing(key))?;
            write_field(&mut payload, key);
            write_field(&mut payload, value);
        }
        Ok(payload)
    }
}

fn write_field(buffer: &mut Vec<u8>, field: &str) {
    buffer.extend_from_slice(&(field.len() as u64).to_be_bytes());
    buffer.extend_from_slice(field.as_bytes());
}

impl<K, V> FromIterator<(K, V)> for CacheKeySet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(CacheKeySet::new().validate(), Err(CacheKeyError::Empty));
    }

    #[test]
    fn missing_updated_at_is_rejected() {
        let keys = CacheKeySet::new().with(BLOCK_ID_KEY, "/cms/content/home/additionalInfoBlock");
        assert_eq!(
            keys.validate(),
            Err(CacheKeyError::Missing(UPDATED_AT_KEY))
        );
    }

    #[test]
    fn missing_block_id_is_rejected() {
        let keys = CacheKeySet::new().with(UPDATED_AT_KEY, "foo");
        assert_eq!(keys.validate(), Err(CacheKeyError::Missing(BLOCK_ID_KEY)));
    }

    #[test]
    fn extra_keys_are_allowed() {
        let keys = CacheKeySet::for_block("/cms/a", "1").with("id", "7");
        assert!(keys.validate().is_ok());
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn payload_ignores_insertion_order_and_extra_keys() {
        let forward: CacheKeySet = [(BLOCK_ID_KEY, "/cms/a"), (UPDATED_AT_KEY, "1")]
            .into_iter()
            .collect();
        let reverse: CacheKeySet = [("locale", "en"), (UPDATED_AT_KEY, "1"), (BLOCK_ID_KEY, "/cms/a")]
            .into_iter()
            .collect();

        assert_eq!(
            forward.signing_payload().expect("payload"),
            reverse.signing_payload().expect("payload")
        );
    }

    #[test]
    fn payload_distinguishes_shifted_boundaries() {
        let left = CacheKeySet::for_block("ab", "c");
        let right = CacheKeySet::for_block("a", "bc");

        assert_ne!(
            left.signing_payload().expect("payload"),
            right.signing_payload().expect("payload")
        );
    }
}
