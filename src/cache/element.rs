//! Cache elements handed to the response writer.

use std::time::Duration;

use time::OffsetDateTime;

use super::keys::CacheKeySet;

/// Body of a cache element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContent {
    content: String,
}

impl CachedContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Immutable result of a cache lookup or store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheElement {
    keys: CacheKeySet,
    data: CachedContent,
    ttl: Duration,
    created_at: OffsetDateTime,
    contextual_keys: CacheKeySet,
}

impl CacheElement {
    pub fn new(keys: CacheKeySet, data: CachedContent) -> Self {
        Self {
            keys,
            data,
            ttl: Duration::ZERO,
            created_at: OffsetDateTime::now_utc(),
            contextual_keys: CacheKeySet::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_contextual_keys(mut self, contextual_keys: CacheKeySet) -> Self {
        self.contextual_keys = contextual_keys;
        self
    }

    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn keys(&self) -> &CacheKeySet {
        &self.keys
    }

    pub fn data(&self) -> &CachedContent {
        &self.data
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn contextual_keys(&self) -> &CacheKeySet {
        &self.contextual_keys
    }

    /// A zero TTL leaves expiry to the edge, so such elements never expire here.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        now > self.created_at + self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn element() -> CacheElement {
        CacheElement::new(
            CacheKeySet::for_block("/cms/a", "1"),
            CachedContent::new("<p>a</p>"),
        )
        .with_created_at(datetime!(2024-01-01 00:00 UTC))
    }

    #[test]
    fn zero_ttl_never_expires() {
        let element = element();
        assert!(!element.is_expired_at(datetime!(2030-01-01 00:00 UTC)));
    }

    #[test]
    fn positive_ttl_expires_after_window() {
        let element = element().with_ttl(Duration::from_secs(60));

        assert!(!element.is_expired_at(datetime!(2024-01-01 00:01 UTC)));
        assert!(element.is_expired_at(datetime!(2024-01-01 00:01:01 UTC)));
    }

    #[test]
    fn accessors_expose_construction_values() {
        let contextual = CacheKeySet::new().with("locale", "en");
        let element = element().with_contextual_keys(contextual.clone());

        assert_eq!(element.data().content(), "<p>a</p>");
        assert_eq!(element.keys().block_id(), Some("/cms/a"));
        assert_eq!(element.contextual_keys(), &contextual);
        assert_eq!(element.ttl(), Duration::ZERO);
        assert_eq!(element.created_at(), datetime!(2024-01-01 00:00 UTC));
    }
}
