use std::time::Duration;

use super::element::{CacheElement, CachedContent};
use super::keys::CacheKeySet;

/// Common surface of fragment cache backends.
pub trait FragmentCache: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, keys: &CacheKeySet) -> Result<CacheElement, Self::Error>;

    fn set(
        &self,
        keys: &CacheKeySet,
        data: CachedContent,
        ttl: Duration,
        contextual_keys: &CacheKeySet,
    ) -> Result<CacheElement, Self::Error>;

    fn has(&self, keys: &CacheKeySet) -> bool;

    fn flush(&self, keys: &CacheKeySet) -> bool;

    fn flush_all(&self) -> bool;

    fn is_contextual(&self, keys: &CacheKeySet, contextual_keys: &CacheKeySet) -> bool;
}
