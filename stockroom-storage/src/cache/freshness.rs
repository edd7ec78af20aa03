//! Freshness metadata for cache reads.
//!
//! Every read through the cache reports whether it was served from the cache
//! and how old the snapshot is, so callers and logs can see staleness instead
//! of having it hidden from them.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The value.
    value: T,
    /// When this value was cached (or fetched from storage).
    cached_at: DateTime<Utc>,
    /// Whether this was a cache hit or miss.
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a storage fetch (cache miss).
    pub fn from_storage(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Duration since the snapshot was taken from storage.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_is_miss_and_fresh() {
        let read = CacheRead::from_storage(5);
        assert!(read.was_cache_miss());
        assert!(!read.was_cache_hit());
        assert!(read.staleness() < Duration::from_secs(1));
    }

    #[test]
    fn test_from_cache_reports_staleness() {
        let cached_at = Utc::now() - chrono::Duration::seconds(120);
        let read = CacheRead::from_cache("x", cached_at);
        assert!(read.was_cache_hit());
        assert!(read.staleness() >= Duration::from_secs(119));
        assert_eq!(read.cached_at(), cached_at);
    }

    #[test]
    fn test_future_cached_at_has_zero_staleness() {
        let read = CacheRead::from_cache((), Utc::now() + chrono::Duration::seconds(30));
        assert_eq!(read.staleness(), Duration::ZERO);
    }

    #[test]
    fn test_map_preserves_metadata() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache(2, cached_at).map(|v| v * 10);
        assert_eq!(*read.value(), 20);
        assert!(read.was_cache_hit());
        assert_eq!(read.cached_at(), cached_at);
    }
}
