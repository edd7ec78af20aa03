//! Process-local cache backend.
//!
//! Entries live in a `DashMap` with an absolute expiry instant. Expired
//! entries are reported as misses and evicted lazily on access, or eagerly
//! when the optional capacity bound is reached.
//!
//! Uses `tokio::time::Instant` so paused-clock tests can advance time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use stockroom_core::CacheError;
use tokio::time::Instant;

use super::key::CacheKey;
use super::read_through::MAX_ENTRY_TTL;
use super::traits::{CacheBackend, CacheStats};

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Arc<Vec<u8>>,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache backend with per-entry TTL.
///
/// Suitable for a single service instance. Multiple instances each get
/// their own view; use the Redis backend to share entries between them.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, MemoryEntry>,
    max_entries: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of live entries.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::default()
        }
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Make room for one more entry.
    fn enforce_capacity(&self, incoming: &str) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() < max || self.entries.contains_key(incoming) {
            return;
        }

        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let mut evicted = (before - self.entries.len()) as u64;

        while self.entries.len() >= max {
            let soonest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match soonest {
                Some(key) => {
                    self.entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::debug!(evicted, "memory cache evicted entries at capacity");
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key.as_str())
            .map(|entry| (entry.is_expired(now), Arc::clone(&entry.data)));

        match found {
            Some((false, data)) => {
                self.record_hit();
                Ok(Some(data.as_ref().clone()))
            }
            Some((true, _)) => {
                self.entries
                    .remove_if(key.as_str(), |_, entry| entry.is_expired(now));
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.record_miss();
                Ok(None)
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_ENTRY_TTL))
            .ok_or_else(|| CacheError::Unavailable {
                reason: format!("entry TTL of {}s is not representable", ttl.as_secs()),
            })?;

        self.enforce_capacity(key.as_str());
        self.entries.insert(
            key.as_str().to_string(),
            MemoryEntry {
                data: Arc::new(value),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.remove(key.as_str());
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: Some(self.entries.len() as u64),
            evictions: self.evictions.load(Ordering::Relaxed),
            errors: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{Item, ItemId};

    fn key(id: i64) -> CacheKey {
        CacheKey::for_entity::<Item>(ItemId(id))
    }

    #[tokio::test]
    async fn test_set_get_delete() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::new();
        backend.set(&key(1), b"one".to_vec(), Duration::from_secs(300)).await?;

        assert_eq!(backend.get(&key(1)).await?, Some(b"one".to_vec()));
        backend.delete(&key(1)).await?;
        assert_eq!(backend.get(&key(1)).await?, None);

        let stats = backend.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::new();
        backend.delete(&key(404)).await?;
        assert!(backend.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::new();
        backend.set(&key(1), b"v".to_vec(), Duration::from_secs(300)).await?;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(backend.get(&key(1)).await?.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(backend.get(&key(1)).await?.is_none());
        assert!(backend.is_empty());
        assert_eq!(backend.stats().evictions, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_prefers_expired_then_soonest() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::with_capacity_limit(2);
        backend.set(&key(1), b"a".to_vec(), Duration::from_secs(10)).await?;
        backend.set(&key(2), b"b".to_vec(), Duration::from_secs(100)).await?;

        backend.set(&key(3), b"c".to_vec(), Duration::from_secs(100)).await?;
        assert_eq!(backend.len(), 2);
        assert!(backend.get(&key(1)).await?.is_none());
        assert!(backend.get(&key(2)).await?.is_some());
        assert!(backend.get(&key(3)).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::with_capacity_limit(1);
        backend.set(&key(1), b"a".to_vec(), Duration::from_secs(10)).await?;
        backend.set(&key(1), b"b".to_vec(), Duration::from_secs(10)).await?;
        assert_eq!(backend.get(&key(1)).await?, Some(b"b".to_vec()));
        assert_eq!(backend.stats().evictions, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_capped() -> Result<(), CacheError> {
        let backend = MemoryCacheBackend::new();
        backend.set(&key(1), b"a".to_vec(), Duration::from_secs(u64::MAX)).await?;
        assert!(backend.get(&key(1)).await?.is_some());

        tokio::time::advance(MAX_ENTRY_TTL).await;
        assert!(backend.get(&key(1)).await?.is_none());
        Ok(())
    }
}
