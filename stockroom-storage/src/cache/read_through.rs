//! Read-through cache over a pluggable backend.
//!
//! Reads check the backend first and fall back to storage on a miss,
//! populating the backend with a TTL. Writers call [`ReadThroughCache::invalidate`]
//! only after their store write has been acknowledged.
//!
//! Entries are stored as a JSON envelope carrying the snapshot time, so a hit
//! can report how stale it is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockroom_core::{CacheError, StockroomResult};

use super::freshness::CacheRead;
use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, CacheableEntity};

/// Entry lifetime used when nothing else is configured.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(300);

/// Longest accepted entry lifetime (30 days).
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// What to do when the cache backend itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheFailurePolicy {
    /// Treat read failures as misses and log write or invalidation failures.
    /// The store keeps serving requests while the cache is down.
    #[default]
    Degrade,
    /// Surface every backend failure to the caller.
    Fail,
}

impl std::str::FromStr for CacheFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(CacheFailurePolicy::Degrade),
            "fail" => Ok(CacheFailurePolicy::Fail),
            other => Err(format!("unknown cache failure policy '{}'", other)),
        }
    }
}

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub entry_ttl: Duration,
    /// Behavior when the backend errors.
    pub failure_policy: CacheFailurePolicy,
    /// Capacity bound for process-local backends.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: DEFAULT_ENTRY_TTL,
            failure_policy: CacheFailurePolicy::Degrade,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    pub fn with_failure_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the max entries for local backends.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }
}

/// Storage fetcher trait for retrieving entities from the underlying storage.
#[async_trait]
pub trait StorageFetcher<T: CacheableEntity>: Send + Sync {
    /// Fetch an entity from storage by ID.
    async fn fetch(&self, id: T::Id) -> StockroomResult<Option<T>>;
}

#[derive(Serialize, Deserialize)]
struct CachedEnvelope<T> {
    cached_at: DateTime<Utc>,
    value: T,
}

/// Read-through cache with explicit invalidation.
///
/// ```ignore
/// let cache = ReadThroughCache::new(Arc::new(MemoryCacheBackend::new()), CacheConfig::default());
/// let read = cache.get::<Item, _>(item_id, &fetcher).await?;
/// if let Some(read) = read {
///     tracing::debug!(hit = read.was_cache_hit(), "item read");
/// }
/// ```
pub struct ReadThroughCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    errors: AtomicU64,
}

impl ReadThroughCache {
    /// Create a new read-through cache.
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            errors: AtomicU64::new(0),
        }
    }

    /// Create a new read-through cache with default configuration.
    pub fn with_defaults(backend: Arc<dyn CacheBackend>) -> Self {
        Self::new(backend, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Backend statistics plus failures seen at this layer.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.backend.stats();
        stats.errors += self.errors.load(Ordering::Relaxed);
        stats
    }

    /// Get an entity from the cache, falling back to storage on miss.
    ///
    /// Returns `Ok(None)` when storage has no such entity. Existence is always
    /// decided by storage: the cache only short-circuits reads it can decode.
    pub async fn get<T, S>(&self, id: T::Id, storage: &S) -> StockroomResult<Option<CacheRead<T>>>
    where
        T: CacheableEntity,
        S: StorageFetcher<T> + ?Sized,
    {
        let key = CacheKey::for_entity::<T>(id);

        match self.backend.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<CachedEnvelope<T>>(&bytes) {
                Ok(envelope) => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(Some(CacheRead::from_cache(envelope.value, envelope.cached_at)));
                }
                Err(e) => {
                    // Undecodable entries are dropped and refetched.
                    tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    if let Err(e) = self.backend.delete(&key).await {
                        self.absorb("discard", &key, e)?;
                    }
                }
            },
            Ok(None) => tracing::debug!(key = %key, "cache miss"),
            Err(e) => self.absorb("get", &key, e)?,
        }

        let Some(entity) = storage.fetch(id).await? else {
            return Ok(None);
        };

        let read = CacheRead::from_storage(entity);
        self.populate(&key, &read).await?;
        Ok(Some(read))
    }

    /// Store a freshly fetched snapshot.
    async fn populate<T: CacheableEntity>(
        &self,
        key: &CacheKey,
        read: &CacheRead<T>,
    ) -> StockroomResult<()> {
        let envelope = CachedEnvelope {
            cached_at: read.cached_at(),
            value: read.value(),
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        match self.backend.set(key, bytes, self.config.entry_ttl).await {
            Ok(()) => {
                tracing::debug!(key = %key, ttl_secs = self.config.entry_ttl.as_secs(), "cache populated");
                Ok(())
            }
            Err(e) => self.absorb("set", key, e),
        }
    }

    /// Remove the entry for `id`. Removing an absent entry succeeds.
    ///
    /// Must be called after the corresponding store write has been
    /// acknowledged, never before.
    pub async fn invalidate<T: CacheableEntity>(&self, id: T::Id) -> StockroomResult<()> {
        let key = CacheKey::for_entity::<T>(id);
        match self.backend.delete(&key).await {
            Ok(()) => {
                tracing::debug!(key = %key, "cache invalidated");
                Ok(())
            }
            Err(e) => {
                if self.config.failure_policy == CacheFailurePolicy::Degrade {
                    // A failed invalidation leaves a stale entry for up to one TTL.
                    tracing::error!(
                        key = %key,
                        error = %e,
                        ttl_secs = self.config.entry_ttl.as_secs(),
                        "cache invalidation failed; entry may be stale until expiry"
                    );
                }
                self.absorb("delete", &key, e)
            }
        }
    }

    /// Apply the failure policy to a backend error.
    fn absorb(&self, op: &'static str, key: &CacheKey, err: CacheError) -> StockroomResult<()> {
        self.errors.fetch_add(1, Ordering::Relaxed);
        match self.config.failure_policy {
            CacheFailurePolicy::Degrade => {
                tracing::warn!(
                    backend = self.backend.name(),
                    op,
                    key = %key,
                    error = %err,
                    "cache backend error, continuing without cache"
                );
                Ok(())
            }
            CacheFailurePolicy::Fail => Err(err.into()),
        }
    }
}
