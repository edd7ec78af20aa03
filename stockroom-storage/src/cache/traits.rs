//! Cache backend trait and cacheable entity marker.
//!
//! Backends deal in opaque bytes under string keys with a per-entry TTL.
//! Serialization of entities happens one layer up, in the read-through cache,
//! so a backend never needs to know the types it stores.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use stockroom_core::{CacheError, Item, ItemId};

use super::key::CacheKey;

/// Marker trait for types that can be cached.
///
/// - `entity_type()` is the key prefix and must be the same for all instances
/// - `entity_id()` must return the store-assigned identifier of this instance
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier type used to build cache keys.
    type Id: fmt::Display + Copy + Send + Sync + 'static;

    /// Key prefix for this entity type.
    fn entity_type() -> &'static str;

    /// Get the unique identifier for this entity.
    fn entity_id(&self) -> Self::Id;
}

impl CacheableEntity for Item {
    type Id = ItemId;

    fn entity_type() -> &'static str {
        "item"
    }

    fn entity_id(&self) -> ItemId {
        self.id
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe for concurrent use by every worker and every
/// service instance sharing them. Deleting a missing key is a no-op.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Get the raw bytes for a key, or `None` when absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store bytes under a key, expiring after `ttl`.
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a key.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Get cache statistics.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache, when the backend can tell.
    pub entry_count: Option<u64>,
    /// Number of evictions due to expiry or capacity.
    pub evictions: u64,
    /// Backend failures absorbed or surfaced by the read-through layer.
    pub errors: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
