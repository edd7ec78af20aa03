//! Read-through item cache.
//!
//! The persistence store is authoritative; the cache is a latency side channel
//! keyed by entity id (`item_{id}`) with a fixed entry lifetime. It is never
//! consulted to decide existence or to serve writes.
//!
//! # Layers
//!
//! - [`CacheBackend`]: byte-level key/value store with per-entry TTL
//!   ([`MemoryCacheBackend`] for a single process, [`RedisCacheBackend`] shared)
//! - [`ReadThroughCache`]: typed check-then-fetch-then-populate reads and
//!   explicit invalidation, with a [`CacheFailurePolicy`] for backend outages
//! - [`CacheRead<T>`]: the value plus hit/miss and staleness metadata
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::new(Arc::new(MemoryCacheBackend::new()), CacheConfig::default());
//! let read = cache.get::<Item, _>(id, &fetcher).await?;
//!
//! // after a successful store write:
//! cache.invalidate::<Item>(id).await?;
//! ```

pub mod freshness;
pub mod key;
pub mod memory_backend;
pub mod read_through;
pub mod redis_backend;
pub mod traits;

pub use freshness::CacheRead;
pub use key::CacheKey;
pub use memory_backend::MemoryCacheBackend;
pub use read_through::{
    CacheConfig, CacheFailurePolicy, ReadThroughCache, StorageFetcher, DEFAULT_ENTRY_TTL,
    MAX_ENTRY_TTL,
};
pub use redis_backend::{RedisCacheBackend, RedisCacheConfig};
pub use traits::{CacheBackend, CacheStats, CacheableEntity};
