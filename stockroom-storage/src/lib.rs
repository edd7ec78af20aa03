//! Stockroom Storage - Store Traits, In-Memory Stores, and the Item Cache
//!
//! Defines the persistence abstraction the service depends on. The Postgres
//! implementations live in stockroom-api next to the connection pool.

pub mod cache;
pub mod memory;
pub mod store;

pub use memory::{InMemoryItemStore, InMemoryUserStore};
pub use store::{ItemStore, UserStore};

// Re-export cache types for API integration
pub use cache::{
    CacheBackend, CacheConfig, CacheFailurePolicy, CacheKey, CacheRead, CacheStats,
    CacheableEntity, MemoryCacheBackend, ReadThroughCache, RedisCacheBackend, RedisCacheConfig,
    StorageFetcher, DEFAULT_ENTRY_TTL, MAX_ENTRY_TTL,
};
