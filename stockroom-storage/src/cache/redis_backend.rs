//! Redis-backed cache shared by every service instance.
//!
//! Connections come from a `deadpool-redis` pool. Every command is awaited
//! before returning, so a `delete` issued by an update has completed by the
//! time the update responds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use stockroom_core::CacheError;

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats};

/// Connection settings for the Redis backend.
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    pub pool_size: usize,
    pub timeout: Duration,
    /// Namespace prepended to every key, e.g. `stockroom:item_7`.
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/1".to_string(),
            pool_size: 16,
            timeout: Duration::from_millis(500),
            key_prefix: "stockroom".to_string(),
        }
    }
}

/// Cache backend speaking to a Redis server.
pub struct RedisCacheBackend {
    pool: Pool,
    key_prefix: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn unavailable(err: impl std::fmt::Display) -> CacheError {
    CacheError::Unavailable {
        reason: err.to_string(),
    }
}

impl RedisCacheBackend {
    /// Build a pool for the configured server. Does not connect yet.
    pub fn connect(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let mut redis_config = Config::from_url(&config.url);
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(config.timeout);
        pool_config.timeouts.create = Some(config.timeout);
        pool_config.timeouts.recycle = Some(config.timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(unavailable)?;

        Ok(Self::from_pool(pool, config.key_prefix.clone()))
    }

    pub fn from_pool(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(unavailable)
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        key.prefixed(&self.key_prefix)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = conn.get(self.redis_key(key)).await.map_err(unavailable)?;
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.redis_key(key), value, ttl_secs)
            .await
            .map_err(unavailable)?;
        tracing::trace!(key = %key, ttl_secs, "redis cache set");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.redis_key(key))
            .await
            .map_err(unavailable)?;
        tracing::trace!(key = %key, "redis cache delete");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        // Pool recycling pings the server before handing out a connection.
        self.conn().await.map(|_| ())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: None,
            evictions: 0,
            errors: 0,
        }
    }
}
