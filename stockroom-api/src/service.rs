//! Item Service
//!
//! Mediates every read and write of item data. Reads go cache-then-store
//! through a [`ReadThroughCache`]; writes go store-then-invalidate.
//!
//! The service trusts its caller: authentication happens in the HTTP layer
//! before any of these operations run. The `actor` argument is carried for
//! logging only.
//!
//! Cross-cutting logging and metrics live in [`LoggedItemService`], which
//! wraps any [`ItemOperations`] implementation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use stockroom_core::{
    Item, ItemFields, ItemId, StockroomError, StockroomResult, StorageError,
};
use stockroom_storage::{
    CacheBackend, CacheConfig, CacheRead, CacheStats, ItemStore, ReadThroughCache, StorageFetcher,
};
use tracing::{info_span, Instrument};

use crate::auth::AuthContext;
use crate::telemetry::METRICS;

/// The item operations exposed to handlers.
#[async_trait]
pub trait ItemOperations: Send + Sync {
    /// Read one item, from the cache when possible.
    ///
    /// Fails with `StorageError::NotFound` when the store has no such item.
    async fn get(&self, actor: &AuthContext, id: ItemId) -> StockroomResult<CacheRead<Item>>;

    /// Validate and insert a new item. Surrounding whitespace is stripped
    /// from the name first.
    async fn create(&self, actor: &AuthContext, fields: ItemFields) -> StockroomResult<Item>;

    /// Replace every mutable field, then drop the cached entry.
    ///
    /// The name is compared in trimmed form. Under
    /// `CacheFailurePolicy::Fail` a failed invalidation returns an error even
    /// though the store write has already committed; callers must not treat
    /// that error as a rolled-back update.
    async fn update(
        &self,
        actor: &AuthContext,
        id: ItemId,
        fields: ItemFields,
    ) -> StockroomResult<Item>;

    /// Remove the item, then drop the cached entry.
    ///
    /// As with [`update`](Self::update), a `CacheError` under
    /// `CacheFailurePolicy::Fail` means the row is already gone.
    async fn delete(&self, actor: &AuthContext, id: ItemId) -> StockroomResult<()>;

    /// All items straight from the store. Collections are never cached.
    async fn list(&self, actor: &AuthContext) -> StockroomResult<Vec<Item>>;
}

// ============================================================================
// STORE FETCHER
// ============================================================================

/// Adapts an [`ItemStore`] to the cache's fetch interface.
struct ItemFetcher<'a> {
    store: &'a dyn ItemStore,
}

#[async_trait]
impl StorageFetcher<Item> for ItemFetcher<'_> {
    async fn fetch(&self, id: ItemId) -> StockroomResult<Option<Item>> {
        Ok(self.store.get(id).await?)
    }
}

// ============================================================================
// ITEM SERVICE
// ============================================================================

/// Read-through cached item service.
///
/// Constructed explicitly from a store and a cache backend; holds no global
/// state. Clones share the same store and backend.
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn ItemStore>,
    cache: Arc<ReadThroughCache>,
}

impl ItemService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        backend: Arc<dyn CacheBackend>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            cache: Arc::new(ReadThroughCache::new(backend, config)),
        }
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl ItemOperations for ItemService {
    async fn get(&self, _actor: &AuthContext, id: ItemId) -> StockroomResult<CacheRead<Item>> {
        let fetcher = ItemFetcher {
            store: self.store.as_ref(),
        };
        self.cache
            .get::<Item, _>(id, &fetcher)
            .await?
            .ok_or_else(|| StorageError::item_not_found(id).into())
    }

    async fn create(&self, _actor: &AuthContext, fields: ItemFields) -> StockroomResult<Item> {
        let fields = fields.normalized();
        fields.validate()?;
        // A new id has nothing cached yet.
        Ok(self.store.insert(fields).await?)
    }

    async fn update(
        &self,
        _actor: &AuthContext,
        id: ItemId,
        fields: ItemFields,
    ) -> StockroomResult<Item> {
        let fields = fields.normalized();
        fields.validate()?;
        let item = self.store.replace(id, fields).await?;
        self.cache.invalidate::<Item>(id).await?;
        Ok(item)
    }

    async fn delete(&self, _actor: &AuthContext, id: ItemId) -> StockroomResult<()> {
        self.store.delete(id).await?;
        self.cache.invalidate::<Item>(id).await
    }

    async fn list(&self, _actor: &AuthContext) -> StockroomResult<Vec<Item>> {
        Ok(self.store.list().await?)
    }
}

// ============================================================================
// LOGGING DECORATOR
// ============================================================================

/// Wraps an [`ItemOperations`] implementation with spans, outcome logs, and
/// Prometheus counters.
pub struct LoggedItemService<S> {
    inner: S,
}

impl<S: ItemOperations> LoggedItemService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Metric label for an operation result.
fn outcome_label<T>(result: &StockroomResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(StockroomError::Storage(StorageError::NotFound { .. })) => "not_found",
        Err(StockroomError::Storage(StorageError::Conflict { .. })) => "conflict",
        Err(StockroomError::Validation(_)) => "invalid",
        Err(_) => "error",
    }
}

fn record<T>(operation: &'static str, started: Instant, result: &StockroomResult<T>) {
    let outcome = outcome_label(result);
    let elapsed = started.elapsed();

    match result {
        Ok(_) => tracing::info!(
            outcome,
            duration_ms = elapsed.as_millis() as u64,
            "item {} succeeded",
            operation
        ),
        Err(e) if outcome == "error" => tracing::error!(
            outcome,
            error = %e,
            duration_ms = elapsed.as_millis() as u64,
            "item {} failed",
            operation
        ),
        Err(e) => tracing::info!(
            outcome,
            error = %e,
            duration_ms = elapsed.as_millis() as u64,
            "item {} rejected",
            operation
        ),
    }

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_item_operation(operation, outcome, elapsed.as_secs_f64());
    }
}

#[async_trait]
impl<S: ItemOperations> ItemOperations for LoggedItemService<S> {
    async fn get(&self, actor: &AuthContext, id: ItemId) -> StockroomResult<CacheRead<Item>> {
        let span = info_span!("item.get", item_id = %id, actor = %actor.username);
        async {
            let started = Instant::now();
            let result = self.inner.get(actor, id).await;
            if let Ok(read) = &result {
                tracing::debug!(
                    cache_hit = read.was_cache_hit(),
                    staleness_ms = read.staleness().as_millis() as u64,
                    "item read"
                );
                if let Ok(metrics) = METRICS.as_ref() {
                    metrics.record_item_read(read.was_cache_hit());
                }
            }
            record("get", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn create(&self, actor: &AuthContext, fields: ItemFields) -> StockroomResult<Item> {
        let span = info_span!(
            "item.create",
            item_name = %fields.name,
            item_id = tracing::field::Empty,
            actor = %actor.username
        );
        async {
            let started = Instant::now();
            let result = self.inner.create(actor, fields).await;
            if let Ok(item) = &result {
                tracing::Span::current().record("item_id", item.id.as_i64());
            }
            record("create", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        actor: &AuthContext,
        id: ItemId,
        fields: ItemFields,
    ) -> StockroomResult<Item> {
        let span = info_span!("item.update", item_id = %id, actor = %actor.username);
        async {
            let started = Instant::now();
            let result = self.inner.update(actor, id, fields).await;
            record("update", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, actor: &AuthContext, id: ItemId) -> StockroomResult<()> {
        let span = info_span!("item.delete", item_id = %id, actor = %actor.username);
        async {
            let started = Instant::now();
            let result = self.inner.delete(actor, id).await;
            record("delete", started, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn list(&self, actor: &AuthContext) -> StockroomResult<Vec<Item>> {
        let span = info_span!("item.list", actor = %actor.username, count = tracing::field::Empty);
        async {
            let started = Instant::now();
            let result = self.inner.list(actor).await;
            if let Ok(items) = &result {
                tracing::Span::current().record("count", items.len() as u64);
            }
            record("list", started, &result);
            result
        }
        .instrument(span)
        .await
    }
}

// ============================================================================
// TESTS
// ============================================================================
