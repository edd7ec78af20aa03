//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use stockroom_storage::{CacheBackend, CacheConfig, ItemStore, UserStore};

use crate::auth::AuthConfig;
use crate::service::{ItemOperations, ItemService, LoggedItemService};
use crate::sessions::SessionStore;

/// Application-wide state shared across all routes.
///
/// Every dependency is constructed by the caller and passed in; nothing here
/// reaches for a process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    /// Item operations as handlers see them: cached and logged.
    pub items: Arc<dyn ItemOperations>,
    /// Authoritative item store, used directly only by readiness checks.
    pub item_store: Arc<dyn ItemStore>,
    pub cache_backend: Arc<dyn CacheBackend>,
    pub users: Arc<dyn UserStore>,
    pub auth_config: Arc<AuthConfig>,
    pub sessions: Arc<SessionStore>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the item service over `item_store` and `cache_backend`.
    pub fn new(
        item_store: Arc<dyn ItemStore>,
        cache_backend: Arc<dyn CacheBackend>,
        cache_config: CacheConfig,
        users: Arc<dyn UserStore>,
        auth_config: AuthConfig,
        sessions: SessionStore,
    ) -> Self {
        let service = ItemService::new(item_store.clone(), cache_backend.clone(), cache_config);
        Self {
            items: Arc::new(LoggedItemService::new(service)),
            item_store,
            cache_backend,
            users,
            auth_config: Arc::new(auth_config),
            sessions: Arc::new(sessions),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn ItemOperations>, items);
crate::impl_from_ref!(Arc<dyn UserStore>, users);
crate::impl_from_ref!(Arc<AuthConfig>, auth_config);
crate::impl_from_ref!(Arc<SessionStore>, sessions);
