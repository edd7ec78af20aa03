//! Stockroom API Server Entry Point
//!
//! Loads configuration from the environment, wires the stores and cache,
//! and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use stockroom_api::telemetry::{init_tracer, TelemetryConfig};
use stockroom_api::{
    create_router, serve, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, CacheKind,
    CacheSettings, DbClient, DbConfig, PgItemStore, PgUserStore, SessionConfig, SessionStore,
    StoreKind,
};
use stockroom_storage::{
    CacheBackend, InMemoryItemStore, InMemoryUserStore, ItemStore, MemoryCacheBackend,
    RedisCacheBackend, UserStore,
};

/// How often expired web sessions are swept.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let (item_store, user_store) = build_stores(StoreKind::from_env()?).await?;
    let cache_settings = CacheSettings::from_env()?;
    let cache_backend = build_cache(&cache_settings)?;

    let state = AppState::new(
        item_store,
        cache_backend,
        cache_settings.cache,
        user_store,
        AuthConfig::from_env(),
        SessionStore::new(SessionConfig::from_env()?),
    );
    spawn_session_purge(state.sessions.clone());

    let app: Router = create_router(state, &api_config)?;

    let addr: SocketAddr = api_config.bind_addr.parse().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", api_config.bind_addr, e))
    })?;
    tracing::info!(%addr, environment = ?api_config.environment, "Starting Stockroom API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    serve(listener, app, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on ctrl-c. If the handler cannot be installed the server runs
/// until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining connections"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn build_stores(kind: StoreKind) -> ApiResult<(Arc<dyn ItemStore>, Arc<dyn UserStore>)> {
    match kind {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Ok((
                Arc::new(InMemoryItemStore::new()),
                Arc::new(InMemoryUserStore::new()),
            ))
        }
        StoreKind::Postgres => {
            let db = DbClient::from_config(&DbConfig::from_env())?;
            db.ensure_schema().await?;
            tracing::info!(pool_size = db.pool_size(), "Connected to Postgres");
            Ok((
                Arc::new(PgItemStore::new(db.clone())),
                Arc::new(PgUserStore::new(db)),
            ))
        }
    }
}

fn build_cache(settings: &CacheSettings) -> ApiResult<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match settings.kind {
        CacheKind::Memory => match settings.cache.max_entries {
            Some(max) => Arc::new(MemoryCacheBackend::with_capacity_limit(max)),
            None => Arc::new(MemoryCacheBackend::new()),
        },
        CacheKind::Redis => Arc::new(RedisCacheBackend::connect(&settings.redis)?),
    };
    tracing::info!(
        backend = backend.name(),
        ttl_secs = settings.cache.entry_ttl.as_secs(),
        policy = ?settings.cache.failure_policy,
        "Item cache configured"
    );
    Ok(backend)
}

fn spawn_session_purge(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Purged expired sessions");
            }
        }
    });
}
