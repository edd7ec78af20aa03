//! HTTP Routes Module
//!
//! Includes:
//! - JSON API under `/api/` (accounts, tokens, items)
//! - Server-rendered web interface with cookie sessions
//! - Health checks (Kubernetes-compatible)
//! - Prometheus metrics and the OpenAPI document
//! - CORS support for browser-based clients

pub mod auth;
pub mod health;
pub mod item;
pub mod web;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::{ApiConfig, Environment};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use auth::create_router as auth_router;
pub use health::create_router as health_router;
pub use item::create_router as item_router;
pub use web::create_router as web_router;

// ============================================================================
// API ROOT AND OPENAPI
// ============================================================================

/// Body of `GET /api/`.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiRoot {
    pub message: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Welcome message and a map of the JSON endpoints.
#[utoipa::path(
    get,
    path = "/api/",
    tag = "Root",
    responses((status = 200, description = "API root", body = ApiRoot))
)]
pub async fn api_root() -> Json<ApiRoot> {
    let endpoints = [
        ("register", "/api/register/"),
        ("login", "/api/login/"),
        ("token_refresh", "/api/token/refresh/"),
        ("items", "/api/items/"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(ApiRoot {
        message: "Welcome to the Inventory Management API!".to_string(),
        endpoints,
    })
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set STOCKROOM_CORS_ORIGINS.",
        ));
    }
    Ok(())
}

// ============================================================================
// ROUTER BUILDER
// ============================================================================

/// Builds the application router with the security and observability stack.
///
/// Item routes under `/api/items/` always sit behind bearer authentication
/// and the item pages always sit behind a session; there is no way to build
/// the router without them.
pub struct RouterBuilder {
    state: AppState,
    api_config: ApiConfig,
}

impl RouterBuilder {
    /// In production, refuses to build with an insecure JWT secret or
    /// without explicit CORS origins.
    pub fn new(state: AppState, api_config: ApiConfig) -> ApiResult<Self> {
        // Only warns outside production.
        state.auth_config.validate_for_production()?;
        if api_config.environment == Environment::Production {
            validate_api_config_for_production(&api_config)?;
        }

        Ok(Self { state, api_config })
    }

    /// JSON API routes. Only item routes need a bearer token.
    fn build_api_routes(&self) -> Router<AppState> {
        let auth_state = AuthMiddlewareState::new(self.state.auth_config.clone());

        let items = item::create_router()
            .route_layer(from_fn_with_state(auth_state, auth_middleware));

        Router::new()
            .route("/api/", get(api_root))
            .merge(auth::create_router())
            .merge(items)
    }

    /// # Middleware Order (outer to inner)
    /// 1. CORS: answers preflight requests
    /// 2. Trace: request spans from tower-http
    /// 3. Observability: normalized-path metrics and logs
    /// 4. Bearer auth or session, per route group
    pub fn build(self) -> Router {
        let router = Router::new()
            .merge(self.build_api_routes())
            .merge(web::create_router(&self.state))
            .nest("/health", health::create_router(&self.state))
            .route("/metrics", get(metrics_handler))
            .route("/openapi.json", get(openapi_json))
            .with_state(self.state);

        router
            .layer(from_fn(observability_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&self.api_config))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow any origin (development). Otherwise only the listed
/// origins are allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: allowing configured origins");
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if config.cors_allow_credentials {
        cors.allow_origin(origins).allow_credentials(true)
    } else {
        cors.allow_origin(origins)
    }
}

/// Create the complete application router.
///
/// - `/api/register/`, `/api/login/`, `/api/token/refresh/` (public)
/// - `/api/items/*` (bearer token)
/// - `/signup/`, `/signin/`, `/signout/` (public) and the item pages (session)
/// - `/health/*`, `/metrics`, `/openapi.json` (public)
pub fn create_router(state: AppState, api_config: &ApiConfig) -> ApiResult<Router> {
    RouterBuilder::new(state, api_config.clone()).map(RouterBuilder::build)
}

/// Serve `app` until `shutdown` resolves.
///
/// Stops accepting connections once `shutdown` completes and waits for
/// in-flight requests before returning.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
}
