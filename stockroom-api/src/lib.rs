//! Stockroom API - HTTP Layer
//!
//! Serves the inventory service two ways over one item service:
//! a JSON API authenticated with JWT bearer tokens, and server-rendered
//! pages authenticated with cookie sessions. Item reads go through a
//! read-through cache in front of the store.

#[macro_use]
mod macros;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod passwords;
pub mod routes;
pub mod service;
pub mod sessions;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, issue_token_pair, refresh_access_token, validate_jwt_token,
    AuthConfig, AuthContext, AuthMethod, Claims, TokenPair, TokenType,
};
pub use config::{ApiConfig, CacheKind, CacheSettings, Environment, StoreKind};
pub use db::{DbClient, DbConfig, PgItemStore, PgUserStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, session_middleware, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use routes::{create_router, serve};
pub use service::{ItemOperations, ItemService, LoggedItemService};
pub use sessions::{SessionConfig, SessionStore, SESSION_COOKIE_NAME};
pub use state::AppState;
