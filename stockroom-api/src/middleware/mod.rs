//! Middleware modules for the Stockroom API
//!
//! - `auth`: bearer token authentication for the JSON API
//! - `session`: cookie session authentication for the web interface
//!
//! Both inject an `AuthContext` into request extensions, read back by
//! `AuthExtractor`.
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/items/", get(list_items))
//!     // Innermost (runs last on request, first on response)
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     .layer(middleware::from_fn(observability_middleware))
//!     // Outermost
//! ```

mod auth;
mod session;

pub use auth::{
    auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareError,
    AuthMiddlewareState,
};
pub use session::{session_middleware, SIGNIN_PATH};
