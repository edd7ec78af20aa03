//! Session middleware for the web interface.
//!
//! Resolves the `stockroom_session` cookie into an [`AuthContext`]. Requests
//! without a live session are redirected to the sign-in page instead of
//! receiving a JSON error.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::sessions::{SessionStore, SESSION_COOKIE_NAME};

/// Where unauthenticated web requests are sent.
pub const SIGNIN_PATH: &str = "/signin/";

/// Require a live session, redirecting to [`SIGNIN_PATH`] otherwise.
pub async fn session_middleware(
    State(sessions): State<Arc<SessionStore>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let context = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| sessions.resolve(cookie.value()));

    match context {
        Some(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "No session, redirecting to sign-in");
            Redirect::to(SIGNIN_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::AuthExtractor;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use stockroom_core::{User, UserId};
    use tower::ServiceExt;

    fn app(sessions: Arc<SessionStore>) -> Router {
        Router::new()
            .route(
                "/",
                get(|AuthExtractor(auth): AuthExtractor| async move { auth.username }),
            )
            .layer(middleware::from_fn_with_state(sessions, session_middleware))
    }

    fn user() -> User {
        User {
            id: UserId(1),
            username: "testuser".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            date_joined: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_redirects_without_cookie() -> Result<(), String> {
        let request = HttpRequest::builder()
            .uri("/")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app(Arc::new(SessionStore::default()))
            .oneshot(request)
            .await
            .map_err(|e| format!("{:?}", e))?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some(SIGNIN_PATH)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_passes_with_live_session() -> Result<(), String> {
        let sessions = Arc::new(SessionStore::default());
        let id = sessions.create(&user());

        let request = HttpRequest::builder()
            .uri("/")
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE_NAME, id))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app(sessions)
            .oneshot(request)
            .await
            .map_err(|e| format!("{:?}", e))?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_redirects_with_unknown_session() -> Result<(), String> {
        let request = HttpRequest::builder()
            .uri("/")
            .header(header::COOKIE, format!("{}=deadbeef", SESSION_COOKIE_NAME))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app(Arc::new(SessionStore::default()))
            .oneshot(request)
            .await
            .map_err(|e| format!("{:?}", e))?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        Ok(())
    }
}
