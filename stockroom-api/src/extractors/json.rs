//! JSON body extractor with structured rejections.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Like `axum::Json`, but every rejection (bad syntax, wrong shape, missing
/// content type) becomes a 400 `VALIDATION_FAILED` error body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::validation_failed(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::{body::Body, http::StatusCode, routing::post, Router};
    use stockroom_core::ItemFields;
    use tower::ServiceExt;

    async fn post_body(content_type: Option<&str>, body: &str) -> Result<(StatusCode, Vec<u8>), String> {
        let app = Router::new().route(
            "/",
            post(|ApiJson(fields): ApiJson<ItemFields>| async move { fields.name }),
        );
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .map_err(|e| e.to_string())?;
        let response = app.oneshot(request).await.map_err(|e| format!("{:?}", e))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok((status, bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_valid_body() -> Result<(), String> {
        let (status, body) = post_body(Some("application/json"), r#"{"name":"Bolt"}"#).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Bolt");
        Ok(())
    }

    #[tokio::test]
    async fn test_rejections_are_validation_errors() -> Result<(), String> {
        for (ct, body) in [
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"quantity":3}"#),
            (None, r#"{"name":"Bolt"}"#),
        ] {
            let (status, body) = post_body(ct, body).await?;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let error: ApiError = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
            assert_eq!(error.code, ErrorCode::ValidationFailed);
        }
        Ok(())
    }
}
