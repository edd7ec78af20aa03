//! Path extractor for item ids.
//!
//! Unlike the standard `Path<i64>` extractor, `PathId` answers a bad id with
//! the API's structured 400 body instead of axum's plain-text rejection.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use stockroom_core::ItemId;

use crate::error::ApiError;

/// Extractor for the `:id` path segment.
///
/// ```rust,ignore
/// async fn get_item(PathId(id): PathId) -> ApiResult<Json<Item>> { ... }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub ItemId);

fn invalid_id(raw: &str, reason: impl std::fmt::Display) -> ApiError {
    ApiError::validation_failed(format!("Invalid item id '{}': {}", raw, reason))
        .with_details(serde_json::json!({ "field": "id" }))
}

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| invalid_id(parts.uri.path(), e))?;

        raw.parse::<ItemId>()
            .map(PathId)
            .map_err(|e| invalid_id(&raw, e))
    }
}
