//! Item REST API Routes
//!
//! CRUD over `/api/items/`. Every handler sits behind bearer authentication
//! and delegates to the item service; a single-item GET may be answered from
//! the cache.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use stockroom_core::{Item, ItemFields};

use crate::{
    error::{ApiError, ApiResult},
    extractors::{ApiJson, PathId},
    middleware::AuthExtractor,
    service::ItemOperations,
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/items/ - List all items
#[utoipa::path(
    get,
    path = "/api/items/",
    tag = "Items",
    responses(
        (status = 200, description = "All items ordered by id", body = Vec<Item>),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_items(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(items.list(&auth).await?))
}

/// POST /api/items/ - Create an item
#[utoipa::path(
    post,
    path = "/api/items/",
    tag = "Items",
    request_body = ItemFields,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid fields", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 409, description = "An item with this name already exists", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    ApiJson(fields): ApiJson<ItemFields>,
) -> ApiResult<impl IntoResponse> {
    let item = items.create(&auth, fields).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/items/{id}/ - Get an item
#[utoipa::path(
    get,
    path = "/api/items/{id}/",
    tag = "Items",
    params(("id" = i64, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Item not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId,
) -> ApiResult<Json<Item>> {
    let read = items.get(&auth, id).await?;
    Ok(Json(read.into_value()))
}

/// PUT /api/items/{id}/ - Replace an item's fields
#[utoipa::path(
    put,
    path = "/api/items/{id}/",
    tag = "Items",
    params(("id" = i64, Path, description = "Item ID")),
    request_body = ItemFields,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 400, description = "Invalid fields", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Item not found", body = ApiError),
        (status = 409, description = "Another item already has this name", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId,
    ApiJson(fields): ApiJson<ItemFields>,
) -> ApiResult<Json<Item>> {
    Ok(Json(items.update(&auth, id, fields).await?))
}

/// DELETE /api/items/{id}/ - Delete an item
#[utoipa::path(
    delete,
    path = "/api/items/{id}/",
    tag = "Items",
    params(("id" = i64, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Item not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId,
) -> ApiResult<StatusCode> {
    items.delete(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the item routes. Authentication is layered on by the caller.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/items/", get(list_items).post(create_item))
        .route(
            "/api/items/:id/",
            get(get_item).put(update_item).delete(delete_item),
        )
}
