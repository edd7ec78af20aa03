//! OpenAPI document for the Stockroom JSON API.
//!
//! Generated by utoipa from route annotations and schema derives. The web
//! pages are not part of the document.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use stockroom_core::{Item, ItemFields, ItemId, RegisterFields};

use crate::auth::TokenPair;
use crate::error::{ApiError, ErrorCode};
use crate::routes::{self, auth, health, item};
use crate::telemetry::metrics;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = "Inventory items with token authentication and a read-through cache",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Root", description = "API entry point"),
        (name = "Auth", description = "Registration and JWT issuance"),
        (name = "Items", description = "Inventory item CRUD"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        routes::api_root,

        auth::register,
        auth::login,
        auth::refresh,

        item::list_items,
        item::create_item,
        item::get_item,
        item::update_item,
        item::delete_item,

        health::ping,
        health::liveness,
        health::readiness,

        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Item, ItemFields, ItemId,
            RegisterFields, TokenPair,
            auth::RegisteredUser, auth::LoginRequest, auth::RefreshRequest, auth::AccessToken,
            routes::ApiRoot,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by item routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/login/"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
