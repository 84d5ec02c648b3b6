//! OpenAPI document for the HTTP surface.

use axum::Json;
use utoipa::OpenApi;

use super::handlers::{activations, health, sessions, user, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::create,
        users::get,
        users::patch,
        user::show,
        sessions::create,
        sessions::delete,
        activations::patch,
    ),
    tags(
        (name = "users", description = "Registration and public profiles"),
        (name = "user", description = "The authenticated user"),
        (name = "sessions", description = "Login and logout"),
        (name = "activations", description = "Account activation tokens"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Serve the generated document; the `openapi` binary prints the same one.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
