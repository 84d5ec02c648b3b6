//! Registration and public user endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::accounts::{
    ApiError, Principal, activation,
    features::Feature,
    user::{self, NewUser, UserPatch},
};
use crate::api::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[schema(value_type = String)]
    pub password: SecretString,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[schema(value_type = Option<String>)]
    pub password: Option<SecretString>,
}

/// Register a new user and fire the activation email.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = user::User),
        (status = 400, description = "Validation failed or identity already in use"),
        (status = 403, description = "Principal lacks create:user"),
    ),
    tag = "users"
)]
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Option<Json<CreateUserRequest>>,
) -> Result<Response, ApiError> {
    principal.require(Feature::CreateUser)?;

    let Some(Json(input)) = payload else {
        return Err(missing_payload());
    };

    let new_user = user::create(
        &pool,
        state.config(),
        NewUser {
            username: input.username,
            email: input.email,
            password: input.password,
        },
    )
    .await?;

    let token = activation::create(&pool, state.config(), new_user.id).await?;
    activation::send_email_to_user(state.mailer(), state.config(), &new_user, &token);

    Ok((StatusCode::CREATED, Json(new_user)).into_response())
}

/// Public profile lookup, case-insensitive on the username.
#[utoipa::path(
    get,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Username to look up")),
    responses(
        (status = 200, description = "User found", body = user::User),
        (status = 404, description = "Unknown username"),
    ),
    tag = "users"
)]
pub async fn get(
    Extension(pool): Extension<PgPool>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let found = user::find_one_by_username(&pool, &username).await?;
    Ok(Json(found).into_response())
}

/// Partial profile update. Re-submitting one's own current username or email
/// is not a collision.
#[utoipa::path(
    patch,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Username to update")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = user::User),
        (status = 400, description = "Validation failed or identity already in use"),
        (status = 404, description = "Unknown username"),
    ),
    tag = "users"
)]
pub async fn patch(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AppState>>,
    Path(username): Path<String>,
    payload: Option<Json<UpdateUserRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(input)) = payload else {
        return Err(missing_payload());
    };

    let updated = user::update(
        &pool,
        state.config(),
        &username,
        UserPatch {
            username: input.username,
            email: input.email,
            password: input.password,
        },
    )
    .await?;

    Ok(Json(updated).into_response())
}

pub(super) fn missing_payload() -> ApiError {
    ApiError::validation(
        "Missing request payload.",
        "Send a JSON body and try again.",
    )
}
