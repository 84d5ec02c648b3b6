//! Login and logout.

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use super::users::missing_payload;
use crate::accounts::{
    ApiError, Principal, authentication, features::Feature, session,
};
use crate::api::{AppState, cookies};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub email: String,
    #[schema(value_type = String)]
    pub password: SecretString,
}

/// Exchange credentials for a session cookie.
///
/// Authentication failures are deliberately indistinguishable; a valid
/// credential pair on an un-activated account is a 403, not a 401.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = session::Session),
        (status = 401, description = "Credentials do not match"),
        (status = 403, description = "Account not activated"),
    ),
    tag = "sessions"
)]
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Option<Json<CreateSessionRequest>>,
) -> Result<Response, ApiError> {
    principal.require(Feature::CreateSession)?;

    let Some(Json(credentials)) = payload else {
        return Err(missing_payload());
    };

    let authenticated =
        authentication::get_authenticated_user(&pool, &credentials.email, &credentials.password)
            .await?;

    if !authenticated.features.contains(Feature::CreateSession) {
        return Err(ApiError::forbidden());
    }

    let new_session = session::create(&pool, state.config(), authenticated.id).await?;

    let cookie = cookies::session_cookie(&new_session.token, state.config().session_ttl_seconds())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("invalid session cookie: {err}")))?;

    let mut response = (StatusCode::CREATED, Json(new_session)).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// Invalidate the current session and clear the cookie.
#[utoipa::path(
    delete,
    path = "/sessions",
    responses(
        (status = 200, description = "Session expired", body = session::Session),
        (status = 401, description = "Missing or invalid session"),
    ),
    tag = "sessions"
)]
pub async fn delete(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let Some(current) = principal.session() else {
        return Err(ApiError::credentials_mismatch());
    };

    let expired = session::expire_by_id(&pool, state.config(), current.id).await?;

    let mut response = (StatusCode::OK, Json(expired)).into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, cookies::clear_session_cookie());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{lazy_pool, state};
    use anyhow::Result;

    #[tokio::test]
    async fn login_rejects_missing_payload() -> Result<()> {
        let err = create(
            Extension(lazy_pool()?),
            Extension(state()),
            Extension(Principal::Anonymous),
            None,
        )
        .await
        .expect_err("missing payload is a validation error");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn logout_without_a_session_is_unauthorized() -> Result<()> {
        let err = delete(
            Extension(lazy_pool()?),
            Extension(state()),
            Extension(Principal::Anonymous),
        )
        .await
        .expect_err("anonymous principals hold no session");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.body(),
            ApiError::credentials_mismatch().body(),
            "logout failure reuses the generic credential error"
        );
        Ok(())
    }
}
