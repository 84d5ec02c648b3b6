//! The authenticated "who am I" endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{
        StatusCode,
        header::{CACHE_CONTROL, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::accounts::{ApiError, Principal, features::Feature, session, user};
use crate::api::{AppState, cookies};

/// Return the authenticated user and slide the session expiry forward.
///
/// Every successful call renews the session and re-sets the cookie with a
/// fresh `Max-Age`; the token itself never changes.
#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "Authenticated user", body = user::User),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Principal lacks read:session"),
    ),
    tag = "user"
)]
pub async fn show(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    principal.require(Feature::ReadSession)?;

    let Some(current) = principal.session() else {
        return Err(ApiError::credentials_mismatch());
    };

    let renewed = session::renew(&pool, state.config(), current.id).await?;
    let found = user::find_one_by_id(&pool, renewed.user_id).await?;

    let cookie = cookies::session_cookie(&renewed.token, state.config().session_ttl_seconds())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("invalid session cookie: {err}")))?;

    let mut response = (StatusCode::OK, Json(found)).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    response.headers_mut().insert(
        CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-store, no-cache, max-age=0, must-revalidate"),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::features::default_user_features;
    use crate::accounts::session::test_support::session_for;
    use crate::accounts::user::test_support::user_with_features;
    use crate::api::test_support::{lazy_pool, state};
    use anyhow::Result;

    #[tokio::test]
    async fn anonymous_requests_are_forbidden() -> Result<()> {
        let err = show(
            Extension(lazy_pool()?),
            Extension(state()),
            Extension(Principal::Anonymous),
        )
        .await
        .expect_err("anonymous principals lack read:session");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.body()["action"]
            .as_str()
            .is_some_and(|action| action.contains("read:session")));
        Ok(())
    }

    #[tokio::test]
    async fn unactivated_users_are_forbidden() -> Result<()> {
        let user = user_with_features(default_user_features());
        let session = session_for(user.id);
        let err = show(
            Extension(lazy_pool()?),
            Extension(state()),
            Extension(Principal::Authenticated { user, session }),
        )
        .await
        .expect_err("default feature set lacks read:session");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
