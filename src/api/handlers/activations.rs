//! Activation token consumption.

use axum::{
    Json,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::{
    ApiError, Principal, activation, features::Feature, user,
};

/// Consume an activation token and upgrade the owning user's feature set.
///
/// Ordering is load-bearing: the token must be found valid before anything
/// is written, and the already-activated check must run before the token is
/// burned, so a retried request against an activated account gets a 403
/// instead of a false success. The conditional mark-as-used update then
/// guarantees at most one winner under concurrency; a crash between steps
/// leaves a retry to land on the idempotent 404 or 403.
#[utoipa::path(
    patch,
    path = "/activations/{token_id}",
    params(("token_id" = String, Path, description = "Activation token id")),
    responses(
        (status = 200, description = "Token consumed", body = activation::ActivationToken),
        (status = 403, description = "Account already activated"),
        (status = 404, description = "Token missing, expired or already used"),
    ),
    tag = "activations"
)]
pub async fn patch(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(token_id): Path<String>,
) -> Result<Response, ApiError> {
    principal.require(Feature::ReadActivationToken)?;

    // Malformed ids and unknown ids are the same 404.
    let Ok(token_id) = Uuid::parse_str(token_id.trim()) else {
        return Err(activation::token_not_found());
    };

    let valid_token = activation::find_one_valid_by_id(&pool, token_id).await?;

    let owner = user::find_one_by_id(&pool, valid_token.user_id).await?;
    if !owner.features.contains(Feature::ReadActivationToken) {
        return Err(ApiError::forbidden());
    }

    let used_token = activation::mark_token_as_used(&pool, token_id).await?;
    activation::activate_user_by_user_id(&pool, valid_token.user_id).await?;

    Ok(Json(used_token).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::features::activated_features;
    use crate::accounts::session::test_support::session_for;
    use crate::accounts::user::test_support::user_with_features;
    use crate::api::test_support::lazy_pool;
    use anyhow::Result;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn malformed_token_ids_are_not_found() -> Result<()> {
        let err = patch(
            Extension(lazy_pool()?),
            Extension(Principal::Anonymous),
            Path("definitely-not-a-uuid".to_string()),
        )
        .await
        .expect_err("malformed ids are a 404");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "NotFoundError");
        Ok(())
    }

    #[tokio::test]
    async fn activated_principals_may_not_consume_tokens() -> Result<()> {
        // Activation removed read:activation_token from this account.
        let user = user_with_features(activated_features());
        let session = session_for(user.id);
        let err = patch(
            Extension(lazy_pool()?),
            Extension(Principal::Authenticated { user, session }),
            Path(Uuid::new_v4().to_string()),
        )
        .await
        .expect_err("activated principals lack read:activation_token");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.body()["action"]
            .as_str()
            .is_some_and(|action| action.contains("read:activation_token")));
        Ok(())
    }
}
