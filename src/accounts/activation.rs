//! Activation tokens and the account activation flow.
//!
//! A token is valid while `expires_at > NOW()` and `used_at IS NULL`, and
//! transitions to used exactly once: the update filters on both conditions,
//! so concurrent consumption attempts race safely and only one wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use tracing::{Instrument, info_span};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::ApiError;
use super::features::{Feature, activated_features};
use super::user::{self, User};
use crate::api::email::{EmailMessage, Mailer, send_detached};

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ActivationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TOKEN_COLUMNS: &str = "id, user_id, used_at, expires_at, created_at, updated_at";

pub async fn create(
    pool: &PgPool,
    config: &AuthConfig,
    user_id: Uuid,
) -> Result<ActivationToken, ApiError> {
    let query = format!(
        r"
        INSERT INTO user_activation_tokens (user_id, expires_at)
        VALUES ($1, NOW() + ($2 * INTERVAL '1 second'))
        RETURNING {TOKEN_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(config.activation_ttl_seconds())
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(decode_token(&row))
}

/// Find a token that is still consumable. Missing, expired and already-used
/// tokens all produce the same 404 so the response leaks no token state.
pub async fn find_one_valid_by_id(pool: &PgPool, id: Uuid) -> Result<ActivationToken, ApiError> {
    let query = format!(
        r"
        SELECT {TOKEN_COLUMNS}
        FROM user_activation_tokens
        WHERE id = $1
          AND expires_at > NOW()
          AND used_at IS NULL
        LIMIT 1
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_token(&row))
        .ok_or_else(token_not_found)
}

/// Consume the token. The conditional update is the single-use guarantee:
/// zero rows means another request already burned it (or it expired), which
/// surfaces as the same 404 as a missing token.
pub async fn mark_token_as_used(pool: &PgPool, id: Uuid) -> Result<ActivationToken, ApiError> {
    let query = format!(
        r"
        UPDATE user_activation_tokens
        SET used_at = timezone('utc', now()),
            updated_at = timezone('utc', now())
        WHERE id = $1
          AND expires_at > NOW()
          AND used_at IS NULL
        RETURNING {TOKEN_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_token(&row))
        .ok_or_else(token_not_found)
}

/// Grant the activated feature set to `user_id`.
///
/// Requires the user to still hold `read:activation_token`; activation
/// removes that capability, so a second activation attempt is a 403 rather
/// than a silent re-grant.
pub async fn activate_user_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<User, ApiError> {
    let user_to_activate = user::find_one_by_id(pool, user_id).await?;

    if !user_to_activate.features.contains(Feature::ReadActivationToken) {
        return Err(ApiError::forbidden());
    }

    user::set_features(pool, user_id, &activated_features()).await
}

/// Compose the activation email for a freshly registered user.
#[must_use]
pub fn build_activation_email(
    config: &AuthConfig,
    created_user: &User,
    token: &ActivationToken,
) -> EmailMessage {
    let base = config.base_url().trim_end_matches('/');
    EmailMessage {
        from: config.mail_from().to_string(),
        to: created_user.email.clone(),
        subject: "Activate your account".to_string(),
        text: format!(
            "{username}, click the link below to activate your account:\n\n\
             {base}/register/activate/{token_id}\n\n\
             Regards,\nPortico",
            username = created_user.username,
            token_id = token.id,
        ),
    }
}

/// Deliver the activation email without blocking the registration response.
pub fn send_email_to_user(
    mailer: Arc<dyn Mailer>,
    config: &AuthConfig,
    created_user: &User,
    token: &ActivationToken,
) {
    send_detached(mailer, build_activation_email(config, created_user, token));
}

pub(crate) fn token_not_found() -> ApiError {
    ApiError::not_found(
        "The id was not found in the system.",
        "Check that the id is typed correctly.",
    )
}

fn decode_token(row: &PgRow) -> ActivationToken {
    ActivationToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        used_at: row.get("used_at"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
