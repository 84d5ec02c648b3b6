//! Session issuance, lookup, renewal and expiry.
//!
//! A session is an opaque bearer token tied to one user. Rows are never
//! deleted: logging out pushes `expires_at` into the past and keeps the row
//! as an audit trail.

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::Serialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::ApiError;
use super::is_unique_violation;

/// Token entropy in bytes; hex-encoded to twice this many characters.
const TOKEN_BYTES: usize = 48;

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = "id, token, user_id, expires_at, created_at, updated_at";

/// Issue a new session for `user_id`.
///
/// The returned row carries the raw token; it is handed to the client once
/// in the cookie and in the response body, and looked up verbatim afterward.
pub async fn create(pool: &PgPool, config: &AuthConfig, user_id: Uuid) -> Result<Session, ApiError> {
    let query = format!(
        r"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        RETURNING {SESSION_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );

    // A token collision is astronomically unlikely but the unique index makes
    // it an error, so retry with a fresh token a few times.
    for _ in 0..3 {
        let token = generate_token()?;
        let result = sqlx::query(&query)
            .bind(&token)
            .bind(user_id)
            .bind(config.session_ttl_seconds())
            .fetch_one(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(row) => return Ok(decode_session(&row)),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(ApiError::from(err)),
        }
    }

    Err(ApiError::Internal(anyhow!(
        "failed to generate a unique session token"
    )))
}

/// Look up a session by token, accepting only unexpired rows.
///
/// A missing token and an expired one produce the same generic 401 so the
/// response does not reveal whether the token ever existed.
pub async fn find_one_valid_by_token(pool: &PgPool, token: &str) -> Result<Session, ApiError> {
    let query = format!(
        r"
        SELECT {SESSION_COLUMNS}
        FROM sessions
        WHERE token = $1
          AND expires_at > NOW()
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
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_session(&row))
        .ok_or_else(ApiError::credentials_mismatch)
}

/// Sliding expiration: push `expires_at` forward by a full session lifetime.
pub async fn renew(pool: &PgPool, config: &AuthConfig, session_id: Uuid) -> Result<Session, ApiError> {
    let query = format!(
        r"
        UPDATE sessions
        SET expires_at = NOW() + ($2 * INTERVAL '1 second'),
            updated_at = timezone('utc', now())
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(session_id)
        .bind(config.session_ttl_seconds())
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_session(&row))
        .ok_or_else(ApiError::credentials_mismatch)
}

/// Invalidate a session by moving `expires_at` into the past. The row stays.
pub async fn expire_by_id(
    pool: &PgPool,
    config: &AuthConfig,
    session_id: Uuid,
) -> Result<Session, ApiError> {
    let query = format!(
        r"
        UPDATE sessions
        SET expires_at = NOW() - ($2 * INTERVAL '1 second'),
            updated_at = timezone('utc', now())
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(session_id)
        .bind(config.session_ttl_seconds())
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_session(&row))
        .ok_or_else(ApiError::credentials_mismatch)
}

fn generate_token() -> Result<String, ApiError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")
        .map_err(ApiError::Internal)?;
    Ok(hex::encode(bytes))
}

fn decode_session(row: &PgRow) -> Session {
    Session {
        id: row.get("id"),
        token: row.get("token"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;

    pub(crate) fn session_for(user_id: Uuid) -> Session {
        Session {
            id: Uuid::new_v4(),
            token: generate_token().expect("token generation succeeds"),
            user_id,
            expires_at: Utc::now() + Duration::days(30),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
