//! User records and the user directory.
//!
//! Username and email are unique under case-insensitive comparison. The
//! application pre-checks collisions to fail early with a clear message, but
//! the `LOWER(...)` unique indexes in the database are the final authority:
//! two concurrent registrations cannot both win the race.

use chrono::{DateTime, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::ApiError;
use super::features::{FeatureSet, default_user_features};
use super::is_unique_violation;
use super::password;

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; never serialized into API responses.
    #[serde(skip_serializing)]
    pub password: String,
    #[schema(value_type = Vec<String>)]
    pub features: FeatureSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

/// Partial update; absent fields keep their current values.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

const USER_COLUMNS: &str = "id, username, email, password, features, created_at, updated_at";

pub async fn create(pool: &PgPool, config: &AuthConfig, input: NewUser) -> Result<User, ApiError> {
    let username = input.username.trim().to_string();
    let email = input.email.trim().to_string();
    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&input.password)?;

    ensure_unique(pool, &username, &email, None).await?;

    let hashed = password::hash_blocking(input.password, config.password_cost()).await?;
    let features = default_user_features();

    let query = format!(
        r"
        INSERT INTO users (username, email, password, features)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(&username)
        .bind(&email)
        .bind(&hashed)
        .bind(features.tags())
        .fetch_one(pool)
        .instrument(span)
        .await
        .map_err(|err| {
            // Lost the insert race; the unique index is authoritative.
            if is_unique_violation(&err) {
                uniqueness_error()
            } else {
                ApiError::from(err)
            }
        })?;

    Ok(decode_user(&row))
}

pub async fn find_one_by_id(pool: &PgPool, id: Uuid) -> Result<User, ApiError> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1
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

    row.map(|row| decode_user(&row)).ok_or_else(|| {
        ApiError::not_found(
            "The id was not found in the system.",
            "Check that the id is typed correctly.",
        )
    })
}

pub async fn find_one_by_username(pool: &PgPool, username: &str) -> Result<User, ApiError> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE LOWER(username) = LOWER($1)
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
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_user(&row)).ok_or_else(|| {
        ApiError::not_found(
            "The username was not found in the system.",
            "Check that the username is typed correctly.",
        )
    })
}

pub async fn find_one_by_email(pool: &PgPool, email: &str) -> Result<User, ApiError> {
    let query = format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE LOWER(email) = LOWER($1)
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
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_user(&row)).ok_or_else(|| {
        ApiError::not_found(
            "The email was not found in the system.",
            "Check that the email is typed correctly.",
        )
    })
}

/// Apply a partial update to the user currently holding `username`.
///
/// The uniqueness re-check excludes the row being updated, so re-submitting
/// one's own current username or email succeeds.
pub async fn update(
    pool: &PgPool,
    config: &AuthConfig,
    username: &str,
    patch: UserPatch,
) -> Result<User, ApiError> {
    let current = find_one_by_username(pool, username).await?;

    let new_username = match patch.username {
        Some(username) => {
            let username = username.trim().to_string();
            validate_username(&username)?;
            username
        }
        None => current.username.clone(),
    };
    let new_email = match patch.email {
        Some(email) => {
            let email = email.trim().to_string();
            validate_email(&email)?;
            email
        }
        None => current.email.clone(),
    };

    if new_username != current.username || new_email != current.email {
        ensure_unique(pool, &new_username, &new_email, Some(current.id)).await?;
    }

    let new_password = match patch.password {
        Some(password) => {
            validate_password(&password)?;
            password::hash_blocking(password, config.password_cost()).await?
        }
        None => current.password.clone(),
    };

    let query = format!(
        r"
        UPDATE users
        SET username = $2,
            email = $3,
            password = $4,
            updated_at = timezone('utc', now())
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(current.id)
        .bind(&new_username)
        .bind(&new_email)
        .bind(&new_password)
        .fetch_one(pool)
        .instrument(span)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                uniqueness_error()
            } else {
                ApiError::from(err)
            }
        })?;

    Ok(decode_user(&row))
}

/// Replace the feature set atomically.
pub async fn set_features(
    pool: &PgPool,
    id: Uuid,
    features: &FeatureSet,
) -> Result<User, ApiError> {
    let query = format!(
        r"
        UPDATE users
        SET features = $2,
            updated_at = timezone('utc', now())
        WHERE id = $1
        RETURNING {USER_COLUMNS}
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
        .bind(features.tags())
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.map(|row| decode_user(&row)).ok_or_else(|| {
        ApiError::not_found(
            "The id was not found in the system.",
            "Check that the id is typed correctly.",
        )
    })
}

/// Early-exit collision check. `exclude` carries the id of a row being
/// updated so its own current values do not collide with themselves.
async fn ensure_unique(
    pool: &PgPool,
    username: &str,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<(), ApiError> {
    let query = r"
        SELECT 1
        FROM users
        WHERE (LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($2))
          AND ($3::uuid IS NULL OR id <> $3)
        LIMIT 1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    if row.is_some() {
        return Err(uniqueness_error());
    }
    Ok(())
}

fn uniqueness_error() -> ApiError {
    ApiError::validation(
        "The username or email is already in use.",
        "Use another username or email for this operation.",
    )
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation(
            "Username must not be empty.",
            "Provide a username and try again.",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email));
    if !valid {
        return Err(ApiError::validation(
            "The email is not valid.",
            "Check the email and try again.",
        ));
    }
    Ok(())
}

fn validate_password(password: &SecretString) -> Result<(), ApiError> {
    if password.expose_secret().is_empty() {
        return Err(ApiError::validation(
            "Password must not be empty.",
            "Provide a password and try again.",
        ));
    }
    Ok(())
}

fn decode_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password: row.get("password"),
        features: FeatureSet::from_tags(&row.get::<Vec<String>, _>("features")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::features::Feature;

    #[test]
    fn email_validation_accepts_basic_format() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("name.surname@example.co").is_ok());
    }

    #[test]
    fn email_validation_rejects_missing_parts() {
        for email in ["", "not-an-email", "missing-at.example.com", "missing-domain@"] {
            let err = validate_email(email).expect_err("invalid email is rejected");
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn username_and_password_must_not_be_empty() {
        assert!(validate_username("").is_err());
        assert!(validate_username("alice").is_ok());
        assert!(validate_password(&SecretString::from("")).is_err());
        assert!(validate_password(&SecretString::from("hunter2")).is_ok());
    }

    #[test]
    fn serialized_user_omits_the_password_hash() {
        let user = test_support::user_with_features(default_user_features());
        let value = serde_json::to_value(&user).expect("user serializes");
        assert!(value.get("password").is_none());
        assert_eq!(value["username"], "alice");
        assert_eq!(value["features"], serde_json::json!(["read:activation_token"]));
    }

    #[test]
    fn new_users_start_with_the_default_feature_set() {
        let user = test_support::user_with_features(default_user_features());
        assert!(user.features.contains(Feature::ReadActivationToken));
        assert!(!user.features.contains(Feature::CreateSession));
        assert_eq!(user.features.len(), 1);
    }

    #[test]
    fn uniqueness_error_is_a_validation_error() {
        let err = uniqueness_error();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.name(), "ValidationError");
    }
}
