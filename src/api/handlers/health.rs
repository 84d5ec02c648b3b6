//! Service health endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use sqlx::{Connection, PgPool};
use tracing::{Instrument, error, info_span};
use utoipa::ToSchema;

use crate::GIT_COMMIT_HASH;

#[derive(Serialize, ToSchema, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database is reachable", body = Health),
        (status = 503, description = "Database is unreachable", body = Health),
    ),
    tag = "health"
)]
pub async fn health(pool: Extension<PgPool>) -> impl IntoResponse {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let database_ok = match pool.0.acquire().instrument(acquire_span).await {
        Ok(mut conn) => {
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            match conn.ping().instrument(ping_span).await {
                Ok(()) => true,
                Err(err) => {
                    error!("Failed to ping database: {err}");
                    false
                }
            }
        }
        Err(err) => {
            error!("Failed to acquire database connection: {err}");
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "ok" } else { "error" }.to_string(),
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = x_app_header(&health).parse::<HeaderValue>() {
        headers.insert("X-App", value);
    }

    (status, headers, Json(health))
}

fn x_app_header(health: &Health) -> String {
    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };
    format!("{}:{}:{}", health.name, health.version, short_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_app_header_shortens_the_commit() {
        let health = Health {
            commit: "0123456789abcdef".to_string(),
            name: "portico".to_string(),
            version: "0.2.3".to_string(),
            database: "ok".to_string(),
        };
        assert_eq!(x_app_header(&health), "portico:0.2.3:0123456");
    }

    #[test]
    fn x_app_header_tolerates_unknown_commit() {
        let health = Health {
            commit: "unknown".to_string(),
            name: "portico".to_string(),
            version: "0.2.3".to_string(),
            database: "ok".to_string(),
        };
        assert_eq!(x_app_header(&health), "portico:0.2.3:");
    }
}
