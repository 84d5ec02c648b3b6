//! Route handlers.
//!
//! Handlers receive the `Principal` resolved by the classification
//! middleware and run the relevant capability gate before any other work.

pub mod activations;
pub mod health;
pub mod principal;
pub mod sessions;
pub mod user;
pub mod users;

use crate::accounts::ApiError;

/// Per-route fallback for unsupported HTTP verbs, keeping the JSON error
/// shape consistent with the rest of the taxonomy.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Router-level fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::not_found(
        "Could not find this resource in the system.",
        "Check that the resource parameters are correct.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn fallback_produces_the_405_error() {
        let err = method_not_allowed().await;
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.name(), "MethodNotAllowedError");
    }

    #[tokio::test]
    async fn unknown_paths_produce_the_404_error() {
        let err = not_found().await;
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "NotFoundError");
    }
}
