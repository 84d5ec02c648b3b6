//! User-facing error taxonomy.
//!
//! Every failure a handler can produce maps to one of these variants, and the
//! boundary serializes them all to the same `{name, message, action,
//! status_code}` JSON shape. Unknown internal causes are wrapped and logged,
//! never exposed to the client.

use axum::http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use super::features::Feature;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, action: String },

    #[error("{message}")]
    Unauthorized { message: String, action: String },

    #[error("{message}")]
    Forbidden { message: String, action: String },

    #[error("{message}")]
    NotFound { message: String, action: String },

    #[error("Method not allowed for this endpoint.")]
    MethodNotAllowed,

    #[error("An unexpected internal error occurred.")]
    Internal(anyhow::Error),

    #[error("An unexpected internal error occurred.")]
    ServiceUnavailable { cause: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn not_found(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            action: action.into(),
        }
    }

    /// Generic 401 used by every credential path, so an unknown email, a
    /// wrong password and an expired session are indistinguishable.
    #[must_use]
    pub fn credentials_mismatch() -> Self {
        Self::Unauthorized {
            message: "Authentication data does not match.".to_string(),
            action: "Check that the data sent is correct.".to_string(),
        }
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden {
            message: "User does not have permission.".to_string(),
            action: "Check that you have permission to access this resource.".to_string(),
        }
    }

    /// 403 raised by a capability gate; the action names the missing feature.
    #[must_use]
    pub fn missing_feature(feature: Feature) -> Self {
        Self::Forbidden {
            message: "User does not have permission.".to_string(),
            action: format!("Check that your user has access to the feature: {feature}."),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Unauthorized { .. } => "UnauthorizedError",
            Self::Forbidden { .. } => "ForbiddenError",
            Self::NotFound { .. } => "NotFoundError",
            Self::MethodNotAllowed => "MethodNotAllowedError",
            Self::Internal(_) => "InternalServerError",
            Self::ServiceUnavailable { .. } => "ServiceError",
        }
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn action(&self) -> &str {
        match self {
            Self::Validation { action, .. }
            | Self::Unauthorized { action, .. }
            | Self::Forbidden { action, .. }
            | Self::NotFound { action, .. } => action,
            Self::MethodNotAllowed => {
                "Check that the HTTP method sent is valid for this endpoint."
            }
            Self::Internal(_) => "Contact support.",
            Self::ServiceUnavailable { .. } => "Check that the service is available.",
        }
    }

    /// The public JSON body; internal causes are intentionally absent.
    #[must_use]
    pub fn body(&self) -> Value {
        json!({
            "name": self.name(),
            "message": self.to_string(),
            "action": self.action(),
            "status_code": self.status_code().as_u16(),
        })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::ServiceUnavailable {
                cause: err.to_string(),
            },
            other => Self::Internal(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn body_matches_public_shape() {
        let err = ApiError::validation(
            "The username or email is already in use.",
            "Use another username or email for this operation.",
        );
        assert_eq!(
            err.body(),
            json!({
                "name": "ValidationError",
                "message": "The username or email is already in use.",
                "action": "Use another username or email for this operation.",
                "status_code": 400,
            })
        );
    }

    #[test]
    fn status_codes_mirror_taxonomy() {
        assert_eq!(
            ApiError::credentials_mismatch().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::not_found("missing", "check").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credential_failures_share_one_body() {
        // Unknown email and wrong password must be externally identical.
        assert_eq!(
            ApiError::credentials_mismatch().body(),
            ApiError::credentials_mismatch().body()
        );
    }

    #[test]
    fn missing_feature_names_the_feature() {
        let err = ApiError::missing_feature(Feature::ReadSession);
        let body = err.body();
        assert_eq!(body["status_code"], 403);
        assert_eq!(
            body["action"],
            "Check that your user has access to the feature: read:session."
        );
    }

    #[test]
    fn internal_body_hides_the_cause() {
        let err = ApiError::Internal(anyhow!("connection string had a password in it"));
        let body = err.body();
        assert_eq!(body["name"], "InternalServerError");
        assert_eq!(body["message"], "An unexpected internal error occurred.");
        assert!(!body.to_string().contains("password"));
    }

    #[test]
    fn connectivity_errors_map_to_service_unavailable() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.name(), "ServiceError");

        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
