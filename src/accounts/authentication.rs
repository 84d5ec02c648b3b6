//! Email + password authentication.
//!
//! Both failure paths, unknown email and wrong password, collapse into the
//! same generic 401 so responses cannot be used to enumerate accounts. The
//! distinction survives only in server-side logs.

use secrecy::SecretString;
use sqlx::PgPool;
use tracing::debug;

use super::error::ApiError;
use super::password;
use super::user::{self, User};

pub async fn get_authenticated_user(
    pool: &PgPool,
    email: &str,
    provided_password: &SecretString,
) -> Result<User, ApiError> {
    let stored_user = match user::find_one_by_email(pool, email).await {
        Ok(found) => found,
        Err(ApiError::NotFound { .. }) => {
            debug!("authentication failed: email does not match");
            return Err(ApiError::credentials_mismatch());
        }
        Err(other) => return Err(other),
    };

    let matches =
        password::verify_blocking(provided_password.clone(), stored_user.password.clone()).await?;
    if !matches {
        debug!("authentication failed: password does not match");
        return Err(ApiError::credentials_mismatch());
    }

    Ok(stored_user)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The database paths need a live store; what must hold unconditionally is
    // that both failure modes reuse the one generic credential error.
    #[test]
    fn failure_paths_share_the_generic_error() {
        let unknown_email = ApiError::credentials_mismatch();
        let wrong_password = ApiError::credentials_mismatch();
        assert_eq!(unknown_email.body(), wrong_password.body());
        assert_eq!(
            unknown_email.status_code(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }
}
