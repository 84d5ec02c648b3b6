//! Request classification middleware.
//!
//! Every inbound request is resolved to a `Principal` before any handler
//! runs: no cookie means anonymous, a valid cookie means the session's user,
//! and an invalid or expired cookie fails the request with the generic 401
//! (which also clears the cookie). Handlers receive the principal as an
//! immutable extension and never look at the cookie themselves.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

use crate::accounts::{ApiError, Principal, session, user};
use crate::api::cookies::extract_session_token;

pub async fn inject_principal(
    Extension(pool): Extension<PgPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_session_token(request.headers()) {
        None => Principal::Anonymous,
        Some(token) => {
            let session = session::find_one_valid_by_token(&pool, &token).await?;
            let user = user::find_one_by_id(&pool, session.user_id).await?;
            Principal::Authenticated { user, session }
        }
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
