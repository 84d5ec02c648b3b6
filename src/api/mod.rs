//! HTTP surface: router assembly, the error boundary and server bootstrap.

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request, StatusCode,
        header::{CONTENT_TYPE, SET_COOKIE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use url::Url;

use crate::accounts::{ApiError, AuthConfig};

pub mod cookies;
pub mod email;
pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

use email::Mailer;
use handlers::method_not_allowed;

/// Shared, immutable per-process state handed to handlers as an extension.
pub struct AppState {
    config: AuthConfig,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AuthConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.mailer.clone()
    }
}

/// The boundary serializer: every domain error leaves as the same JSON
/// shape, 401s clear the session cookie, and internal causes stay in the
/// logs.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(cause) => error!("internal error: {cause:#}"),
            Self::ServiceUnavailable { cause } => error!("storage unavailable: {cause}"),
            _ => {}
        }

        let status = self.status_code();
        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(SET_COOKIE, cookies::clear_session_cookie());
        }
        response
    }
}

/// Build the application router. Each method router carries a fallback so an
/// unsupported verb on a known path answers with the 405 error body.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route(
            "/health",
            get(handlers::health::health).fallback(method_not_allowed),
        )
        .route(
            "/users",
            post(handlers::users::create).fallback(method_not_allowed),
        )
        .route(
            "/users/:username",
            get(handlers::users::get)
                .patch(handlers::users::patch)
                .fallback(method_not_allowed),
        )
        .route(
            "/user",
            get(handlers::user::show).fallback(method_not_allowed),
        )
        .route(
            "/sessions",
            post(handlers::sessions::create)
                .delete(handlers::sessions::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/activations/:token_id",
            patch(handlers::activations::patch).fallback(method_not_allowed),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .fallback(handlers::not_found)
}

/// Connect to the database and run the server until ctrl-c.
///
/// # Errors
/// Returns an error if the pool cannot be established or the listener fails.
pub async fn serve(port: u16, dsn: String, state: AppState) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    cookies::install_secure(state.config().session_cookie_secure());

    let origin = base_origin(state.config().base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(AllowOrigin::exact(origin))
        .allow_credentials(true);

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(Arc::new(state)))
            .layer(Extension(pool))
            .layer(middleware::from_fn(handlers::principal::inject_principal)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Reduce the configured base URL to a `scheme://host[:port]` origin for
/// CORS.
fn base_origin(base_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Base URL must include a valid host: {base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build origin header")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use crate::accounts::AuthConfig;
    use crate::accounts::password::CostProfile;
    use crate::api::email::LogMailer;
    use anyhow::Result;
    use sqlx::{PgPool, postgres::PgPoolOptions};
    use std::sync::Arc;

    /// A pool that never connects; only good for paths that fail or return
    /// before their first query.
    pub(crate) fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    pub(crate) fn state() -> Arc<AppState> {
        let config = AuthConfig::new("http://localhost:8080".to_string())
            .with_password_cost(CostProfile::Minimal);
        Arc::new(AppState::new(config, Arc::new(LogMailer)))
    }
}
