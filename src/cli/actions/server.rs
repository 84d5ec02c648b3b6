use crate::accounts::{AuthConfig, password::CostProfile};
use crate::api::{
    self, AppState,
    email::{HttpMailer, LogMailer, Mailer},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub session_ttl_seconds: i64,
    pub activation_ttl_seconds: i64,
    pub password_cost: CostProfile,
    pub mail_from: String,
    pub mailer_url: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the mailer URL is invalid or the server fails to
/// start.
pub async fn execute(args: Args) -> Result<()> {
    let config = AuthConfig::new(args.base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_activation_ttl_seconds(args.activation_ttl_seconds)
        .with_password_cost(args.password_cost)
        .with_mail_from(args.mail_from);

    let mailer: Arc<dyn Mailer> = match &args.mailer_url {
        Some(url) => {
            let endpoint = Url::parse(url)
                .with_context(|| format!("Invalid mailer URL: {url}"))?;
            Arc::new(HttpMailer::new(endpoint)?)
        }
        None => Arc::new(LogMailer),
    };

    let state = AppState::new(config, mailer);

    api::serve(args.port, args.dsn, state).await
}
