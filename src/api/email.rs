//! Outbound email delivery abstraction.
//!
//! The core enqueues exactly one message shape and does not wait for
//! delivery: registration fires the activation email and returns. The
//! `Mailer` implementation decides how the message actually leaves the
//! process. `LogMailer` is the local-dev default; `HttpMailer` posts the
//! message as JSON to a relay endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use crate::APP_USER_AGENT;

#[derive(Clone, Debug, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error; the caller only logs failures.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev mailer that logs the message instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            text = %message.text,
            "email delivery stub"
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP relay.
#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpMailer {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build mailer HTTP client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await
            .context("failed to reach mail relay")?;
        response
            .error_for_status()
            .context("mail relay rejected the message")?;
        Ok(())
    }
}

/// Fire-and-forget delivery; failures are logged, never surfaced to the
/// request that triggered them.
pub fn send_detached(mailer: Arc<dyn Mailer>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(err) = mailer.send(&message).await {
            error!(to = %message.to, "failed to deliver email: {err:#}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let message = EmailMessage {
            from: "Portico <contact@portico.dev>".to_string(),
            to: "alice@example.com".to_string(),
            subject: "Activate your account".to_string(),
            text: "hello".to_string(),
        };
        assert!(LogMailer.send(&message).await.is_ok());
    }

    #[test]
    fn message_serializes_with_all_four_fields() {
        let message = EmailMessage {
            from: "a".to_string(),
            to: "b".to_string(),
            subject: "c".to_string(),
            text: "d".to_string(),
        };
        let value = serde_json::to_value(&message).expect("message serializes");
        assert_eq!(
            value,
            serde_json::json!({"from": "a", "to": "b", "subject": "c", "text": "d"})
        );
    }

    #[test]
    fn http_mailer_builds_from_url() {
        let endpoint = Url::parse("https://mail.portico.dev/send").expect("url parses");
        assert!(HttpMailer::new(endpoint).is_ok());
    }
}
