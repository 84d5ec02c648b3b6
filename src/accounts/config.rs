//! Runtime configuration for the accounts subsystem.

use super::password::CostProfile;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;
const DEFAULT_ACTIVATION_TTL_SECONDS: i64 = 60 * 15;
const DEFAULT_MAIL_FROM: &str = "Portico <contact@portico.dev>";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    session_ttl_seconds: i64,
    activation_ttl_seconds: i64,
    password_cost: CostProfile,
    mail_from: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            activation_ttl_seconds: DEFAULT_ACTIVATION_TTL_SECONDS,
            password_cost: CostProfile::Production,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_activation_ttl_seconds(mut self, seconds: i64) -> Self {
        self.activation_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_cost(mut self, cost: CostProfile) -> Self {
        self.password_cost = cost;
        self
    }

    #[must_use]
    pub fn with_mail_from(mut self, mail_from: String) -> Self {
        self.mail_from = mail_from;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn activation_ttl_seconds(&self) -> i64 {
        self.activation_ttl_seconds
    }

    #[must_use]
    pub fn password_cost(&self) -> CostProfile {
        self.password_cost
    }

    #[must_use]
    pub fn mail_from(&self) -> &str {
        &self.mail_from
    }

    /// Cookies are only marked `Secure` when the public base URL is HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}
