//! Accounts-related arguments: public base URL, token lifetimes, password
//! hashing cost and the outbound mailer.

use anyhow::{Context, Result};
use clap::{Arg, Command, builder::ValueParser};

use crate::accounts::password::CostProfile;

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_ACTIVATION_TTL_SECONDS: &str = "activation-ttl-seconds";
pub const ARG_PASSWORD_COST: &str = "password-cost";
pub const ARG_MAIL_FROM: &str = "mail-from";
pub const ARG_MAILER_URL: &str = "mailer-url";

#[must_use]
pub fn validator_password_cost() -> ValueParser {
    ValueParser::from(
        move |cost: &str| -> std::result::Result<CostProfile, String> {
            match cost.to_lowercase().as_str() {
                "production" => Ok(CostProfile::Production),
                "minimal" => Ok(CostProfile::Minimal),
                _ => Err("invalid password cost (expected 'production' or 'minimal')".to_string()),
            }
        },
    )
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL, used for activation links, CORS and cookie security")
                .default_value("http://localhost:8080")
                .env("PORTICO_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .default_value("2592000")
                .env("PORTICO_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_ACTIVATION_TTL_SECONDS)
                .long(ARG_ACTIVATION_TTL_SECONDS)
                .help("Activation token lifetime in seconds")
                .default_value("900")
                .env("PORTICO_ACTIVATION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_COST)
                .long(ARG_PASSWORD_COST)
                .help("Password hashing cost: production or minimal (for test environments)")
                .default_value("production")
                .env("PORTICO_PASSWORD_COST")
                .value_parser(validator_password_cost()),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("From address on outbound email")
                .default_value("Portico <contact@portico.dev>")
                .env("PORTICO_MAIL_FROM"),
        )
        .arg(
            Arg::new(ARG_MAILER_URL)
                .long(ARG_MAILER_URL)
                .help("HTTP mail relay endpoint; messages are logged when unset")
                .env("PORTICO_MAILER_URL"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub session_ttl_seconds: i64,
    pub activation_ttl_seconds: i64,
    pub password_cost: CostProfile,
    pub mail_from: String,
    pub mailer_url: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            base_url: matches
                .get_one::<String>(ARG_BASE_URL)
                .cloned()
                .context("missing required argument: --base-url")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            activation_ttl_seconds: matches
                .get_one::<i64>(ARG_ACTIVATION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --activation-ttl-seconds")?,
            password_cost: matches
                .get_one::<CostProfile>(ARG_PASSWORD_COST)
                .copied()
                .context("missing required argument: --password-cost")?,
            mail_from: matches
                .get_one::<String>(ARG_MAIL_FROM)
                .cloned()
                .context("missing required argument: --mail-from")?,
            mailer_url: matches.get_one::<String>(ARG_MAILER_URL).cloned(),
        })
    }
}
