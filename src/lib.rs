//! # Portico
//!
//! `portico` is a small account backend: user registration, email-based
//! account activation, cookie sessions and a flat capability model.
//!
//! ## Capability Model
//!
//! Every principal carries a set of `verb:noun` feature tags and every
//! protected operation checks one tag before doing any work. There are no
//! roles or hierarchies: a fresh account holds only `read:activation_token`,
//! and consuming its activation token replaces that set with
//! `{create:session, read:session}`. Anonymous requests hold the public set
//! `{read:activation_token, create:session, create:user}`.
//!
//! ## Sessions
//!
//! Sessions are opaque 48-byte bearer tokens delivered in the `session_id`
//! cookie, valid for 30 days with sliding expiration: every authenticated
//! `GET /user` pushes the expiry forward. Logout keeps the row and moves its
//! expiry into the past.
//!
//! ## Storage
//!
//! All durable state lives in Postgres, which also arbitrates every race:
//! case-insensitive unique indexes guard registration, and activation tokens
//! are consumed with a single conditional `UPDATE` so exactly one of two
//! concurrent attempts wins.

pub mod accounts;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
