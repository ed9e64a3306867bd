//! # FinanceU (Financial Literacy Platform API)
//!
//! `financeu` is the backend for the FinanceU learning platform. It handles
//! account registration with email verification, password-based login,
//! password reset, lesson-progress tracking, membership tiers, and feedback
//! submission over a REST/JSON API backed by PostgreSQL.
//!
//! ## Sessions
//!
//! Sessions are stateless: a signed HS256 token carries the account's
//! identity, role, and membership tier. The server never stores sessions and
//! cannot revoke them; logout only clears the client cookie. The token is
//! transported in an `HttpOnly` cookie named `token`, with an
//! `Authorization: Bearer` fallback for non-browser clients.
//!
//! ## Ephemeral tokens
//!
//! Email verification and password reset are gated by random single-use
//! tokens stored server-side. At most one unused token exists per
//! (email, purpose): issuing a new one invalidates all prior unused tokens
//! in the same transaction. Verification tokens live 24 hours, reset tokens
//! one hour.
//!
//! ## Email
//!
//! Flows never send mail inline. They enqueue rows in `email_outbox` and a
//! background worker delivers them with retries, so API latency is decoupled
//! from the mail relay.

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
