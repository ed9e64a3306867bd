//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, email};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;

    Ok(Action::Server(Box::new(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        require_verified_login: auth_opts.require_verified_login,
        frontend_base_url: email_opts.frontend_base_url,
        mail_relay_url: email_opts.mail_relay_url,
        email_outbox_poll_seconds: email_opts.outbox.poll_seconds,
        email_outbox_batch_size: email_opts.outbox.batch_size,
        email_outbox_max_attempts: email_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: email_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: email_opts.outbox.backoff_max_seconds,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_defaults() {
        temp_env::with_vars(
            [
                ("FINANCEU_PORT", None::<&str>),
                ("FINANCEU_SESSION_TTL_SECONDS", None),
                ("FINANCEU_REQUIRE_VERIFIED_LOGIN", None),
                ("FINANCEU_FRONTEND_BASE_URL", None),
                ("FINANCEU_MAIL_RELAY_URL", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "financeu",
                    "--dsn",
                    "postgres://user@localhost:5432/financeu",
                    "--jwt-secret",
                    "secret",
                ]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.dsn, "postgres://user@localhost:5432/financeu");
                    assert_eq!(args.jwt_secret.expose_secret(), "secret");
                    assert_eq!(args.session_ttl_seconds, 259_200);
                    assert!(args.require_verified_login);
                    assert_eq!(args.frontend_base_url, "http://localhost:3000");
                    assert_eq!(args.mail_relay_url, None);
                    assert_eq!(args.email_outbox_poll_seconds, 5);
                    assert_eq!(args.email_outbox_batch_size, 10);
                    assert_eq!(args.email_outbox_max_attempts, 5);
                }
            },
        );
    }
}
