use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REQUIRE_VERIFIED_LOGIN: &str = "require-verified-login";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (HS256)")
                .env("FINANCEU_JWT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("FINANCEU_SESSION_TTL_SECONDS")
                .default_value("259200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REQUIRE_VERIFIED_LOGIN)
                .long(ARG_REQUIRE_VERIFIED_LOGIN)
                .help("Reject logins from accounts that have not verified their email")
                .env("FINANCEU_REQUIRE_VERIFIED_LOGIN")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
}

/// Session options collected from CLI matches
pub struct Options {
    pub jwt_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub require_verified_login: bool,
}

impl Options {
    /// Extract session options from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .context("missing required argument: --jwt-secret")?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(259_200),
            require_verified_login: matches
                .get_one::<bool>(ARG_REQUIRE_VERIFIED_LOGIN)
                .copied()
                .unwrap_or(true),
        })
    }
}
