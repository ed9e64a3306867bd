//! Auth state and configuration.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;

/// Verification links stay valid for a day.
pub(super) const VERIFY_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Reset links are short-lived since they grant a password change.
pub(super) const RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    frontend_base_url: String,
    session_ttl_seconds: i64,
    require_verified_login: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString, frontend_base_url: String) -> Self {
        Self {
            jwt_secret,
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            require_verified_login: true,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_require_verified_login(mut self, require: bool) -> Self {
        self.require_verified_login = require;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn require_verified_login(&self) -> bool {
        self.require_verified_login
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[derive(Clone)]
pub struct AuthState {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthState {
    /// Build auth state, deriving the token signing keys from the secret.
    ///
    /// # Errors
    /// Returns an error if key derivation fails.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);
        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(super) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthState};
    use secrecy::SecretString;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new(
            SecretString::from("secret"),
            "https://financeu.dev".to_string(),
        );

        assert_eq!(config.frontend_base_url(), "https://financeu.dev");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert!(config.require_verified_login());
        assert!(config.session_cookie_secure());

        let config = config
            .with_session_ttl_seconds(3600)
            .with_require_verified_login(false);

        assert_eq!(config.session_ttl_seconds(), 3600);
        assert!(!config.require_verified_login());
    }

    #[test]
    fn cookie_secure_tracks_frontend_scheme() {
        let config = AuthConfig::new(
            SecretString::from("secret"),
            "http://localhost:3000".to_string(),
        );
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn auth_state_constructs() {
        let config = AuthConfig::new(
            SecretString::from("secret"),
            "http://localhost:3000".to_string(),
        );
        assert!(AuthState::new(config).is_ok());
    }
}
