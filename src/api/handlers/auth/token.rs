//! Session token issuance and verification (HS256).

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};

use super::state::AuthState;
use super::storage::UserRecord;
use super::types::{MembershipTier, Role};

/// Claims embedded in the session token. Wire names match the frontend.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Claims {
    pub(super) id: i64,
    pub(super) email: String,
    pub(super) name: String,
    pub(super) role: Role,
    #[serde(rename = "membershipTier")]
    pub(super) membership_tier: MembershipTier,
    pub(super) iat: i64,
    pub(super) exp: i64,
}

/// Sign a session token for the given account.
///
/// # Errors
/// Returns an error if signing fails.
pub(super) fn issue_token(state: &AuthState, user: &UserRecord) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        membership_tier: user.membership_tier,
        iat: now,
        exp: now + state.config().session_ttl_seconds(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, state.encoding_key())
        .context("failed to sign session token")
}

/// Verify a session token and return its claims.
///
/// Rejects bad signatures, non-HS256 algorithms, and expired tokens.
/// Expiry is exact: no leeway window.
pub(super) fn verify_token(state: &AuthState, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(token, state.decoding_key(), &validation)
        .context("invalid session token")?;

    Ok(data.claims)
}
