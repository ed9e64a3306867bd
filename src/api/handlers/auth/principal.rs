//! Session principal extraction and authorization guards.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use super::state::AuthState;
use super::token;
use super::types::{ErrorResponse, MembershipTier, Role};
use super::utils::extract_session_token;

/// Authenticated caller, decoded from a verified session token.
#[derive(Debug, Clone)]
pub(crate) struct Principal {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: Role,
    pub(crate) membership_tier: MembershipTier,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Authenticate the request from the `token` cookie or bearer header.
///
/// # Errors
/// Returns a ready-to-send `401` response when no credential is present or
/// the token does not verify.
pub(crate) fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, Response> {
    let Some(session_token) = extract_session_token(headers) else {
        return Err(unauthorized("Not authenticated"));
    };

    match token::verify_token(state, &session_token) {
        Ok(claims) => Ok(Principal {
            id: claims.id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            membership_tier: claims.membership_tier,
        }),
        Err(err) => {
            debug!("session token rejected: {err}");
            Err(unauthorized("Invalid or expired token"))
        }
    }
}

/// Authenticate and require the admin role.
///
/// # Errors
/// Returns `401` for missing/invalid credentials and `403` for a valid
/// session without the admin role.
pub(crate) fn require_admin(headers: &HeaderMap, state: &AuthState) -> Result<Principal, Response> {
    let principal = require_auth(headers, state)?;

    if principal.role != Role::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Admin access required".to_string(),
            }),
        )
            .into_response());
    }

    Ok(principal)
}
