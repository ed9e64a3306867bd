//! Email verification endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::state::AuthState;
use super::storage::{
    consume_token, find_user_by_email, find_valid_token, issue_token_and_enqueue,
    mark_email_verified, TokenPurpose,
};
use super::token::issue_token;
use super::types::{
    ErrorResponse, MessageResponse, ResendVerificationRequest, VerifyEmailRequest,
    VerifyEmailResponse,
};
use super::utils::{normalize_email, session_cookie, valid_email};

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn server_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Redeem a verification token and activate the account.
///
/// On success the account is logged in directly; if token signing fails the
/// verification still stands and the client is asked to log in manually.
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let email = normalize_email(&request.email);
    let token = request.token.trim();
    if !valid_email(&email) || token.is_empty() {
        return bad_request("Invalid or expired verification token");
    }

    let stored_email = match find_valid_token(&pool, token, TokenPurpose::EmailVerification).await {
        Ok(Some(stored_email)) => stored_email,
        Ok(None) => return bad_request("Invalid or expired verification token"),
        Err(err) => {
            error!("Failed to look up verification token: {err}");
            return server_error("Server error");
        }
    };

    if normalize_email(&stored_email) != email {
        return bad_request("Email does not match verification token");
    }

    let user = match mark_email_verified(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Token existed but the account is gone; treat like a bad token.
            return bad_request("Invalid or expired verification token");
        }
        Err(err) => {
            error!("Failed to mark email verified: {err}");
            return server_error("Failed to verify email");
        }
    };

    // Single-use: best effort, verification itself already committed.
    if let Err(err) = consume_token(&pool, token, TokenPurpose::EmailVerification).await {
        warn!("Failed to consume verification token: {err}");
    }

    let session_token = match issue_token(&auth_state, &user) {
        Ok(session_token) => session_token,
        Err(err) => {
            error!("Failed to issue session token after verification: {err}");
            return (
                StatusCode::OK,
                Json(VerifyEmailResponse {
                    message: "Email verified successfully! Please login.".to_string(),
                    user: None,
                    token: None,
                }),
            )
                .into_response();
        }
    };

    let cookie = session_cookie(
        &session_token,
        auth_state.config().session_ttl_seconds(),
        auth_state.config().session_cookie_secure(),
    );

    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(VerifyEmailResponse {
            message: "Email verified successfully!".to_string(),
            user: Some(user.to_response()),
            token: Some(session_token),
        }),
    )
        .into_response()
}

/// Issue a fresh verification token and queue the email again.
///
/// Unlike registration, a failure to queue the email here is surfaced: the
/// whole point of the call is the email.
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email queued", body = MessageResponse),
        (status = 400, description = "Unknown or already-verified account", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> impl IntoResponse {
    let request: ResendVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return bad_request("Invalid email address");
    }

    let user = match find_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return bad_request("No account found with that email"),
        Err(err) => {
            error!("Failed to look up user for resend: {err}");
            return server_error("Server error");
        }
    };

    if user.email_verified {
        return bad_request("Email already verified");
    }

    if let Err(err) = issue_token_and_enqueue(
        &pool,
        auth_state.config(),
        &user.email,
        &user.name,
        TokenPurpose::EmailVerification,
    )
    .await
    {
        error!("Failed to queue verification email: {err}");
        return server_error("Failed to send verification email");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Verification email sent! Please check your inbox.".to_string(),
        }),
    )
        .into_response()
}
