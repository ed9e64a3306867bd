//! Password reset: request a reset link, then redeem it.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{
    consume_token, find_user_by_email, find_valid_token, issue_token_and_enqueue,
    update_password_by_email, TokenPurpose,
};
use super::types::{ErrorResponse, ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};
use super::utils::{normalize_email, valid_email};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists with that email, a password reset link has been sent";

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

fn forgot_password_ok() -> axum::response::Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// Request a password-reset link.
///
/// The response is identical whether or not the account exists, and whether
/// or not the email could be queued, to avoid account enumeration.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Uniform acknowledgement", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return bad_request("Invalid email address");
    }

    let user = match find_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return forgot_password_ok(),
        Err(err) => {
            error!("Failed to look up user for password reset: {err}");
            return server_error("Server error");
        }
    };

    if let Err(err) = issue_token_and_enqueue(
        &pool,
        auth_state.config(),
        &user.email,
        &user.name,
        TokenPurpose::PasswordReset,
    )
    .await
    {
        // Same acknowledgement either way; the failure is only visible in logs.
        error!("Failed to queue password reset email: {err}");
    }

    forgot_password_ok()
}

/// Redeem a reset token and set a new password.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Extension(pool): Extension<PgPool>,
    Extension(_auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let email = normalize_email(&request.email);
    let token = request.token.trim();
    if !valid_email(&email) || token.is_empty() {
        return bad_request("Invalid or expired token");
    }

    if request.new_password.len() < 6 {
        return bad_request("Password must be at least 6 characters long");
    }

    let stored_email = match find_valid_token(&pool, token, TokenPurpose::PasswordReset).await {
        Ok(Some(stored_email)) => stored_email,
        Ok(None) => return bad_request("Invalid or expired token"),
        Err(err) => {
            error!("Failed to look up reset token: {err}");
            return server_error("Server error");
        }
    };

    if normalize_email(&stored_email) != email {
        // Token/address mismatch is indistinguishable from a bad token.
        return bad_request("Invalid or expired token");
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash new password: {err}");
            return server_error("Server error");
        }
    };

    match update_password_by_email(&pool, &email, &password_hash).await {
        Ok(true) => {}
        Ok(false) => {
            error!("Reset token redeemed but no account matched {email}");
            return server_error("Failed to update password");
        }
        Err(err) => {
            error!("Failed to update password: {err}");
            return server_error("Failed to update password");
        }
    }

    // Single-use: best effort, the password change already committed.
    if let Err(err) = consume_token(&pool, token, TokenPurpose::PasswordReset).await {
        warn!("Failed to consume reset token: {err}");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password has been reset successfully".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::{forgot_password, reset_password};
    use super::{ForgotPasswordRequest, ResetPasswordRequest};
    use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn lazy_pool() -> sqlx::PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/financeu_test")
            .unwrap()
    }

    fn test_state() -> Arc<AuthState> {
        let config = AuthConfig::new(
            SecretString::from("test-secret"),
            "http://localhost:3000".to_string(),
        );
        Arc::new(AuthState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_forgot_password_missing_payload() {
        let response = forgot_password(Extension(lazy_pool()), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_forgot_password_rejects_invalid_email() {
        let response = forgot_password(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(ForgotPasswordRequest {
                email: "nope".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_password_rejects_short_password() {
        let response = reset_password(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(ResetPasswordRequest {
                email: "alice@example.com".to_string(),
                token: "abc".to_string(),
                new_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_password_rejects_empty_token() {
        let response = reset_password(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(ResetPasswordRequest {
                email: "alice@example.com".to_string(),
                token: String::new(),
                new_password: "longenough".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
