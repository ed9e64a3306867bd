//! Account registration.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{insert_user, issue_token_and_enqueue, RegisterOutcome, TokenPurpose};
use super::types::{ErrorResponse, RegisterRequest, RegisterResponse};
use super::utils::{normalize_email, valid_email};

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Create an account and queue the verification email.
///
/// The account is created even when queuing the verification email fails;
/// the caller can use resend-verification to retry.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input or duplicate account", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return bad_request("Name is required");
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return bad_request("Invalid email address");
    }

    if request.password.len() < 6 {
        return bad_request("Password must be at least 6 characters long");
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Server error".to_string(),
                }),
            )
                .into_response();
        }
    };

    let user = match insert_user(&pool, &name, &email, &password_hash).await {
        Ok(RegisterOutcome::Created(user)) => user,
        Ok(RegisterOutcome::Conflict) => return bad_request("User already exists"),
        Err(err) => {
            error!("Failed to create user: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create user".to_string(),
                }),
            )
                .into_response();
        }
    };

    // Registration already committed; a failed email enqueue is logged and
    // recoverable via resend-verification.
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
        warn!(
            email = %user.email,
            "user registered but verification email was not queued"
        );
    }

    (
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful! Please check your email to verify your account."
                .to_string(),
            user: user.to_response(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::register;
    use super::RegisterRequest;
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
    async fn test_register_missing_payload() {
        let response = register(Extension(lazy_pool()), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let response = register(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(RegisterRequest {
                name: "   ".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let response = register(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(RegisterRequest {
                name: "Alice".to_string(),
                email: "not-an-email".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let response = register(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(RegisterRequest {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
