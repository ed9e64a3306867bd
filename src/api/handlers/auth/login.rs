//! Password login and logout.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::password::verify_password;
use super::state::AuthState;
use super::storage::find_user_by_email;
use super::token::issue_token;
use super::types::{AuthResponse, ErrorResponse, LoginRequest, MessageResponse, UnverifiedResponse};
use super::utils::{clear_session_cookie, normalize_email, session_cookie, valid_email};

fn invalid_credentials() -> axum::response::Response {
    // Uniform response for unknown address and wrong password alike.
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Invalid email or password".to_string(),
        }),
    )
        .into_response()
}

/// Authenticate with email and password, returning a session token and
/// setting the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = UnverifiedResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return invalid_credentials(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) || request.password.is_empty() {
        return invalid_credentials();
    }

    let user = match find_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return invalid_credentials(),
        Err(err) => {
            error!("Failed to look up user for login: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Server error".to_string(),
                }),
            )
                .into_response();
        }
    };

    if !verify_password(&request.password, &user.password_hash) {
        return invalid_credentials();
    }

    if auth_state.config().require_verified_login() && !user.email_verified {
        return (
            StatusCode::FORBIDDEN,
            Json(UnverifiedResponse {
                error: "Please verify your email before logging in".to_string(),
                email_verified: false,
            }),
        )
            .into_response();
    }

    let token = match issue_token(&auth_state, &user) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to generate token".to_string(),
                }),
            )
                .into_response();
        }
    };

    let cookie = session_cookie(
        &token,
        auth_state.config().session_ttl_seconds(),
        auth_state.config().session_cookie_secure(),
    );

    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: user.to_response(),
            token,
        }),
    )
        .into_response()
}

/// Clear the session cookie. The token itself stays valid until expiry.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(Extension(auth_state): Extension<Arc<AuthState>>) -> impl IntoResponse {
    let cookie = clear_session_cookie(auth_state.config().session_cookie_secure());

    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::{login, logout, LoginRequest};
    use axum::http::header::SET_COOKIE;
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
    async fn test_login_missing_payload() {
        let response = login(Extension(lazy_pool()), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_password_before_lookup() {
        let response = login(
            Extension(lazy_pool()),
            Extension(test_state()),
            Some(Json(LoginRequest {
                email: "alice@example.com".to_string(),
                password: String::new(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = logout(Extension(test_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
