//! Current-session endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::principal::require_auth;
use super::state::AuthState;
use super::storage::find_user_by_id;
use super::types::{ErrorResponse, MeResponse};

/// Return the account behind the current session token.
///
/// Reads the account from the database rather than echoing the claims, so
/// role or tier changes made after token issuance are reflected.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match find_user_by_id(&pool, principal.id).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(MeResponse {
                user: user.to_response(),
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "User not found".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to load current user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::me;
    use axum::http::HeaderMap;
    use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
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
    async fn test_me_requires_session() {
        let response = me(HeaderMap::new(), Extension(lazy_pool()), Extension(test_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
