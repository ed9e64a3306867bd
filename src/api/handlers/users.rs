//! Profile, membership, and admin user management.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;

use super::auth::principal::{require_admin, require_auth};
use super::auth::storage::{
    delete_user, find_user_by_id, list_users, update_user_role, update_user_tier,
};
use super::auth::types::{ErrorResponse, MembershipTier, MessageResponse, Role, UserResponse};
use super::auth::AuthState;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub completed_lessons: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UsersListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateMembershipRequest {
    pub tier: MembershipTier,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateTierRequest {
    pub tier: MembershipTier,
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
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

fn ok_message(message: &str) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

async fn completed_lessons_count(pool: &PgPool, user_id: i64) -> anyhow::Result<i64> {
    let query = r"
        SELECT COUNT(*) AS count
        FROM lesson_progress
        WHERE user_id = $1
          AND completed = TRUE
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(row.get("count"))
}

/// Current account plus how many lessons it has completed.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Profile with progress summary", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn profile(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let user = match find_user_by_id(&pool, principal.id).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("User not found"),
        Err(err) => {
            error!("Failed to load profile: {err}");
            return server_error("Server error");
        }
    };

    let completed_lessons = match completed_lessons_count(&pool, principal.id).await {
        Ok(count) => count,
        Err(err) => {
            error!("Failed to count completed lessons: {err}");
            return server_error("Failed to get lesson count");
        }
    };

    (
        StatusCode::OK,
        Json(ProfileResponse {
            user: user.to_response(),
            completed_lessons,
        }),
    )
        .into_response()
}

/// Change the caller's own membership tier.
#[utoipa::path(
    put,
    path = "/api/users/membership",
    request_body = UpdateMembershipRequest,
    responses(
        (status = 200, description = "Tier updated", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_membership(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateMembershipRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request: UpdateMembershipRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    match update_user_tier(&pool, principal.id, request.tier).await {
        Ok(_) => ok_message("Membership updated successfully"),
        Err(err) => {
            error!("Failed to update membership: {err}");
            server_error("Failed to update membership")
        }
    }
}

/// All accounts, newest first. Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = UsersListResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn admin_list_users(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&headers, &auth_state) {
        return response;
    }

    match list_users(&pool).await {
        Ok(users) => (
            StatusCode::OK,
            Json(UsersListResponse {
                users: users.iter().map(super::auth::storage::UserRecord::to_response).collect(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to list users: {err}");
            server_error("Failed to fetch users")
        }
    }
}

/// Set another account's role. Admin only.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    request_body = UpdateRoleRequest,
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Role updated", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown account", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn admin_update_role(
    headers: HeaderMap,
    Path(id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateRoleRequest>>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&headers, &auth_state) {
        return response;
    }

    let request: UpdateRoleRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    match update_user_role(&pool, id, request.role).await {
        Ok(true) => ok_message("User role updated successfully"),
        Ok(false) => not_found("User not found"),
        Err(err) => {
            error!("Failed to update user role: {err}");
            server_error("Failed to update user role")
        }
    }
}

/// Set another account's membership tier. Admin only.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/tier",
    request_body = UpdateTierRequest,
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Tier updated", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown account", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn admin_update_tier(
    headers: HeaderMap,
    Path(id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateTierRequest>>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&headers, &auth_state) {
        return response;
    }

    let request: UpdateTierRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    match update_user_tier(&pool, id, request.tier).await {
        Ok(true) => ok_message("User tier updated successfully"),
        Ok(false) => not_found("User not found"),
        Err(err) => {
            error!("Failed to update user tier: {err}");
            server_error("Failed to update user tier")
        }
    }
}

/// Delete an account. Admins cannot delete themselves.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Attempted self-deletion", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown account", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn admin_delete_user(
    headers: HeaderMap,
    Path(id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_admin(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    if principal.id == id {
        return bad_request("You cannot delete your own account");
    }

    match delete_user(&pool, id).await {
        Ok(true) => ok_message("User deleted successfully"),
        Ok(false) => not_found("User not found"),
        Err(err) => {
            error!("Failed to delete user: {err}");
            server_error("Failed to delete user")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::auth::{AuthConfig, AuthState};
    use super::{admin_delete_user, admin_list_users, profile};
    use axum::extract::Path;
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode};
    use axum::{extract::Extension, response::IntoResponse};
    use chrono::Utc;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
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

    fn headers_for_role(id: i64, role: &str) -> HeaderMap {
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "id": id,
            "email": "tester@example.com",
            "name": "Tester",
            "role": role,
            "membershipTier": "free",
            "iat": now,
            "exp": now + 3600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_profile_requires_session() {
        let response = profile(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(test_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_list_forbidden_for_non_admin() {
        let response = admin_list_users(
            headers_for_role(1, "user"),
            Extension(lazy_pool()),
            Extension(test_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_own_account() {
        let response = admin_delete_user(
            headers_for_role(7, "admin"),
            Path(7),
            Extension(lazy_pool()),
            Extension(test_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
