//! Feedback submission (public) and admin review.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;

use super::auth::principal::require_admin;
use super::auth::types::{ErrorResponse, MessageResponse};
use super::auth::AuthState;

const MIN_MESSAGE_LENGTH: usize = 10;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitFeedbackRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "feedbackType")]
    pub feedback_type: String,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitFeedbackResponse {
    pub message: String,
    #[serde(rename = "feedbackId")]
    pub feedback_id: i64,
}

/// Stored feedback entry. `name` and `email` are optional: submission is
/// open to anonymous visitors.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FeedbackEntry {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FeedbackListResponse {
    pub feedback: Vec<FeedbackEntry>,
    pub total: i64,
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

fn server_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Record a feedback entry. No session required.
#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = SubmitFeedbackRequest,
    responses(
        (status = 201, description = "Feedback stored", body = SubmitFeedbackResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "feedback"
)]
pub async fn submit_feedback(
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<SubmitFeedbackRequest>>,
) -> impl IntoResponse {
    let request: SubmitFeedbackRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    if request.feedback_type.trim().is_empty() {
        return bad_request("Feedback type is required");
    }

    if request.message.len() < MIN_MESSAGE_LENGTH {
        return bad_request("Message must be at least 10 characters long");
    }

    let query = r"
        INSERT INTO feedback (name, email, type, message)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.feedback_type)
        .bind(&request.message)
        .fetch_one(&pool)
        .instrument(span)
        .await
    {
        Ok(row) => (
            StatusCode::CREATED,
            Json(SubmitFeedbackResponse {
                message: "Feedback submitted successfully".to_string(),
                feedback_id: row.get("id"),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to store feedback: {err}");
            server_error("Failed to submit feedback")
        }
    }
}

/// All feedback entries, newest first, plus the total count. Admin only.
#[utoipa::path(
    get,
    path = "/api/feedback/admin",
    responses(
        (status = 200, description = "All feedback", body = FeedbackListResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "feedback"
)]
pub async fn admin_list_feedback(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&headers, &auth_state) {
        return response;
    }

    let query = r"
        SELECT id, name, email, type, message, created_at
        FROM feedback
        ORDER BY created_at DESC
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = match sqlx::query(query).fetch_all(&pool).instrument(span).await {
        Ok(rows) => rows,
        Err(err) => {
            error!("Failed to load feedback: {err}");
            return server_error("Failed to fetch feedback");
        }
    };

    let feedback: Vec<FeedbackEntry> = rows
        .iter()
        .map(|row| FeedbackEntry {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            feedback_type: row.get("type"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
        .collect();

    let query = "SELECT COUNT(*) AS count FROM feedback";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let total: i64 = match sqlx::query(query).fetch_one(&pool).instrument(span).await {
        Ok(row) => row.get("count"),
        Err(err) => {
            error!("Failed to count feedback: {err}");
            return server_error("Failed to get feedback count");
        }
    };

    (StatusCode::OK, Json(FeedbackListResponse { feedback, total })).into_response()
}

/// Delete one feedback entry. Admin only.
#[utoipa::path(
    delete,
    path = "/api/feedback/admin/{id}",
    params(("id" = i64, Path, description = "Feedback id")),
    responses(
        (status = 200, description = "Feedback deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown feedback id", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "feedback"
)]
pub async fn admin_delete_feedback(
    headers: HeaderMap,
    Path(id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&headers, &auth_state) {
        return response;
    }

    let query = "DELETE FROM feedback WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    match sqlx::query(query).bind(id).execute(&pool).instrument(span).await {
        Ok(result) if result.rows_affected() > 0 => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Feedback deleted successfully".to_string(),
            }),
        )
            .into_response(),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Feedback not found".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to delete feedback: {err}");
            server_error("Failed to delete feedback")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::auth::{AuthConfig, AuthState};
    use super::{admin_list_feedback, submit_feedback, SubmitFeedbackRequest};
    use axum::http::{HeaderMap, StatusCode};
    use axum::{extract::Extension, response::IntoResponse, Json};
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
    async fn test_submit_feedback_missing_payload() {
        let response = submit_feedback(Extension(lazy_pool()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_feedback_rejects_short_message() {
        let response = submit_feedback(
            Extension(lazy_pool()),
            Some(Json(SubmitFeedbackRequest {
                name: None,
                email: None,
                feedback_type: "bug".to_string(),
                message: "too short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_feedback_requires_session() {
        let response = admin_list_feedback(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(test_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
