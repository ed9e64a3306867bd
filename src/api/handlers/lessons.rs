//! Lesson catalog and per-user progress.

use axum::{
    extract::Extension,
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

use super::auth::principal::require_auth;
use super::auth::types::{ErrorResponse, MessageResponse};
use super::auth::AuthState;

/// Catalog entry. Lessons are keyed by a stable string id such as
/// `pillar1-lesson1`; progress rows reference these ids.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub pillar: u32,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LessonsResponse {
    pub lessons: Vec<Lesson>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressEntry {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    pub lesson_id: String,
}

/// The static curriculum. Stored lesson metadata would replace this if the
/// catalog ever moves into the database.
fn catalog() -> Vec<Lesson> {
    vec![
        Lesson {
            id: "pillar1-lesson1".to_string(),
            title: "Introduction to Financial Literacy".to_string(),
            description: "Learn the basics of financial literacy".to_string(),
            pillar: 1,
        },
        Lesson {
            id: "pillar1-lesson2".to_string(),
            title: "Understanding Money".to_string(),
            description: "Core concepts about money and its functions".to_string(),
            pillar: 1,
        },
    ]
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

/// Available lessons.
#[utoipa::path(
    get,
    path = "/api/lessons",
    responses(
        (status = 200, description = "Lesson catalog", body = LessonsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "lessons"
)]
pub async fn lessons(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(response) = require_auth(&headers, &auth_state) {
        return response;
    }

    (
        StatusCode::OK,
        Json(LessonsResponse { lessons: catalog() }),
    )
        .into_response()
}

/// The caller's lesson progress rows, as a bare array.
#[utoipa::path(
    get,
    path = "/api/lessons/progress",
    responses(
        (status = 200, description = "Progress rows", body = [LessonProgressEntry]),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "lessons"
)]
pub async fn progress(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let query = r"
        SELECT id, user_id, lesson_id, completed, completed_at
        FROM lesson_progress
        WHERE user_id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = match sqlx::query(query)
        .bind(principal.id)
        .fetch_all(&pool)
        .instrument(span)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            error!("Failed to load lesson progress: {err}");
            return server_error("Failed to get progress");
        }
    };

    let progress: Vec<LessonProgressEntry> = rows
        .iter()
        .map(|row| LessonProgressEntry {
            id: row.get("id"),
            user_id: row.get("user_id"),
            lesson_id: row.get("lesson_id"),
            completed: row.get("completed"),
            completed_at: row.get("completed_at"),
        })
        .collect();

    (StatusCode::OK, Json(progress)).into_response()
}

/// Mark a lesson complete. Idempotent: completing twice refreshes the
/// completion timestamp.
#[utoipa::path(
    post,
    path = "/api/lessons/complete",
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Lesson recorded as complete", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "lessons"
)]
pub async fn complete_lesson(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Option<Json<CompleteLessonRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request: CompleteLessonRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing payload".to_string(),
                }),
            )
                .into_response()
        }
    };

    let lesson_id = request.lesson_id.trim();
    if lesson_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Lesson ID is required".to_string(),
            }),
        )
            .into_response();
    }

    let query = r"
        INSERT INTO lesson_progress (user_id, lesson_id, completed, completed_at)
        VALUES ($1, $2, TRUE, CURRENT_TIMESTAMP)
        ON CONFLICT (user_id, lesson_id)
        DO UPDATE SET completed = TRUE, completed_at = CURRENT_TIMESTAMP
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(principal.id)
        .bind(lesson_id)
        .execute(&pool)
        .instrument(span)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Lesson marked as complete".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to mark lesson complete: {err}");
            server_error("Failed to mark lesson as complete")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::auth::{AuthConfig, AuthState};
    use super::{catalog, complete_lesson, lessons, progress};
    use axum::http::{HeaderMap, StatusCode};
    use axum::{extract::Extension, response::IntoResponse};
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

    #[test]
    fn catalog_ids_are_unique() {
        let lessons = catalog();
        let mut ids: Vec<&str> = lessons.iter().map(|lesson| lesson.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), lessons.len());
        assert!(ids.contains(&"pillar1-lesson1"));
    }

    #[tokio::test]
    async fn test_lessons_requires_session() {
        let response = lessons(HeaderMap::new(), Extension(test_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_progress_requires_session() {
        let response = progress(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(test_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_complete_requires_session() {
        let response = complete_lesson(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(test_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
