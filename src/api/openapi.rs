//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers::auth::types::{
    AuthResponse, ErrorResponse, ForgotPasswordRequest, LoginRequest, MeResponse,
    MembershipTier, MessageResponse, RegisterRequest, RegisterResponse,
    ResendVerificationRequest, ResetPasswordRequest, Role, UnverifiedResponse, UserResponse,
    VerifyEmailRequest, VerifyEmailResponse,
};
use super::handlers::feedback::{
    FeedbackEntry, FeedbackListResponse, SubmitFeedbackRequest, SubmitFeedbackResponse,
};
use super::handlers::health::Health;
use super::handlers::lessons::{
    CompleteLessonRequest, Lesson, LessonProgressEntry, LessonsResponse,
};
use super::handlers::users::{
    ProfileResponse, UpdateMembershipRequest, UpdateRoleRequest, UpdateTierRequest,
    UsersListResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::register::register,
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::login::logout,
        crate::api::handlers::auth::verification::verify_email,
        crate::api::handlers::auth::verification::resend_verification,
        crate::api::handlers::auth::password_reset::forgot_password,
        crate::api::handlers::auth::password_reset::reset_password,
        crate::api::handlers::auth::session::me,
        crate::api::handlers::users::profile,
        crate::api::handlers::users::update_membership,
        crate::api::handlers::users::admin_list_users,
        crate::api::handlers::users::admin_update_role,
        crate::api::handlers::users::admin_update_tier,
        crate::api::handlers::users::admin_delete_user,
        crate::api::handlers::lessons::lessons,
        crate::api::handlers::lessons::progress,
        crate::api::handlers::lessons::complete_lesson,
        crate::api::handlers::feedback::submit_feedback,
        crate::api::handlers::feedback::admin_list_feedback,
        crate::api::handlers::feedback::admin_delete_feedback,
    ),
    components(schemas(
        Role,
        MembershipTier,
        RegisterRequest,
        LoginRequest,
        VerifyEmailRequest,
        ResendVerificationRequest,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        UserResponse,
        AuthResponse,
        RegisterResponse,
        VerifyEmailResponse,
        MeResponse,
        MessageResponse,
        ErrorResponse,
        UnverifiedResponse,
        ProfileResponse,
        UsersListResponse,
        UpdateMembershipRequest,
        UpdateRoleRequest,
        UpdateTierRequest,
        Lesson,
        LessonsResponse,
        LessonProgressEntry,
        CompleteLessonRequest,
        SubmitFeedbackRequest,
        SubmitFeedbackResponse,
        FeedbackEntry,
        FeedbackListResponse,
        Health,
    )),
    tags(
        (name = "health", description = "Liveness and dependency checks"),
        (name = "auth", description = "Registration, sessions, verification, password reset"),
        (name = "users", description = "Profile and membership"),
        (name = "admin", description = "User administration"),
        (name = "lessons", description = "Lesson catalog and progress"),
        (name = "feedback", description = "Feedback submission and review"),
    ),
    info(
        title = "financeu",
        description = "Financial literacy platform API",
    )
)]
pub struct ApiDoc;
