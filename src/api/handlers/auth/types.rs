//! Request/response types for auth endpoints.
//!
//! Wire names are camelCase to match the frontend client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role. Admins manage users and feedback.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Membership tier, ordered: free < premium < pro.
#[derive(
    ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    Free,
    Premium,
    Pro,
}

impl MembershipTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Pro => "pro",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "premium" => Some(Self::Premium),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

/// Account shape sent to clients; the password hash never leaves the server.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub membership_tier: MembershipTier,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Envelope for endpoints that return a single account.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Login rejection for unverified accounts; the flag lets the frontend
/// offer a resend-verification prompt.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UnverifiedResponse {
    pub error: String,
    pub email_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn tier_ordering_free_premium_pro() {
        assert!(MembershipTier::Free < MembershipTier::Premium);
        assert!(MembershipTier::Premium < MembershipTier::Pro);
        assert!(MembershipTier::Free < MembershipTier::Pro);
    }

    #[test]
    fn role_and_tier_round_trip_strings() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        for tier in [
            MembershipTier::Free,
            MembershipTier::Premium,
            MembershipTier::Pro,
        ] {
            assert_eq!(MembershipTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(MembershipTier::parse("platinum"), None);
    }

    #[test]
    fn user_response_uses_camel_case() -> Result<()> {
        let response = UserResponse {
            id: 7,
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::User,
            membership_tier: MembershipTier::Premium,
            email_verified: true,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value
                .get("membershipTier")
                .and_then(serde_json::Value::as_str),
            Some("premium")
        );
        assert_eq!(
            value
                .get("emailVerified")
                .and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert!(value.get("password").is_none());
        Ok(())
    }

    #[test]
    fn reset_password_request_uses_camel_case() -> Result<()> {
        let decoded: ResetPasswordRequest = serde_json::from_value(serde_json::json!({
            "email": "bob@example.com",
            "token": "abc",
            "newPassword": "hunter22",
        }))?;
        assert_eq!(decoded.new_password, "hunter22");
        Ok(())
    }

    #[test]
    fn verify_email_response_omits_empty_fields() -> Result<()> {
        let response = VerifyEmailResponse {
            message: "Email verified successfully! Please login.".to_string(),
            user: None,
            token: None,
        };
        let value = serde_json::to_value(&response)?;
        let object = value.as_object().context("expected object")?;
        assert!(!object.contains_key("user"));
        assert!(!object.contains_key("token"));
        Ok(())
    }
}
