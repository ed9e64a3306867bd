//! Database access for accounts and ephemeral tokens.
//!
//! Account lookups match on `LOWER(email)` so addresses compare
//! case-insensitively regardless of how they were stored.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};

use super::state::{AuthConfig, RESET_TOKEN_TTL_SECONDS, VERIFY_TOKEN_TTL_SECONDS};
use super::types::{MembershipTier, Role, UserResponse};
use super::utils::{
    build_reset_url, build_verify_url, generate_ephemeral_token, is_unique_violation,
};
use crate::api::email::enqueue_email;

const USER_COLUMNS: &str =
    "id, email, password, name, role, membership_tier, email_verified, created_at, updated_at";

/// A user row as stored, including the password hash.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) name: String,
    pub(crate) role: Role,
    pub(crate) membership_tier: MembershipTier,
    pub(crate) email_verified: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Client-facing shape, without the password hash.
    pub(crate) fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            membership_tier: self.membership_tier,
            email_verified: self.email_verified,
            created_at: self.created_at,
        }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.try_get("role").context("missing role column")?;
    let role = Role::parse(&role).with_context(|| format!("unknown role in database: {role}"))?;

    let tier: String = row
        .try_get("membership_tier")
        .context("missing membership_tier column")?;
    let membership_tier = MembershipTier::parse(&tier)
        .with_context(|| format!("unknown membership tier in database: {tier}"))?;

    Ok(UserRecord {
        id: row.try_get("id").context("missing id column")?,
        email: row.try_get("email").context("missing email column")?,
        password_hash: row.try_get("password").context("missing password column")?,
        name: row.try_get("name").context("missing name column")?,
        role,
        membership_tier,
        email_verified: row
            .try_get("email_verified")
            .context("missing email_verified column")?,
        created_at: row
            .try_get("created_at")
            .context("missing created_at column")?,
        updated_at: row
            .try_get("updated_at")
            .context("missing updated_at column")?,
    })
}

pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to query user by email")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to query user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Result of a registration insert.
pub(crate) enum RegisterOutcome {
    Created(UserRecord),
    /// Another account already owns the address.
    Conflict,
}

pub(crate) async fn insert_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    let query = format!(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let result = sqlx::query(&query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match result {
        Ok(row) => Ok(RegisterOutcome::Created(user_from_row(&row)?)),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Purpose of an ephemeral token row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::EmailVerification => "verify_email",
            Self::PasswordReset => "reset_password",
        }
    }

    fn ttl_seconds(self) -> i64 {
        match self {
            Self::EmailVerification => VERIFY_TOKEN_TTL_SECONDS,
            Self::PasswordReset => RESET_TOKEN_TTL_SECONDS,
        }
    }

    fn build_link(self, frontend_base_url: &str, token: &str) -> String {
        match self {
            Self::EmailVerification => build_verify_url(frontend_base_url, token),
            Self::PasswordReset => build_reset_url(frontend_base_url, token),
        }
    }
}

/// Issue a fresh ephemeral token and enqueue the matching email, atomically.
///
/// Prior unused tokens for the same address and purpose are marked used in
/// the same transaction, and a partial unique index on live tokens enforces
/// the single-active invariant. Two concurrent issuers can both pass the
/// invalidation step before either insert commits; the index rejects the
/// loser, which retries against the winner's committed row.
///
/// Returns the token value on success.
pub async fn issue_token_and_enqueue(
    pool: &PgPool,
    config: &AuthConfig,
    email: &str,
    name: &str,
    purpose: TokenPurpose,
) -> Result<String> {
    for _ in 0..2 {
        let token = generate_ephemeral_token()?;
        if try_issue(pool, config, email, name, purpose, &token).await? {
            return Ok(token);
        }
    }

    bail!("concurrent token issuance kept colliding for {email}")
}

/// One invalidate-then-insert attempt. Returns false when the insert lost a
/// race against a concurrent issuer (unique violation on the live-token
/// index) and the whole attempt was rolled back.
async fn try_issue(
    pool: &PgPool,
    config: &AuthConfig,
    email: &str,
    name: &str,
    purpose: TokenPurpose,
    token: &str,
) -> Result<bool> {
    let link = purpose.build_link(config.frontend_base_url(), token);
    let payload = serde_json::json!({
        "name": name,
        "link": link,
    });

    let mut tx = pool
        .begin()
        .await
        .context("failed to start token transaction")?;

    let query = r"
        UPDATE ephemeral_tokens
        SET used = TRUE
        WHERE LOWER(email) = LOWER($1)
          AND purpose = $2
          AND used = FALSE
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to invalidate previous tokens")?;

    let query = r"
        INSERT INTO ephemeral_tokens (email, purpose, token, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let inserted = sqlx::query(query)
        .bind(email)
        .bind(purpose.as_str())
        .bind(token)
        .bind(purpose.ttl_seconds())
        .execute(&mut *tx)
        .instrument(span)
        .await;

    match inserted {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => return Ok(false),
        Err(err) => return Err(err).context("failed to insert ephemeral token"),
    }

    enqueue_email(&mut tx, email, purpose.template(), &payload).await?;

    tx.commit()
        .await
        .context("failed to commit token transaction")?;

    Ok(true)
}

/// Look up a live (unused, unexpired) token and return the address it was
/// issued for. Does not consume the token.
pub async fn find_valid_token(
    pool: &PgPool,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Option<String>> {
    let query = r"
        SELECT email
        FROM ephemeral_tokens
        WHERE token = $1
          AND purpose = $2
          AND used = FALSE
          AND expires_at > NOW()
        ORDER BY created_at DESC
        LIMIT 1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to query ephemeral token")?;

    Ok(row.map(|row| row.get("email")))
}

/// Mark a token as used. Single-use enforcement for redeemed tokens.
pub async fn consume_token(pool: &PgPool, token: &str, purpose: TokenPurpose) -> Result<()> {
    let query = r"
        UPDATE ephemeral_tokens
        SET used = TRUE
        WHERE token = $1
          AND purpose = $2
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token)
        .bind(purpose.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to consume ephemeral token")?;

    Ok(())
}

/// Flip the verified flag and return the updated account.
pub(super) async fn mark_email_verified(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = format!(
        "UPDATE users SET email_verified = TRUE, updated_at = NOW() \
         WHERE LOWER(email) = LOWER($1) RETURNING {USER_COLUMNS}"
    );
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Replace the stored password hash. Returns false when no account matches.
pub async fn update_password_by_email(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password = $2, updated_at = NOW()
        WHERE LOWER(email) = LOWER($1)
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    rows.iter().map(user_from_row).collect()
}

pub(crate) async fn update_user_role(pool: &PgPool, id: i64, role: Role) -> Result<bool> {
    let query = r"
        UPDATE users
        SET role = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .bind(role.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update user role")?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_user_tier(
    pool: &PgPool,
    id: i64,
    tier: MembershipTier,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET membership_tier = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .bind(tier.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update membership tier")?;

    Ok(result.rows_affected() > 0)
}

/// Delete an account. Lesson progress rows cascade with it.
pub(crate) async fn delete_user(pool: &PgPool, id: i64) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}
