//! Auth handlers and supporting modules.
//!
//! This module coordinates account registration, password login, email
//! verification, password reset, and the stateless session credential.
//!
//! ## Sessions
//!
//! A session is an HS256-signed token carrying the account's id, email,
//! name, role, and membership tier. Nothing is stored server-side, so a
//! session cannot be revoked before it expires; logout only clears the
//! client cookie. The trade-off is recorded in `DESIGN.md`.
//!
//! ## Ephemeral tokens
//!
//! Email verification and password reset are gated by single-use random
//! tokens in `ephemeral_tokens`. Issuing a token marks all prior unused
//! tokens for the same (email, purpose) as used in the same transaction,
//! and a partial unique index on live tokens holds the single-active
//! invariant even when two issuers interleave.

pub(crate) mod login;
pub(crate) mod password_reset;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
pub(crate) mod types;
pub(crate) mod verification;

pub mod storage;

mod password;
mod state;
mod token;
mod utils;

pub use state::{AuthConfig, AuthState};
