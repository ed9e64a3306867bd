//! API route handlers.
//!
//! `auth` owns accounts, sessions, and the email-token flows; `users`,
//! `lessons`, and `feedback` cover the rest of the platform surface.

pub mod auth;
pub mod feedback;
pub mod health;
pub mod lessons;
pub mod users;
