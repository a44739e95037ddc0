//! Authentication and authorization system.
//!
//! This module provides the full credential lifecycle:
//! - Password hashing and verification (bcrypt)
//! - Stateless JWT sessions carried in an httpOnly cookie
//! - Single-use email verification and password reset tokens
//! - Role and verification gates for protecting routes
//!
//! # Session Authentication
//!
//! Browser-based authentication using a secure HTTP-only cookie:
//! - Users log in via `POST /login` with email/password
//! - A signed JWT (subject = user id) is stored in the `token` cookie
//! - The user record is loaded from the database on every request, so
//!   profile and role changes take effect immediately
//! - No server-side session store and no revocation list; a session ends
//!   when the cookie is cleared or the token expires
//!
//! # Authorization
//!
//! Access control is a fixed pipeline of gates, each an unconditional early
//! return on failure:
//! 1. Identify the user from the session cookie ([`current_user`])
//! 2. Role gates where routes require them ([`middleware::require_admin`],
//!    [`middleware::require_creator`])
//! 3. Email verification gate ([`middleware::require_verified`])
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers
//! - [`middleware`]: Route protection middleware
//! - [`password`]: Password hashing and verification using bcrypt
//! - [`session`]: JWT session creation and verification
//! - [`tokens`]: Single-use token generation and hashing
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use taskctl::api::models::users::CurrentUser;
//! use axum::extract::State;
//!
//! async fn protected_handler(
//!     State(state): State<AppState>,
//!     user: CurrentUser,
//! ) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", user.name))
//! }
//! ```

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod session;
pub mod tokens;
