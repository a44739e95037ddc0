//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and authorization checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, logout, email verification, and password management
//! - [`users`]: Profile retrieval and updates for the authenticated user
//! - [`admin`]: User administration (listing and deletion)
//! - [`tasks`]: Per-user task CRUD
//!
//! # Authentication
//!
//! Most handlers require authentication via the session cookie. The
//! [`crate::auth::current_user`] extractor resolves the cookie to a user, and
//! the gates in [`crate::auth::middleware`] enforce role and verification
//! requirements before a handler runs.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod admin;
pub mod auth;
pub mod tasks;
pub mod users;
