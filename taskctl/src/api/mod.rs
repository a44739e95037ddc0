//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! The API is divided into several functional areas:
//!
//! - **Authentication** (`/register`, `/login`, `/logout`, `/login-status`,
//!   `/verify-email`, `/verify-user/{token}`, `/forgot-password`,
//!   `/reset-password/{token}`, `/change-password`)
//! - **Profile** (`/user`): The logged-in user's own record
//! - **Admin** (`/admin/users/*`): User administration, admin role required
//! - **Tasks** (`/tasks/*`): Per-user task records
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI/Swagger annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
