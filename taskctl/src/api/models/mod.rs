//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Validation**: Models use serde for deserialization and validation
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! - [`users`]: User profiles, roles, and update requests
//! - [`tasks`]: Task creation, update, and listing payloads
//! - [`auth`]: Login, registration, and password management payloads
//!
//! # Example
//!
//! ```ignore
//! use taskctl::api::models::users::UserResponse;
//!
//! // Serialize to JSON
//! let response = UserResponse { /* ... */ };
//! let json = serde_json::to_string(&response)?;
//! ```

pub mod auth;
pub mod tasks;
pub mod users;
