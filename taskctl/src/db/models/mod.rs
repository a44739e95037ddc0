//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Models derive `sqlx::FromRow` for query results
//! - **Separation**: Database models are distinct from API models to allow
//!   independent evolution of storage and API representations
//!
//! # Model Categories
//!
//! - [`users`]: User accounts, credentials, and profiles
//! - [`auth_tokens`]: Time-limited email verification and password reset tokens
//! - [`tasks`]: Tasks owned by users
//!
//! # Conversion to API Models
//!
//! Database models typically implement `From` or `Into` conversions to API models:
//!
//! ```ignore
//! use taskctl::db::models::users::UserDBResponse;
//! use taskctl::api::models::users::UserResponse;
//!
//! let db_user: UserDBResponse = /* ... */;
//! let api_response: UserResponse = db_user.into();
//! ```

pub mod auth_tokens;
pub mod tasks;
pub mod users;
