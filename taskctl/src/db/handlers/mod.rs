//! Repository implementations for database access.
//!
//! This module provides repository structs for each major entity in the system.
//! Repositories follow a consistent pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//! - Uses the connection's transaction for ACID guarantees
//!
//! # Available Repositories
//!
//! - [`Users`]: User account management and authentication
//! - [`AuthTokens`]: Email verification and password reset token lifecycle
//! - [`Tasks`]: Task management, scoped per owner
//!
//! # Common Pattern
//!
//! All repositories follow this usage pattern:
//!
//! ```ignore
//! use taskctl::db::handlers::{Users, Repository};
//! use taskctl::db::handlers::users::UserFilter;
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     // Start a transaction
//!     let mut tx = pool.begin().await?;
//!
//!     // Create repository from transaction
//!     let mut repo = Users::new(&mut tx);
//!
//!     // Perform operations
//!     let users = repo.list(&UserFilter::new(0, 100)).await?;
//!
//!     // Commit or rollback
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod auth_tokens;
pub mod repository;
pub mod tasks;
pub mod users;

pub use auth_tokens::AuthTokens;
pub use repository::Repository;
pub use tasks::Tasks;
pub use users::Users;
