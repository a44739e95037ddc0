//! # taskctl: Task Tracking Service
//!
//! `taskctl` is a self-hostable backend for personal task tracking. It provides a RESTful API
//! for user accounts with email verification and password reset flows, per-user task lists,
//! and an admin surface for user management.
//!
//! ## Overview
//!
//! `taskctl` is the server half of a classic task manager: a browser frontend registers users,
//! logs them in, and manages their tasks through this API. Every task belongs to exactly one
//! user, and users can only see and modify their own tasks. A small admin role exists for
//! operating the instance (listing and removing accounts).
//!
//! ### What It Does
//!
//! At its core, `taskctl` authenticates users with email and password, hands out a session
//! cookie, and scopes every task operation to the session user. Account lifecycle flows
//! (email verification, forgotten passwords) are driven by single-use tokens delivered by
//! email. User-facing response messages are in Spanish, matching the frontend this service
//! is built for.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence needs.
//!
//! ### Request Flow
//!
//! Requests first pass through the session layer: the `token` cookie carries a signed JWT whose
//! subject is the user id, and the [`auth::current_user::CurrentUser`] extractor loads the user
//! record from the database on every request, so role and profile changes take effect
//! immediately. Admin routes add a role gate ([`auth::middleware::require_admin`]) in front of
//! the handler. Handlers interact with the database through repository interfaces
//! ([`db::handlers`]) to perform CRUD operations on users, tasks, and auth tokens.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the account routes (`/register`, `/login`, verification
//! and password reset), the profile routes (`/user`), the task routes (`/tasks`), and the
//! admin routes (`/admin/users`). Interactive API documentation is served at `/docs`.
//!
//! The **authentication layer** ([`auth`]) handles bcrypt password hashing, stateless JWT
//! sessions carried in an httpOnly cookie, single-use email tokens, and the role and
//! verification gates.
//!
//! The **database layer** ([`db`]) uses the repository pattern to abstract data access. Each
//! entity (users, tasks, auth tokens) has a corresponding repository that handles queries and
//! mutations.
//!
//! The **email layer** sends verification and password reset mail through SMTP, or writes it
//! to files for local development.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use taskctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = taskctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize structured logging
//!     taskctl::telemetry::init_telemetry()?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and automatically runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! // Run migrations
//! taskctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
//!
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;
use crate::config::CorsOrigin;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::{middleware::require_admin, password},
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};
use axum::{
    Router, http,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{AuthTokenId, TaskId, UserId};

/// Application state shared across all request handlers.
///
/// This struct contains the shared resources needed by the API handlers: the
/// database connection pool and the application configuration. It is cheap to
/// clone; the pool is internally reference-counted.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the taskctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent - it will create a new admin user if one doesn't exist,
/// or refresh the password if the user already exists, so the configured credentials
/// always work. This is typically called during application startup to ensure there's
/// always an admin user available.
///
/// # Arguments
///
/// - `email`: Email address for the admin user
/// - `password`: Plaintext password to hash and store
/// - `db`: PostgreSQL connection pool
///
/// # Returns
///
/// Returns the user ID of the created or existing admin user.
///
/// # Errors
///
/// Returns an error if database operations fail.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: &str, db: &PgPool) -> Result<UserId, sqlx::Error> {
    let password_hash =
        password::hash_string(password).map_err(|e| sqlx::Error::Encode(format!("Failed to hash admin password: {e}").into()))?;

    // Use a transaction to ensure atomicity
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    // Check if user already exists
    if let Some(existing_user) = user_repo
        .get_user_by_email(email)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to check existing user: {e}")))?
    {
        // User exists - refresh the password so the configured credentials stay valid
        sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(&password_hash)
            .bind(email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    // Create new admin user. The admin is born verified; nobody mails the instance operator.
    let user_create = UserCreateDBRequest {
        name: "Admin".to_string(),
        email: email.to_string(),
        password_hash,
        role: Role::Admin,
        is_verified: true,
    };

    let created_user = user_repo
        .create(&user_create)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to create admin user: {e}")))?;

    tx.commit().await?;
    Ok(created_user.id)
}

/// Setup the database connection pool, run migrations, and seed the initial admin user.
#[instrument(skip_all)]
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout((settings.idle_timeout_secs > 0).then(|| std::time::Duration::from_secs(settings.idle_timeout_secs)))
        .max_lifetime((settings.max_lifetime_secs > 0).then(|| std::time::Duration::from_secs(settings.max_lifetime_secs)))
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    // Create initial admin user if credentials are configured
    match config.admin_password.as_deref() {
        Some(admin_password) => {
            create_initial_admin_user(&config.admin_email, admin_password, &pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;
        }
        None => {
            info!("No admin password configured, skipping initial admin user");
        }
    }

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Account routes (registration, login, verification, password reset)
/// - Profile routes for the session user
/// - Task CRUD routes, scoped to the session user
/// - Admin routes for user management, gated by role
/// - Interactive API documentation at `/docs`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Account routes (root level, matching the paths the frontend calls)
    let auth_routes = Router::new()
        .route("/register", post(api::handlers::auth::register))
        .route("/login", post(api::handlers::auth::login))
        .route("/logout", get(api::handlers::auth::logout))
        .route("/login-status", get(api::handlers::auth::login_status))
        .route("/verify-email", post(api::handlers::auth::verify_email))
        .route("/verify-user/{verification_token}", post(api::handlers::auth::verify_user))
        .route("/forgot-password", post(api::handlers::auth::forgot_password))
        .route("/reset-password/{reset_password_token}", post(api::handlers::auth::reset_password))
        .route("/change-password", patch(api::handlers::auth::change_password))
        .with_state(state.clone());

    // Profile routes for the authenticated user
    let user_routes = Router::new()
        .route("/user", get(api::handlers::users::get_user))
        .route("/user", patch(api::handlers::users::update_user))
        .with_state(state.clone());

    // Task CRUD, scoped to the session user
    let task_routes = Router::new()
        .route("/tasks", get(api::handlers::tasks::get_tasks))
        .route("/tasks", post(api::handlers::tasks::create_task))
        .route("/tasks/{task_id}", get(api::handlers::tasks::get_task))
        .route("/tasks/{task_id}", patch(api::handlers::tasks::update_task))
        .route("/tasks/{task_id}", delete(api::handlers::tasks::delete_task))
        .with_state(state.clone());

    // User administration, gated as a whole
    let admin_routes = Router::new()
        .route("/users", get(api::handlers::admin::list_users))
        .route("/users/{user_id}", delete(api::handlers::admin::delete_user))
        .layer(from_fn_with_state(state.clone(), require_admin))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(task_routes)
        .nest("/admin", admin_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] initializes the database pool, runs migrations,
///    and seeds the initial admin user
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests drain and
///    the pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting task service with configuration: {:#?}", config);

        // Setup database connection, run migrations, and seed the admin user
        let pool = setup_database(&config).await?;

        // Build app state and router
        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Task service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
