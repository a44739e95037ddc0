//! Test utilities for integration testing (available with `test-utils` feature).

use crate::{
    AppState,
    api::models::users::Role,
    auth::password,
    config::{Config, EmailConfig, EmailTransportConfig},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use sqlx::PgPool;
use uuid::Uuid;

/// Build a config suitable for tests: signing key set, admin seeding disabled,
/// and outgoing mail written to a temp directory instead of a real SMTP relay.
pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("taskctl-test-emails-{}", std::process::id()));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        email: EmailConfig {
            transport: EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build an [`AppState`] from an externally provisioned pool (usually `#[sqlx::test]`'s).
pub fn create_test_app_state(pool: PgPool, config: Config) -> AppState {
    AppState::builder().db(pool).config(config).build()
}

/// Create a verified user with the given role. Each call generates a unique email.
pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let name = format!("testuser_{}", user_id.simple());
    let email = format!("{name}@example.com");

    // Lowest legal bcrypt cost; these credentials only ever exist inside a test database
    let password_hash = password::hash_string_with_cost("password123", 4).expect("Failed to hash test password");

    let user_create = UserCreateDBRequest {
        name,
        email,
        password_hash,
        role,
        is_verified: true,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}

/// Create a user that has not verified their email address yet.
pub async fn create_unverified_test_user(pool: &PgPool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let name = format!("unverified_{}", user_id.simple());
    let email = format!("{name}@example.com");

    let password_hash = password::hash_string_with_cost("password123", 4).expect("Failed to hash test password");

    let user_create = UserCreateDBRequest {
        name,
        email,
        password_hash,
        role: Role::User,
        is_verified: false,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}
