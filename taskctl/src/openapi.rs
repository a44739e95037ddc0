//! OpenAPI documentation configuration.
//!
//! Collects every annotated handler and model into one document, served
//! interactively at `/docs`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::api;

/// Documents the session cookie the auth endpoints set.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "token",
                    "Session cookie issued by /register and /login.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::login_status,
        api::handlers::auth::verify_email,
        api::handlers::auth::verify_user,
        api::handlers::auth::forgot_password,
        api::handlers::auth::reset_password,
        api::handlers::auth::change_password,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::admin::list_users,
        api::handlers::admin::delete_user,
        api::handlers::tasks::create_task,
        api::handlers::tasks::get_tasks,
        api::handlers::tasks::get_task,
        api::handlers::tasks::update_task,
        api::handlers::tasks::delete_task,
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::ForgotPasswordRequest,
            api::models::auth::ResetPasswordRequest,
            api::models::auth::ChangePasswordRequest,
            api::models::auth::AuthUserResponse,
            api::models::auth::MessageResponse,
            api::models::users::Role,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::users::UserProfile,
            api::models::tasks::TaskPriority,
            api::models::tasks::TaskStatus,
            api::models::tasks::TaskCreate,
            api::models::tasks::TaskUpdate,
            api::models::tasks::TaskResponse,
            api::models::tasks::TaskListResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login, and credential lifecycle"),
        (name = "users", description = "The logged-in user's profile"),
        (name = "admin", description = "User administration"),
        (name = "tasks", description = "Per-user task records"),
    )
)]
pub struct ApiDoc;
