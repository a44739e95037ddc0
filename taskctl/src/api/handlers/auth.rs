use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::models::{
        auth::{
            AuthUserResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, LogoutResponse,
            MessageResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
        },
        users::CurrentUser,
    },
    auth::{current_user::session_cookie, password, session},
    db::{
        handlers::{AuthTokens, Repository, Users},
        models::{
            auth_tokens::TokenPurpose,
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    email::EmailService,
    errors::Error,
    AppState,
};

/// Treat a missing field and an empty string the same way during validation.
fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthUserResponse),
        (status = 400, description = "Missing fields, short password, or email already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    let (Some(name), Some(email), Some(request_password)) = (
        non_empty(request.name),
        non_empty(request.email),
        non_empty(request.password),
    ) else {
        return Err(Error::BadRequest {
            message: "Todos los campos son obligatorios".to_string(),
        });
    };

    let password_config = &state.config.auth.native.password;
    if request_password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("La contraseña debe tener al menos {} caracteres", password_config.min_length),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Check if user with this email already exists
    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "El usuario ya existe".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let bcrypt_cost = password_config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_cost(&request_password, bcrypt_cost))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let create_request = UserCreateDBRequest {
        name,
        email,
        password_hash,
        role: crate::api::models::users::Role::User,
        is_verified: false,
    };

    let created_user = user_repo.create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    // Create session token and set the cookie
    let token = session::create_session_token(created_user.id, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        user: AuthUserResponse::new(created_user, token),
        cookie,
    })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthUserResponse),
        (status = 400, description = "Missing fields or wrong password"),
        (status = 404, description = "No account with that email"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let (Some(email), Some(request_password)) = (non_empty(request.email), non_empty(request.password)) else {
        return Err(Error::BadRequest {
            message: "Todos los campos son obligatorios".to_string(),
        });
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Find user by email
    let user = user_repo.get_user_by_email(&email).await?.ok_or_else(|| Error::NotFound {
        message: "Usuario no encontrado, regístrate".to_string(),
    })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&request_password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::BadRequest {
            message: "Credenciales inválidas".to_string(),
        });
    }

    // Create session token and set the cookie
    let token = session::create_session_token(user.id, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        user: AuthUserResponse::new(user, token),
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    get,
    path = "/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Expired cookie with the same attributes as the session cookie clears it
    let cookie = clear_session_cookie(&state.config);

    Ok(LogoutResponse {
        body: MessageResponse {
            message: "Usuario desconectado".to_string(),
        },
        cookie,
    })
}

/// Report whether the caller holds a valid session
///
/// Returns a bare JSON boolean rather than an object. A missing cookie is an
/// error; a present but invalid cookie answers `false` with a 401.
#[utoipa::path(
    get,
    path = "/login-status",
    tag = "authentication",
    responses(
        (status = 200, description = "Session is valid", body = bool),
        (status = 401, description = "No cookie, or the token does not verify"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login_status(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, Error> {
    let Some(token) = session_cookie(&headers, &state.config) else {
        return Err(Error::Unauthenticated {
            message: Some("No autorizado, por favor iniciar sesión".to_string()),
        });
    };

    match session::verify_session_token(&token, &state.config) {
        Ok(_) => Ok((StatusCode::OK, Json(true)).into_response()),
        Err(Error::Unauthenticated { .. }) => Ok((StatusCode::UNAUTHORIZED, Json(false)).into_response()),
        Err(other) => Err(other),
    }
}

/// Send an email verification link to the logged-in user
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = "authentication",
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 400, description = "Account is already verified"),
        (status = 500, description = "Email could not be dispatched"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn verify_email(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<MessageResponse>, Error> {
    if current_user.is_verified {
        return Err(Error::BadRequest {
            message: "El usuario ya está verificado".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut token_repo = AuthTokens::new(&mut pool_conn);

    // Reissue: any previous verification token for this user stops working
    let (raw_token, _token) = token_repo
        .create_for_user(current_user.id, TokenPurpose::EmailVerification, &state.config)
        .await?;

    let verification_link = format!("{}/verify-email/{}", state.config.frontend_url, raw_token);

    let email_service = EmailService::new(&state.config)?;
    email_service
        .send_verification_email(&current_user.email, &current_user.name, &verification_link)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email enviado".to_string(),
    }))
}

/// Redeem an email verification token
#[utoipa::path(
    post,
    path = "/verify-user/{verification_token}",
    tag = "authentication",
    params(("verification_token" = String, Path, description = "Token from the verification link")),
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 400, description = "Token invalid, expired, or account already verified"),
        (status = 404, description = "Account no longer exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_user(State(state): State<AppState>, Path(verification_token): Path<String>) -> Result<Json<MessageResponse>, Error> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let token = {
        let mut token_repo = AuthTokens::new(&mut tx);
        token_repo
            .find_valid(&verification_token, TokenPurpose::EmailVerification)
            .await?
            .ok_or_else(|| Error::BadRequest {
                message: "Token de verificación no válido o vencido".to_string(),
            })?
    };

    let mut user_repo = Users::new(&mut tx);
    let user = user_repo.get_by_id(token.user_id).await?.ok_or_else(|| Error::NotFound {
        message: "Usuario no encontrado".to_string(),
    })?;

    if user.is_verified {
        return Err(Error::BadRequest {
            message: "El usuario ya está verificado".to_string(),
        });
    }

    let update_request = UserUpdateDBRequest {
        is_verified: Some(true),
        ..Default::default()
    };
    user_repo.update(user.id, &update_request).await?;

    // Single use: the redeemed token is gone
    let mut token_repo = AuthTokens::new(&mut tx);
    token_repo.delete(token.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MessageResponse {
        message: "Usuario verificado".to_string(),
    }))
}

/// Request a password reset link by email
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse),
        (status = 400, description = "Email missing from the request"),
        (status = 404, description = "No account with that email"),
        (status = 500, description = "Email could not be dispatched"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let Some(email) = non_empty(request.email) else {
        return Err(Error::BadRequest {
            message: "Se requiere email".to_string(),
        });
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = {
        let mut user_repo = Users::new(&mut pool_conn);
        user_repo.get_user_by_email(&email).await?.ok_or_else(|| Error::NotFound {
            message: "Usuario no encontrado".to_string(),
        })?
    };

    // Reissue: any previous reset token for this user stops working
    let mut token_repo = AuthTokens::new(&mut pool_conn);
    let (raw_token, _token) = token_repo
        .create_for_user(user.id, TokenPurpose::PasswordReset, &state.config)
        .await?;

    let reset_link = format!("{}/reset-password/{}", state.config.frontend_url, raw_token);

    let email_service = EmailService::new(&state.config)?;
    email_service.send_password_reset_email(&user.email, &user.name, &reset_link).await?;

    Ok(Json(MessageResponse {
        message: "Email enviado".to_string(),
    }))
}

/// Redeem a password reset token and set a new password
#[utoipa::path(
    post,
    path = "/reset-password/{reset_password_token}",
    request_body = ResetPasswordRequest,
    tag = "authentication",
    params(("reset_password_token" = String, Path, description = "Token from the reset link")),
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Password missing, or token invalid or expired"),
        (status = 404, description = "Account no longer exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_password_token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let Some(new_password) = non_empty(request.password) else {
        return Err(Error::BadRequest {
            message: "Se requiere contraseña".to_string(),
        });
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let token = {
        let mut token_repo = AuthTokens::new(&mut tx);
        token_repo
            .find_valid(&reset_password_token, TokenPurpose::PasswordReset)
            .await?
            .ok_or_else(|| Error::BadRequest {
                message: "Token de reinicio no válido o vencido".to_string(),
            })?
    };

    let mut user_repo = Users::new(&mut tx);
    let user = user_repo.get_by_id(token.user_id).await?.ok_or_else(|| Error::NotFound {
        message: "Usuario no encontrado".to_string(),
    })?;

    // Hash new password
    let bcrypt_cost = state.config.auth.native.password.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_cost(&new_password, bcrypt_cost))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let update_request = UserUpdateDBRequest {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    user_repo.update(user.id, &update_request).await?;

    // Single use: drop the redeemed token along with any stray reset tokens
    let mut token_repo = AuthTokens::new(&mut tx);
    token_repo.invalidate_for_user(user.id, TokenPurpose::PasswordReset).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MessageResponse {
        message: "Restablecimiento de contraseña exitoso".to_string(),
    }))
}

/// Change password for the logged-in user
#[utoipa::path(
    patch,
    path = "/change-password",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields or wrong current password"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let (Some(current_password), Some(new_password)) = (non_empty(request.current_password), non_empty(request.new_password)) else {
        return Err(Error::BadRequest {
            message: "Todos los campos son obligatorios".to_string(),
        });
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // The extractor does not carry the hash, so fetch the full row
    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        message: "Usuario no encontrado".to_string(),
    })?;

    // Verify current password
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current_password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::BadRequest {
            message: "Contraseña inválida".to_string(),
        });
    }

    // Hash new password
    let bcrypt_cost = state.config.auth.native.password.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_cost(&new_password, bcrypt_cost))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let update_request = UserUpdateDBRequest {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    user_repo.update(current_user.id, &update_request).await?;

    Ok(Json(MessageResponse {
        message: "Contraseña cambiada exitosamente".to_string(),
    }))
}

/// Helper function to create a session cookie
pub(crate) fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let secure = if session_config.cookie_secure { "; Secure" } else { "" };
    let max_age = session_config.timeout.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly{}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, secure, session_config.cookie_same_site, max_age
    )
}

/// Expired cookie with the same attributes, used to clear the session
fn clear_session_cookie(config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let secure = if session_config.cookie_secure { "; Secure" } else { "" };

    format!(
        "{}=; Path=/; HttpOnly{}; SameSite={}; Max-Age=0",
        session_config.cookie_name, secure, session_config.cookie_same_site
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::AuthTokens;
    use crate::test_utils::{create_test_app_state, create_test_config, create_test_user, create_unverified_test_user};
    use axum::routing::{get, patch, post};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use sqlx::PgPool;

    fn auth_router(state: AppState) -> axum::Router {
        axum::Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", get(logout))
            .route("/login-status", get(login_status))
            .route("/verify-email", post(verify_email))
            .route("/verify-user/{verification_token}", post(verify_user))
            .route("/forgot-password", post(forgot_password))
            .route("/reset-password/{reset_password_token}", post(reset_password))
            .route("/change-password", patch(change_password))
            .with_state(state)
    }

    #[test_log::test(sqlx::test)]
    async fn test_register_success(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let cookie_header = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie_header.starts_with("token="));
        assert!(cookie_header.contains("HttpOnly"));
        assert!(cookie_header.contains("SameSite=none"));

        let body: Value = response.json();
        assert_eq!(body["name"], "Ana");
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["role"], "user");
        assert_eq!(body["isVerified"], false);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        // The hash must never appear in a response
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
    }

    #[test_log::test(sqlx::test)]
    async fn test_register_missing_fields(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        for body in [
            json!({"email": "ana@example.com", "password": "secret123"}),
            json!({"name": "Ana", "password": "secret123"}),
            json!({"name": "Ana", "email": "ana@example.com"}),
            json!({"name": "", "email": "ana@example.com", "password": "secret123"}),
        ] {
            let response = server.post("/register").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["message"], "Todos los campos son obligatorios");
        }
    }

    #[test_log::test(sqlx::test)]
    async fn test_register_short_password(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "12345"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "La contraseña debe tener al menos 6 caracteres");
    }

    #[test_log::test(sqlx::test)]
    async fn test_register_duplicate_email(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let request = json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"});
        server.post("/register").json(&request).await.assert_status(StatusCode::CREATED);

        let response = server.post("/register").json(&request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "El usuario ya existe");
    }

    #[test_log::test(sqlx::test)]
    async fn test_login_round_trip(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "secret123"}))
            .await;

        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());
        let body: Value = response.json();
        assert_eq!(body["email"], "ana@example.com");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[test_log::test(sqlx::test)]
    async fn test_login_unknown_email(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server
            .post("/login")
            .json(&json!({"email": "nadie@example.com", "password": "secret123"}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["message"], "Usuario no encontrado, regístrate");
    }

    #[test_log::test(sqlx::test)]
    async fn test_login_wrong_password(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "wrong-password"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Credenciales inválidas");
    }

    #[test_log::test(sqlx::test)]
    async fn test_logout_clears_cookie(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server.get("/logout").await;

        response.assert_status_ok();
        let cookie_header = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie_header.starts_with("token=;"));
        assert!(cookie_header.contains("Max-Age=0"));
        let body: Value = response.json();
        assert_eq!(body["message"], "Usuario desconectado");
    }

    #[test_log::test(sqlx::test)]
    async fn test_login_status(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(auth_router(state)).unwrap();

        // No cookie at all
        let response = server.get("/login-status").await;
        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["message"], "No autorizado, por favor iniciar sesión");

        // A valid session answers a bare `true`
        let user = create_test_user(&pool, crate::api::models::users::Role::User).await;
        let token = session::create_session_token(user.id, &config).unwrap();
        let response = server
            .get("/login-status")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!(true));

        // Garbage answers a bare `false`
        let response = server
            .get("/login-status")
            .add_header(axum::http::header::COOKIE, "token=not-a-jwt")
            .await;
        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body, json!(false));
    }

    #[test_log::test(sqlx::test)]
    async fn test_verify_email_and_redeem(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(auth_router(state)).unwrap();

        let user = create_unverified_test_user(&pool).await;
        let token = session::create_session_token(user.id, &config).unwrap();

        let response = server
            .post("/verify-email")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Email enviado");

        // The raw token only exists inside the emailed link, so mint a fresh
        // one directly; reissue keeps exactly one live per purpose.
        let mut conn = pool.acquire().await.unwrap();
        let mut token_repo = AuthTokens::new(&mut conn);
        let (raw_token, _) = token_repo
            .create_for_user(user.id, TokenPurpose::EmailVerification, &config)
            .await
            .unwrap();
        drop(conn);

        let response = server.post(&format!("/verify-user/{raw_token}")).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Usuario verificado");

        // Second redemption of the same token fails: it was deleted
        let response = server.post(&format!("/verify-user/{raw_token}")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Token de verificación no válido o vencido");
    }

    #[test_log::test(sqlx::test)]
    async fn test_verify_email_already_verified(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(auth_router(state)).unwrap();

        let user = create_test_user(&pool, crate::api::models::users::Role::User).await;
        let token = session::create_session_token(user.id, &config).unwrap();

        let response = server
            .post("/verify-email")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "El usuario ya está verificado");
    }

    #[test_log::test(sqlx::test)]
    async fn test_verify_user_bad_token(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server.post("/verify-user/deadbeef").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Token de verificación no válido o vencido");
    }

    #[test_log::test(sqlx::test)]
    async fn test_forgot_password_validation(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server.post("/forgot-password").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Se requiere email");

        let response = server.post("/forgot-password").json(&json!({"email": "nadie@example.com"})).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["message"], "Usuario no encontrado");
    }

    #[test_log::test(sqlx::test)]
    async fn test_reset_password_flow(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(auth_router(state)).unwrap();

        server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/forgot-password")
            .json(&json!({"email": "ana@example.com"}))
            .await
            .assert_status_ok();

        // Mint the reset token directly, standing in for the emailed link
        let mut conn = pool.acquire().await.unwrap();
        let user = crate::db::handlers::Users::new(&mut conn)
            .get_user_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        let mut token_repo = AuthTokens::new(&mut conn);
        let (raw_token, _) = token_repo
            .create_for_user(user.id, TokenPurpose::PasswordReset, &config)
            .await
            .unwrap();
        drop(conn);

        let response = server
            .post(&format!("/reset-password/{raw_token}"))
            .json(&json!({"password": "nueva-clave"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Restablecimiento de contraseña exitoso");

        // Old password is out, new one works
        server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "secret123"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "nueva-clave"}))
            .await
            .assert_status_ok();

        // The token was consumed
        let response = server
            .post(&format!("/reset-password/{raw_token}"))
            .json(&json!({"password": "otra-clave"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Token de reinicio no válido o vencido");
    }

    #[test_log::test(sqlx::test)]
    async fn test_reset_password_missing_password(pool: PgPool) {
        let state = create_test_app_state(pool, create_test_config());
        let server = TestServer::new(auth_router(state)).unwrap();

        let response = server.post("/reset-password/deadbeef").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Se requiere contraseña");
    }

    #[test_log::test(sqlx::test)]
    async fn test_change_password(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(auth_router(state)).unwrap();

        server
            .post("/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "secret123"}))
            .await
            .assert_status(StatusCode::CREATED);
        let login: Value = server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "secret123"}))
            .await
            .json();
        let session_token = login["token"].as_str().unwrap().to_string();

        // Wrong current password
        let response = server
            .patch("/change-password")
            .add_header(axum::http::header::COOKIE, format!("token={session_token}"))
            .json(&json!({"currentPassword": "wrong", "newPassword": "nueva-clave"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Contraseña inválida");

        // Missing fields
        let response = server
            .patch("/change-password")
            .add_header(axum::http::header::COOKIE, format!("token={session_token}"))
            .json(&json!({"currentPassword": "secret123"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Todos los campos son obligatorios");

        // Success flips which password verifies
        let response = server
            .patch("/change-password")
            .add_header(axum::http::header::COOKIE, format!("token={session_token}"))
            .json(&json!({"currentPassword": "secret123", "newPassword": "nueva-clave"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Contraseña cambiada exitosamente");

        server
            .post("/login")
            .json(&json!({"email": "ana@example.com", "password": "nueva-clave"}))
            .await
            .assert_status_ok();
    }
}
