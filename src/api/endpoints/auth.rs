//! Account endpoints: register, login, logout, current user.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::ApiContext;
use crate::auth::{self, AuthUser, Registration};
use crate::db;
use crate::models::{Doctor, User, UserRole};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: i64,
}

/// `POST /api/auth/register`: always creates a patient account.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let registration = Registration {
        username: req.username,
        email: req.email,
        password: req.password,
        full_name: req.full_name,
    };
    // PBKDF2 runs off the async workers.
    let user = tokio::task::spawn_blocking(move || -> Result<User, ApiError> {
        let conn = ctx.open_db()?;
        Ok(auth::register(&conn, registration)?)
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful",
            user_id: user.id,
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/login` → bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let login = req.username.trim().to_string();
    if login.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let ctx_blocking = ctx.clone();
    let user = tokio::task::spawn_blocking(move || -> Result<User, ApiError> {
        let conn = ctx_blocking.open_db()?;
        Ok(auth::authenticate(&conn, &login, &req.password)?)
    })
    .await??;

    let token = ctx.lock_sessions()?.create(AuthUser::from(&user));
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token,
        user,
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `POST /api/auth/logout`: revokes the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        ctx.lock_sessions()?.revoke(token);
    }
    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out successfully",
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: User,
    pub doctor_info: Option<Doctor>,
}

/// `GET /api/auth/me`
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let user = db::get_user(&conn, auth.user_id)?.ok_or(ApiError::Unauthorized)?;
    let doctor_info = match user.role {
        UserRole::Doctor => db::find_doctor_for_user(&conn, user.id)?,
        _ => None,
    };
    Ok(Json(MeResponse {
        authenticated: true,
        user,
        doctor_info,
    }))
}
