//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! in-memory `SessionStore`, and injects `AuthUser` into request
//! extensions for downstream handlers.

use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::models::UserRole;

/// The raw token of an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Require a live session. Accesses `ApiContext` from request extensions.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let user = ctx
        .lock_sessions()?
        .validate(token)
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(user);

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Reject authenticated users whose role is not `doctor`. Runs inside `require_auth`.
pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    let is_doctor = req
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|u| u.role == UserRole::Doctor);
    if !is_doctor {
        return ApiError::Forbidden("Doctor access required".into()).into_response();
    }
    next.run(req).await
}
