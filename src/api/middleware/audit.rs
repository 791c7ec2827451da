//! Access logging for authenticated routes.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AuthUser;

/// Log who called what, and the resulting status.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req.extensions().get::<AuthUser>().map(|u| u.user_id);

    let response = next.run(req).await;

    tracing::info!(
        user_id = ?user_id,
        %method,
        path,
        status = response.status().as_u16(),
        "API access"
    );
    response
}
