//! Route table for the HTTP API and the chat WebSocket.
//!
//! Three route groups share one `ApiContext`:
//! - public: health, register, login, doctor listing, `/ws`
//! - patient: any live session (Auth → Audit → Handler)
//! - doctor: a live session with the doctor role (Auth → Doctor gate → Audit → Handler)

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::api::websocket;

/// Request bodies above this are rejected before reaching a handler.
/// Leaves headroom over the upload limit so oversized files get a proper message.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// CORS for the configured web client origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the full application router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer
/// of each protected group). Handlers use `State<ApiContext>`.
/// Path params use `:param` syntax (axum 0.7).
pub fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/api/auth/register", post(endpoints::auth::register))
        .route("/api/auth/login", post(endpoints::auth::login))
        .route("/api/doctors", get(endpoints::appointments::doctors))
        .route("/ws", get(websocket::ws_upgrade))
        .with_state(ctx.clone());

    let patient = Router::new()
        .route("/api/auth/logout", post(endpoints::auth::logout))
        .route("/api/auth/me", get(endpoints::auth::me))
        .route(
            "/api/my-reservations",
            get(endpoints::appointments::my_reservations),
        )
        .route("/api/book-slot/:id", post(endpoints::appointments::book))
        .route("/api/cancel-slot/:id", post(endpoints::appointments::cancel))
        .route("/api/chat-history", get(endpoints::history::chat_history))
        .route("/history", get(endpoints::history::download))
        .route("/api/upload-document", post(endpoints::documents::upload))
        .route("/api/my-documents", get(endpoints::documents::my_documents))
        .route("/api/document/:id", delete(endpoints::documents::delete))
        .route(
            "/api/analyze-lab-report",
            post(endpoints::documents::analyze_lab_report),
        )
        .with_state(ctx.clone())
        // Innermost first, outermost last:
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let doctor = Router::new()
        .route("/api/doctor/dashboard", get(endpoints::doctor::dashboard))
        .route("/api/doctor/patients", get(endpoints::doctor::patients))
        .route(
            "/api/doctor/appointments",
            get(endpoints::doctor::appointments),
        )
        .route(
            "/api/doctor/patient/:name",
            get(endpoints::doctor::patient_detail),
        )
        .route(
            "/api/doctor/generate-problem/:appointment_id",
            post(endpoints::doctor::generate_problem),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_doctor))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    Router::new()
        .merge(public)
        .merge(patient)
        .merge(doctor)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&ctx.config.cors_origins))
}
