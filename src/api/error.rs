//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::agents::AgentError;
use crate::auth::AuthError;
use crate::db::DatabaseError;
use crate::documents::DocumentError;
use crate::transcript::TranscriptError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Unavailable(detail) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            DatabaseError::Conflict(msg) => ApiError::BadRequest(msg),
            DatabaseError::Forbidden(msg) => ApiError::Forbidden(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::AlreadyExists => ApiError::BadRequest(err.to_string()),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::CorruptedCredentials => ApiError::Internal(err.to_string()),
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Io(e) => ApiError::Internal(format!("Document file: {e}")),
            DocumentError::PdfParsing(msg) => {
                ApiError::BadRequest(format!("Error analyzing report: {msg}"))
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        match err {
            TranscriptError::InvalidUserName(name) => {
                ApiError::BadRequest(format!("Invalid user name: {name:?}"))
            }
            TranscriptError::Io(e) => ApiError::Internal(format!("Transcript: {e}")),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        ApiError::Internal(format!("Assistant failed: {err}"))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(response).await["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn booking_conflicts_map_to_client_errors() {
        let response = ApiError::from(DatabaseError::Conflict("Slot already booked".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["message"], "Slot already booked");

        let response = ApiError::from(DatabaseError::not_found("Slot", 99)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await["error"]["message"], "Slot not found");

        let response = ApiError::from(DatabaseError::Forbidden("not yours".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn auth_errors_mapped() {
        assert!(matches!(
            ApiError::from(AuthError::InvalidCredentials),
            ApiError::InvalidCredentials
        ));
        assert!(matches!(
            ApiError::from(AuthError::Validation("Password too short".into())),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn upload_rules_are_bad_requests() {
        assert!(matches!(ApiError::from(DocumentError::NotAllowed), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from(DocumentError::TooLarge(5)), ApiError::BadRequest(_)));
    }
}
