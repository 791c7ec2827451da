//! The caller's chat transcript, parsed or as a download.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::transcript::TranscriptRecord;

#[derive(Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<TranscriptRecord>,
    pub user_name: String,
}

/// `GET /api/chat-history`
pub async fn chat_history(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let messages = ctx.transcripts.records(&user.full_name)?;
    Ok(Json(ChatHistoryResponse {
        messages,
        user_name: user.full_name,
    }))
}

/// `GET /history`: the raw transcript as a `text/plain` attachment.
pub async fn download(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let path = ctx.transcripts.path_for(&user.full_name)?;
    if !path.exists() {
        return Err(ApiError::NotFound("No history found".into()));
    }
    let content = ctx.transcripts.read(&user.full_name)?;
    let disposition = format!(
        "attachment; filename=\"{}_chat_history.txt\"",
        user.full_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
