//! Patient document endpoints.
//!
//! - `POST /api/upload-document`: multipart `file` + optional `description`
//! - `GET /api/my-documents`
//! - `DELETE /api/document/:id`: owner only
//! - `POST /api/analyze-lab-report`: explain an uploaded PDF lab report

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::{Extension, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::db;
use crate::documents::{self, DocumentError, UPLOAD_DATE_FORMAT};
use crate::models::PatientDocument;
use crate::transcript::TranscriptRole;

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub document_id: i64,
    pub filename: String,
}

/// `POST /api/upload-document`
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file data: {e}")))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid description: {e}")))?;
            }
            _ => {}
        }
    }

    let (original_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    documents::validate_upload(&original_name, bytes.len())?;

    let now = Local::now().naive_local();
    let filename = documents::stored_filename(&user.full_name, &now, &original_name);
    let uploads_dir = ctx.config.uploads_dir.clone();
    let path = documents::upload_path(&uploads_dir, &filename)?;

    tokio::fs::create_dir_all(&uploads_dir)
        .await
        .map_err(DocumentError::from)?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(DocumentError::from)?;

    let conn = ctx.open_db()?;
    let description = description.trim();
    let document_id = db::insert_document(
        &conn,
        &user.full_name.to_lowercase(),
        &user.full_name,
        &path.to_string_lossy(),
        &now.format(UPLOAD_DATE_FORMAT).to_string(),
        (!description.is_empty()).then_some(description),
    )?;

    tracing::info!(document_id, size = bytes.len(), "Document uploaded");
    Ok(Json(UploadResponse {
        success: true,
        message: "Document uploaded successfully",
        document_id,
        filename,
    }))
}

#[derive(Serialize)]
pub struct DocumentView {
    pub id: i64,
    pub patient_surname: String,
    pub filename: String,
    pub upload_date: String,
    pub description: Option<String>,
    pub content_type: String,
}

impl From<PatientDocument> for DocumentView {
    fn from(doc: PatientDocument) -> Self {
        let filename = FsPath::new(&doc.document_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(&doc.document_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            id: doc.id,
            patient_surname: doc.patient_surname,
            filename,
            upload_date: doc.upload_date,
            description: doc.description,
            content_type,
        }
    }
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentView>,
}

/// `GET /api/my-documents`: newest first.
pub async fn my_documents(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let documents = db::get_documents_for_patient(&conn, &user.full_name)?
        .into_iter()
        .map(DocumentView::from)
        .collect();
    Ok(Json(DocumentsResponse { documents }))
}

/// Load a document and check that `user` uploaded it.
fn owned_document(
    conn: &rusqlite::Connection,
    id: i64,
    user: &AuthUser,
) -> Result<PatientDocument, ApiError> {
    let doc = db::get_document(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Document not found".into()))?;
    if doc.patient_id.to_lowercase() != user.full_name.to_lowercase() {
        return Err(ApiError::Forbidden("Not authorized".into()));
    }
    Ok(doc)
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `DELETE /api/document/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(document_id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doc = owned_document(&conn, document_id, &user)?;

    match tokio::fs::remove_file(&doc.document_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(document_id, "Document file already missing");
        }
        Err(e) => return Err(DocumentError::from(e).into()),
    }
    db::delete_document(&conn, document_id)?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Document deleted successfully",
    }))
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub document_id: i64,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
}

/// `POST /api/analyze-lab-report`: the analysis is also appended to the caller's transcript.
pub async fn analyze_lab_report(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let doc = {
        let conn = ctx.open_db()?;
        owned_document(&conn, req.document_id, &user)?
    };
    if doc.extension().as_deref() != Some("pdf") {
        return Err(DocumentError::NotPdf.into());
    }
    let path = PathBuf::from(&doc.document_path);
    if !path.exists() {
        return Err(ApiError::NotFound("File not found".into()));
    }

    let agents = ctx.agents.clone();
    let analysis = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let text = documents::extract_pdf_text(&path)?;
        Ok(agents.analyze_lab_report(&text)?)
    })
    .await??;

    ctx.transcripts.log(
        TranscriptRole::Bot,
        &format!("Lab Report Analysis:\n{analysis}"),
        &user.full_name,
    )?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
    }))
}
