//! Patient document uploads: admission rules, stored names, PDF text.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "pdf", "doc", "docx"];

/// 2 MB.
pub const MAX_FILE_SIZE: usize = 2 * 1024 * 1024;

/// Timestamp embedded in stored file names.
const STORED_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `upload_date` column layout.
pub const UPLOAD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("No file selected")]
    NoFile,

    #[error("File type not allowed. Allowed: {}", ALLOWED_EXTENSIONS.join(", "))]
    NotAllowed,

    #[error("File too large. Maximum size is 2MB. Your file: {:.2}MB", megabytes(.0))]
    TooLarge(usize),

    #[error("Only PDF files can be analyzed")]
    NotPdf,

    #[error("Invalid stored file name: {0}")]
    InvalidStoredName(String),

    #[error("PDF parsing error: {0}")]
    PdfParsing(String),

    #[error("Document file error: {0}")]
    Io(#[from] std::io::Error),
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Check an upload before anything touches disk.
pub fn validate_upload(filename: &str, size: usize) -> Result<(), DocumentError> {
    if filename.trim().is_empty() {
        return Err(DocumentError::NoFile);
    }
    if !allowed_file(filename) {
        return Err(DocumentError::NotAllowed);
    }
    if size > MAX_FILE_SIZE {
        return Err(DocumentError::TooLarge(size));
    }
    Ok(())
}

/// Reduce a client-supplied name to a flat ASCII file name.
///
/// Path components are dropped, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is removed. Leading dots are stripped.
pub fn secure_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let clean: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(200)
        .collect();
    let clean = clean.trim_start_matches(['.', '_']);
    if clean.is_empty() {
        "document".to_string()
    } else {
        clean.to_string()
    }
}

/// `{secure lowercase user}_{YYYYmmdd_HHMMSS}_{secure name}`.
pub fn stored_filename(user_name: &str, now: &NaiveDateTime, original: &str) -> String {
    format!(
        "{}_{}_{}",
        secure_filename(&user_name.to_lowercase()),
        now.format(STORED_NAME_FORMAT),
        secure_filename(original)
    )
}

/// Join a stored name onto the uploads directory. The result must sit directly inside it.
pub fn upload_path(uploads_dir: &Path, filename: &str) -> Result<PathBuf, DocumentError> {
    let path = uploads_dir.join(filename);
    let flat = Path::new(filename).file_name().is_some_and(|n| n == filename);
    if !flat || path.parent() != Some(uploads_dir) {
        return Err(DocumentError::InvalidStoredName(filename.to_string()));
    }
    Ok(path)
}

/// Whole-document text of a PDF on disk, pages joined in order.
pub fn extract_pdf_text(path: &Path) -> Result<String, DocumentError> {
    if extension_of(&path.to_string_lossy()).as_deref() != Some("pdf") {
        return Err(DocumentError::NotPdf);
    }
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| DocumentError::PdfParsing(e.to_string()))?;
    Ok(pages.join("\n"))
}
