use serde::{Deserialize, Serialize};

/// An uploaded patient file. `document_path` is relative to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDocument {
    pub id: i64,
    pub patient_id: String,
    pub patient_surname: String,
    pub document_path: String,
    pub upload_date: String,
    pub description: Option<String>,
}

impl PatientDocument {
    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.document_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}
