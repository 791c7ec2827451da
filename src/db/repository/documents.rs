use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<PatientDocument> {
    Ok(PatientDocument {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_surname: row.get(2)?,
        document_path: row.get(3)?,
        upload_date: row.get(4)?,
        description: row.get(5)?,
    })
}

pub fn insert_document(
    conn: &Connection,
    patient_id: &str,
    patient_surname: &str,
    document_path: &str,
    upload_date: &str,
    description: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO documents (patient_id, patient_surname, document_path, upload_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![patient_id, patient_surname, document_path, upload_date, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_document(conn: &Connection, id: i64) -> Result<Option<PatientDocument>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, patient_surname, document_path, upload_date, description
         FROM documents WHERE id = ?1",
        params![id],
        document_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Documents uploaded by a patient, newest first. Matches on the surname column case-insensitively.
pub fn get_documents_for_patient(
    conn: &Connection,
    patient: &str,
) -> Result<Vec<PatientDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, patient_surname, document_path, upload_date, description
         FROM documents
         WHERE LOWER(patient_surname) = LOWER(?1)
         ORDER BY upload_date DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![patient], document_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn delete_document(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Document", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn documents_listed_per_patient_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_document(&conn, "1", "mario", "mario_a.pdf", "2025-03-10 09:00:00", None).unwrap();
        let newer = insert_document(
            &conn,
            "1",
            "Mario",
            "mario_b.pdf",
            "2025-03-11 09:00:00",
            Some("blood test"),
        )
        .unwrap();
        insert_document(&conn, "2", "luigi", "luigi_a.pdf", "2025-03-11 10:00:00", None).unwrap();

        let docs = get_documents_for_patient(&conn, "MARIO").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, newer);
        assert_eq!(docs[0].extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn delete_missing_document_is_not_found() {
        let conn = open_memory_database().unwrap();
        let id = insert_document(&conn, "1", "mario", "x.png", "2025-03-10 09:00:00", None).unwrap();
        delete_document(&conn, id).unwrap();
        assert!(get_document(&conn, id).unwrap().is_none());
        assert!(matches!(
            delete_document(&conn, id),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
