use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const OPEN_SLOT_SELECT: &str = "SELECT a.id, a.doctor, a.time_slot, d.specialization
     FROM appointments a
     JOIN doctors d ON a.doctor = d.name
     WHERE a.patient IS NULL";

/// `%fragment%` with LIKE wildcards in `fragment` taken literally. Pair with `ESCAPE '\'`.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn open_slot_from_row(row: &Row<'_>) -> rusqlite::Result<OpenSlot> {
    Ok(OpenSlot {
        id: row.get(0)?,
        doctor: row.get(1)?,
        time_slot: row.get(2)?,
        specialization: row.get(3)?,
    })
}

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentSlot> {
    Ok(AppointmentSlot {
        id: row.get(0)?,
        doctor: row.get(1)?,
        time_slot: row.get(2)?,
        patient: row.get(3)?,
        patient_problem: row.get(4)?,
    })
}

pub fn insert_slot(conn: &Connection, doctor: &str, time_slot: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (doctor, time_slot) VALUES (?1, ?2)",
        params![doctor, time_slot],
    )?;
    Ok(conn.last_insert_rowid())
}

// ═══════════════════════════════════════════
// Open slot queries
// ═══════════════════════════════════════════

/// Every open slot, ordered by specialization then time.
pub fn get_open_slots(conn: &Connection) -> Result<Vec<OpenSlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{OPEN_SLOT_SELECT} ORDER BY d.specialization, a.time_slot"
    ))?;
    let rows = stmt.query_map([], open_slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Open slots held by any of the named doctors (case-insensitive), ordered by time.
pub fn get_open_slots_for_doctors(
    conn: &Connection,
    doctors: &[String],
) -> Result<Vec<OpenSlot>, DatabaseError> {
    if doctors.is_empty() {
        return Ok(Vec::new());
    }
    let filter = vec!["LOWER(a.doctor) = LOWER(?)"; doctors.len()].join(" OR ");
    let mut stmt = conn.prepare(&format!(
        "{OPEN_SLOT_SELECT} AND ({filter}) ORDER BY a.time_slot"
    ))?;
    let rows = stmt.query_map(params_from_iter(doctors.iter()), open_slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Open slots whose doctor name contains `fragment`.
pub fn get_open_slots_by_doctor_like(
    conn: &Connection,
    fragment: &str,
) -> Result<Vec<OpenSlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{OPEN_SLOT_SELECT} AND a.doctor LIKE ?1 ESCAPE '\\' ORDER BY a.time_slot"
    ))?;
    let rows = stmt.query_map(params![contains_pattern(fragment)], open_slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Open slots whose doctor's specialization contains `fragment`.
pub fn get_open_slots_by_specialization_like(
    conn: &Connection,
    fragment: &str,
) -> Result<Vec<OpenSlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{OPEN_SLOT_SELECT} AND d.specialization LIKE ?1 ESCAPE '\\' ORDER BY a.doctor, a.time_slot"
    ))?;
    let rows = stmt.query_map(params![contains_pattern(fragment)], open_slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ═══════════════════════════════════════════
// Reservations
// ═══════════════════════════════════════════

const RESERVATION_SELECT: &str = "SELECT a.id, a.doctor, d.specialization, a.time_slot
     FROM appointments a
     JOIN doctors d ON a.doctor = d.name";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        doctor: row.get(1)?,
        specialization: row.get(2)?,
        time_slot: row.get(3)?,
    })
}

/// Slots booked by exactly `patient` (case-insensitive).
pub fn get_reservations(conn: &Connection, patient: &str) -> Result<Vec<Reservation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{RESERVATION_SELECT} WHERE LOWER(a.patient) = LOWER(?1) ORDER BY a.time_slot"
    ))?;
    let rows = stmt.query_map(params![patient], reservation_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Slots whose patient name contains `fragment` (case-insensitive, wildcards literal).
/// Chat-side lookups only; ownership checks go through [`get_reservations`].
pub fn get_reservations_matching(
    conn: &Connection,
    fragment: &str,
) -> Result<Vec<Reservation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{RESERVATION_SELECT} WHERE LOWER(a.patient) LIKE LOWER(?1) ESCAPE '\\' ORDER BY a.time_slot"
    ))?;
    let rows = stmt.query_map(params![contains_pattern(fragment)], reservation_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn get_slot(conn: &Connection, id: i64) -> Result<Option<AppointmentSlot>, DatabaseError> {
    conn.query_row(
        "SELECT id, doctor, time_slot, patient, patient_problem FROM appointments WHERE id = ?1",
        params![id],
        slot_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Assign an open slot to `patient`.
pub fn book_slot(conn: &Connection, id: i64, patient: &str) -> Result<AppointmentSlot, DatabaseError> {
    let slot = get_slot(conn, id)?.ok_or_else(|| DatabaseError::not_found("Slot", id))?;
    if !slot.is_open() {
        return Err(DatabaseError::Conflict("Slot already booked".into()));
    }

    // Another session may book between the read and the write.
    let changed = conn.execute(
        "UPDATE appointments SET patient = ?1 WHERE id = ?2 AND patient IS NULL",
        params![patient, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::Conflict("Slot already booked".into()));
    }

    tracing::info!(slot_id = id, doctor = %slot.doctor, "Slot booked");
    Ok(AppointmentSlot {
        patient: Some(patient.to_string()),
        ..slot
    })
}

/// Release a slot held by `patient`. Clears any stored problem summary.
pub fn cancel_slot(conn: &Connection, id: i64, patient: &str) -> Result<AppointmentSlot, DatabaseError> {
    let slot = get_slot(conn, id)?.ok_or_else(|| DatabaseError::not_found("Slot", id))?;
    let holder = slot
        .patient
        .as_deref()
        .ok_or_else(|| DatabaseError::Conflict("Slot is not booked".into()))?;
    if !holder.eq_ignore_ascii_case(patient) {
        return Err(DatabaseError::Forbidden(
            "You can only cancel your own reservations".into(),
        ));
    }

    conn.execute(
        "UPDATE appointments SET patient = NULL, patient_problem = NULL WHERE id = ?1",
        params![id],
    )?;

    tracing::info!(slot_id = id, doctor = %slot.doctor, "Slot cancelled");
    Ok(AppointmentSlot {
        patient: None,
        patient_problem: None,
        ..slot
    })
}

pub fn set_patient_problem(conn: &Connection, id: i64, problem: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET patient_problem = ?1 WHERE id = ?2",
        params![problem, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Slot", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Doctor-side views
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DoctorStats {
    pub total_patients: i64,
    pub total_booked: i64,
    pub total_available: i64,
}

pub fn get_doctor_stats(conn: &Connection, doctor: &str) -> Result<DoctorStats, DatabaseError> {
    conn.query_row(
        "SELECT
            COUNT(DISTINCT patient),
            COUNT(patient),
            COALESCE(SUM(CASE WHEN patient IS NULL THEN 1 ELSE 0 END), 0)
         FROM appointments WHERE doctor = ?1",
        params![doctor],
        |row| {
            Ok(DoctorStats {
                total_patients: row.get(0)?,
                total_booked: row.get(1)?,
                total_available: row.get(2)?,
            })
        },
    )
    .map_err(Into::into)
}

/// Every slot of one doctor, ordered by time.
pub fn get_doctor_slots(conn: &Connection, doctor: &str) -> Result<Vec<AppointmentSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, doctor, time_slot, patient, patient_problem
         FROM appointments WHERE doctor = ?1 ORDER BY time_slot",
    )?;
    let rows = stmt.query_map(params![doctor], slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Booked slots of one doctor, optionally narrowed to a single patient (case-insensitive).
pub fn get_booked_slots(
    conn: &Connection,
    doctor: &str,
    patient: Option<&str>,
) -> Result<Vec<AppointmentSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, doctor, time_slot, patient, patient_problem
         FROM appointments
         WHERE doctor = ?1 AND patient IS NOT NULL
           AND (?2 IS NULL OR LOWER(patient) = LOWER(?2))
         ORDER BY time_slot",
    )?;
    let rows = stmt.query_map(params![doctor, patient], slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
