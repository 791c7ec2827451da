use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (name, specialization, user_id) VALUES (?1, ?2, ?3)",
        params![doctor.name, doctor.specialization, doctor.user_id],
    )?;
    Ok(())
}

/// Every doctor, ordered by specialization then name.
pub fn get_doctor_roster(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, specialization, user_id FROM doctors ORDER BY specialization, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Doctor {
            name: row.get(0)?,
            specialization: row.get(1)?,
            user_id: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Doctor names in insertion order.
pub fn get_doctor_names(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT name FROM doctors ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// The roster entry linked to a doctor account, if any.
pub fn find_doctor_for_user(conn: &Connection, user_id: i64) -> Result<Option<Doctor>, DatabaseError> {
    conn.query_row(
        "SELECT name, specialization, user_id FROM doctors WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(Doctor {
                name: row.get(0)?,
                specialization: row.get(1)?,
                user_id: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

/// All doctors with the slots they still have open.
pub fn get_doctors_with_availability(
    conn: &Connection,
) -> Result<Vec<DoctorAvailability>, DatabaseError> {
    let roster = get_doctor_roster(conn)?;
    let mut stmt = conn.prepare(
        "SELECT id, time_slot FROM appointments
         WHERE doctor = ?1 AND patient IS NULL
         ORDER BY time_slot",
    )?;

    let mut doctors = Vec::with_capacity(roster.len());
    for doctor in roster {
        let slots = stmt
            .query_map(params![doctor.name], |row| {
                Ok(SlotSummary {
                    id: row.get(0)?,
                    time_slot: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        doctors.push(DoctorAvailability {
            name: doctor.name,
            specialization: doctor.specialization,
            available_slots: slots,
        });
    }
    Ok(doctors)
}
