//! Demo data: patient, doctor and admin accounts, the doctor roster and a
//! few weeks of weekday slots starting tomorrow.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use rusqlite::Connection;

use super::repository::{book_slot, insert_doctor, insert_slot, insert_user, set_patient_problem};
use super::DatabaseError;
use crate::auth::hash_password;
use crate::models::*;

const DEMO_PATIENTS: &[(&str, &str, &str)] = &[
    ("rossi", "mario.rossi@email.com", "Mario Rossi"),
    ("doe", "john.doe@email.com", "John Doe"),
    ("bianchi", "luca.bianchi@email.com", "Luca Bianchi"),
    ("verdi", "anna.verdi@email.com", "Anna Verdi"),
    ("martini", "paolo.martini@email.com", "Paolo Martini"),
];

const DEMO_DOCTORS: &[(&str, &str, &str)] = &[
    ("Dr. Fontana", "Neurology", "fontana"),
    ("Dr. Moretti", "Neurology", "moretti"),
    ("Dr. Ricci", "Pneumology", "ricci"),
    ("Dr. Colombo", "Cardiology", "colombo"),
    ("Dr. Ferrari", "Cardiology", "ferrari"),
    ("Dr. Romano", "Dermatology", "romano"),
    ("Dr. Greco", "Gastroenterology", "greco"),
    ("Dr. Conti", "Endocrinology", "conti"),
    ("Dr. Mancini", "Orthopedics", "mancini"),
    ("Dr. Barbieri", "Ophthalmology", "barbieri"),
];

const SLOT_HOURS: [u32; 6] = [9, 10, 11, 14, 15, 16];

/// Pre-booked demo appointments: (slot ordinal, patient, problem).
const DEMO_BOOKINGS: &[(usize, &str, &str)] = &[
    (2, "Mario Rossi", "Persistent headaches for the past 2 weeks"),
    (8, "Luca Bianchi", "Difficulty breathing during exercise"),
    (15, "Anna Verdi", "Chest pain and palpitations"),
];

pub const DEMO_PATIENT_PASSWORD: &str = "Password123!";
pub const DEMO_DOCTOR_PASSWORD: &str = "DoctorPass123!";
pub const DEMO_ADMIN_PASSWORD: &str = "AdminPass123!";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub doctors: usize,
    pub slots: usize,
}

/// Slot times for one doctor: three weekdays spread five days apart,
/// taking every other hour of the clinic day with a shifting offset.
pub fn demo_slot_times(first_day: NaiveDate, doctor_index: usize) -> Vec<String> {
    let mut times = Vec::new();
    for round in 0..3usize {
        let mut day = first_day + Duration::days((doctor_index % 5 + round * 5) as i64);
        while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += Duration::days(1);
        }
        for hour in SLOT_HOURS.iter().skip(round).step_by(2) {
            if let Some(at) = day.and_hms_opt(*hour, 0, 0) {
                times.push(at.format(SLOT_TIME_FORMAT).to_string());
            }
        }
    }
    times
}

/// Populate an empty database with demo data inside one transaction.
pub fn seed_demo_data(conn: &mut Connection) -> Result<SeedReport, DatabaseError> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    if existing > 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Database already contains doctors; refusing to seed".into(),
        ));
    }

    let tx = conn.transaction()?;
    let mut report = SeedReport::default();

    for (username, email, full_name) in DEMO_PATIENTS {
        insert_user(&tx, &account(username, email, full_name, UserRole::Patient, DEMO_PATIENT_PASSWORD))?;
        report.users += 1;
    }

    let first_day = Local::now().date_naive() + Duration::days(1);
    let mut ordinal = 0usize;
    let mut slot_ids = Vec::new();

    for (index, (name, specialization, short)) in DEMO_DOCTORS.iter().enumerate() {
        let user_id = insert_user(
            &tx,
            &account(
                &format!("dr.{short}"),
                &format!("{short}@medassist.com"),
                name,
                UserRole::Doctor,
                DEMO_DOCTOR_PASSWORD,
            ),
        )?;
        report.users += 1;

        insert_doctor(
            &tx,
            &Doctor {
                name: name.to_string(),
                specialization: specialization.to_string(),
                user_id: Some(user_id),
            },
        )?;
        report.doctors += 1;

        for time in demo_slot_times(first_day, index) {
            slot_ids.push((ordinal, insert_slot(&tx, name, &time)?));
            ordinal += 1;
        }
    }

    insert_user(
        &tx,
        &account("admin", "admin@medassist.com", "System Admin", UserRole::Admin, DEMO_ADMIN_PASSWORD),
    )?;
    report.users += 1;

    for (wanted, patient, problem) in DEMO_BOOKINGS {
        if let Some((_, id)) = slot_ids.iter().find(|(ord, _)| ord == wanted) {
            book_slot(&tx, *id, patient)?;
            set_patient_problem(&tx, *id, problem)?;
        }
    }

    report.slots = slot_ids.len();
    tx.commit()?;

    tracing::info!(
        users = report.users,
        doctors = report.doctors,
        slots = report.slots,
        "Demo data seeded"
    );
    Ok(report)
}

fn account(username: &str, email: &str, full_name: &str, role: UserRole, password: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: email.into(),
        full_name: full_name.into(),
        role,
        credentials: hash_password(password),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_doctor_roster, get_open_slots, get_reservations, open_memory_database};

    #[test]
    fn slot_times_skip_weekends() {
        // 2025-03-07 is a Friday
        let friday = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let times = demo_slot_times(friday, 1);
        assert_eq!(times.len(), 3 + 3 + 2);
        // index 1 lands on Saturday 08-03 and moves to Monday 10-03
        assert_eq!(times[0], "10-03-2025 09:00:00");
        assert_eq!(times[3], "13-03-2025 10:00:00");
        for t in &times {
            let date = chrono::NaiveDateTime::parse_from_str(t, SLOT_TIME_FORMAT).unwrap();
            assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn seeding_populates_roster_and_bookings() {
        let mut conn = open_memory_database().unwrap();
        let report = seed_demo_data(&mut conn).unwrap();
        assert_eq!(report.doctors, 10);
        assert_eq!(report.users, 16);
        assert_eq!(report.slots, 80);

        assert_eq!(get_doctor_roster(&conn).unwrap().len(), 10);
        assert_eq!(get_open_slots(&conn).unwrap().len(), 77);
        assert_eq!(get_reservations(&conn, "mario rossi").unwrap().len(), 1);

        assert!(seed_demo_data(&mut conn).is_err());
    }
}
