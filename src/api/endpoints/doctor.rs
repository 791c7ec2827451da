//! Doctor-role endpoints. Every handler resolves the caller's roster entry
//! first and only ever reads that doctor's slots.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use rusqlite::Connection;
use serde::Serialize;

use crate::api::endpoints::documents::DocumentView;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::db::{self, DoctorStats};
use crate::models::{AppointmentSlot, Doctor};
use crate::transcript::TranscriptRecord;

const UPCOMING_LIMIT: usize = 5;

fn doctor_profile(conn: &Connection, user: &AuthUser) -> Result<Doctor, ApiError> {
    db::find_doctor_for_user(conn, user.user_id)?
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found".into()))
}

/// One booked visit as seen from the doctor's side.
#[derive(Serialize)]
pub struct VisitView {
    pub slot_id: i64,
    pub time_slot: String,
    pub patient: Option<String>,
    pub problem: Option<String>,
}

impl From<AppointmentSlot> for VisitView {
    fn from(slot: AppointmentSlot) -> Self {
        Self {
            slot_id: slot.id,
            time_slot: slot.time_slot,
            patient: slot.patient,
            problem: slot.patient_problem,
        }
    }
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub doctor: Doctor,
    pub stats: DoctorStats,
    pub upcoming_appointments: Vec<VisitView>,
}

/// `GET /api/doctor/dashboard`
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doctor = doctor_profile(&conn, &user)?;
    let stats = db::get_doctor_stats(&conn, &doctor.name)?;
    let upcoming_appointments = db::get_booked_slots(&conn, &doctor.name, None)?
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(VisitView::from)
        .collect();
    Ok(Json(DashboardResponse {
        doctor,
        stats,
        upcoming_appointments,
    }))
}

#[derive(Serialize)]
pub struct PatientSummary {
    pub name: String,
    pub appointments: Vec<VisitView>,
}

#[derive(Serialize)]
pub struct PatientsResponse {
    pub doctor: Doctor,
    pub patients: Vec<PatientSummary>,
    pub total_patients: usize,
}

/// Group booked slots by patient, patients in order of first appearance.
fn group_by_patient(slots: Vec<AppointmentSlot>) -> Vec<PatientSummary> {
    let mut patients: Vec<PatientSummary> = Vec::new();
    for slot in slots {
        let Some(name) = slot.patient.clone() else {
            continue;
        };
        match patients.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.appointments.push(slot.into()),
            None => patients.push(PatientSummary {
                name,
                appointments: vec![slot.into()],
            }),
        }
    }
    patients
}

/// `GET /api/doctor/patients`
pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PatientsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doctor = doctor_profile(&conn, &user)?;
    let patients = group_by_patient(db::get_booked_slots(&conn, &doctor.name, None)?);
    Ok(Json(PatientsResponse {
        doctor,
        total_patients: patients.len(),
        patients,
    }))
}

#[derive(Serialize)]
pub struct ScheduleEntry {
    pub slot_id: i64,
    pub time_slot: String,
    pub patient: Option<String>,
    pub patient_problem: Option<String>,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct Schedule {
    pub booked: Vec<ScheduleEntry>,
    pub available: Vec<ScheduleEntry>,
    pub total_booked: usize,
    pub total_available: usize,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub doctor: Doctor,
    pub appointments: Schedule,
}

/// `GET /api/doctor/appointments`: booked and open slots, split.
pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doctor = doctor_profile(&conn, &user)?;

    let (booked, available): (Vec<_>, Vec<_>) = db::get_doctor_slots(&conn, &doctor.name)?
        .into_iter()
        .map(|slot| ScheduleEntry {
            status: if slot.is_open() { "available" } else { "booked" },
            slot_id: slot.id,
            time_slot: slot.time_slot,
            patient: slot.patient,
            patient_problem: slot.patient_problem,
        })
        .partition(|entry| entry.status == "booked");

    Ok(Json(AppointmentsResponse {
        doctor,
        appointments: Schedule {
            total_booked: booked.len(),
            total_available: available.len(),
            booked,
            available,
        },
    }))
}

#[derive(Serialize)]
pub struct PatientDetail {
    pub name: String,
    pub appointments: Vec<VisitView>,
    pub documents: Vec<DocumentView>,
}

#[derive(Serialize)]
pub struct PatientDetailResponse {
    pub patient: PatientDetail,
    pub chat_history: Vec<TranscriptRecord>,
    pub doctor: Doctor,
}

/// "mario rossi" → "Mario Rossi".
fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `GET /api/doctor/patient/:name`: only for patients holding a slot with this doctor.
pub async fn patient_detail(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(patient_name): Path<String>,
) -> Result<Json<PatientDetailResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doctor = doctor_profile(&conn, &user)?;

    let visits = db::get_booked_slots(&conn, &doctor.name, Some(&patient_name))?;
    if visits.is_empty() {
        return Err(ApiError::NotFound(
            "Patient not found or not assigned to you".into(),
        ));
    }
    let documents = db::get_documents_for_patient(&conn, &patient_name)?
        .into_iter()
        .map(DocumentView::from)
        .collect();
    let chat_history = ctx.transcripts.records(&patient_name)?;

    Ok(Json(PatientDetailResponse {
        patient: PatientDetail {
            name: title_case(&patient_name),
            appointments: visits.into_iter().map(VisitView::from).collect(),
            documents,
        },
        chat_history,
        doctor,
    }))
}

#[derive(Serialize)]
pub struct ProblemResponse {
    pub success: bool,
    pub patient_problem: String,
    pub message: &'static str,
}

/// `POST /api/doctor/generate-problem/:appointment_id`: summarize the
/// patient's transcript into the slot's `patient_problem`.
pub async fn generate_problem(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let patient = {
        let conn = ctx.open_db()?;
        let doctor = doctor_profile(&conn, &user)?;
        let slot = db::get_slot(&conn, appointment_id)?
            .ok_or_else(|| ApiError::NotFound("Appointment not found".into()))?;
        if slot.doctor != doctor.name {
            return Err(ApiError::Forbidden(
                "You can only generate summaries for your own patients".into(),
            ));
        }
        slot.patient.ok_or_else(|| {
            ApiError::BadRequest("This appointment has no patient assigned".into())
        })?
    };

    let agents = ctx.agents.clone();
    let patient_for_llm = patient.clone();
    let problem =
        tokio::task::spawn_blocking(move || agents.patient_problem(&patient_for_llm)).await??;

    let conn = ctx.open_db()?;
    db::set_patient_problem(&conn, appointment_id, &problem)?;
    tracing::info!(appointment_id, patient = %patient, "Patient problem summary stored");

    Ok(Json(ProblemResponse {
        success: true,
        patient_problem: problem,
        message: "Problem summary generated successfully",
    }))
}
