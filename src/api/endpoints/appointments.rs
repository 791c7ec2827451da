//! Slot browsing and booking for patients.
//!
//! - `GET /api/doctors`: every doctor with the slots still open
//! - `GET /api/my-reservations`
//! - `POST /api/book-slot/:id`
//! - `POST /api/cancel-slot/:id`
//!
//! Book and cancel always act for the authenticated user.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::db;
use crate::models::{DoctorAvailability, Reservation};

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<DoctorAvailability>,
}

/// `GET /api/doctors`
pub async fn doctors(State(ctx): State<ApiContext>) -> Result<Json<DoctorsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let doctors = db::get_doctors_with_availability(&conn)?;
    Ok(Json(DoctorsResponse { doctors }))
}

#[derive(Serialize)]
pub struct ReservationsResponse {
    pub reservations: Vec<Reservation>,
    pub user_name: String,
}

/// `GET /api/my-reservations`
pub async fn my_reservations(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ReservationsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let reservations = db::get_reservations(&conn, &user.full_name)?;
    Ok(Json(ReservationsResponse {
        reservations,
        user_name: user.full_name,
    }))
}

#[derive(Serialize)]
pub struct SlotActionResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /api/book-slot/:id`
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(slot_id): Path<i64>,
) -> Result<Json<SlotActionResponse>, ApiError> {
    let conn = ctx.open_db()?;
    db::book_slot(&conn, slot_id, &user.full_name)?;
    Ok(Json(SlotActionResponse {
        success: true,
        message: "Appointment booked successfully".into(),
    }))
}

/// `POST /api/cancel-slot/:id`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(slot_id): Path<i64>,
) -> Result<Json<SlotActionResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let slot = db::cancel_slot(&conn, slot_id, &user.full_name)?;
    Ok(Json(SlotActionResponse {
        success: true,
        message: format!(
            "Appointment with {} for {} cancelled successfully",
            slot.doctor, slot.time_slot
        ),
    }))
}
