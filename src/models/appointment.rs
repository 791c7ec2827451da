use serde::{Deserialize, Serialize};

/// Layout of `appointments.time_slot`, shared with the transcript timestamp.
pub const SLOT_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// An unbooked slot joined with the doctor's specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    pub id: i64,
    pub doctor: String,
    pub time_slot: String,
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub id: i64,
    pub time_slot: String,
}

/// A booked slot as seen by the patient who holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub doctor: String,
    pub specialization: String,
    pub time_slot: String,
}

/// A slot row as stored, booked or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub id: i64,
    pub doctor: String,
    pub time_slot: String,
    pub patient: Option<String>,
    pub patient_problem: Option<String>,
}

impl AppointmentSlot {
    pub fn is_open(&self) -> bool {
        self.patient.is_none()
    }
}
