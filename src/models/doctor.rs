use serde::{Deserialize, Serialize};

use super::appointment::SlotSummary;

/// Roster entry. `name` is the primary key and is what appointments reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    pub specialization: String,
    pub user_id: Option<i64>,
}

/// A doctor together with the slots still open for booking.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorAvailability {
    pub name: String,
    pub specialization: String,
    pub available_slots: Vec<SlotSummary>,
}
