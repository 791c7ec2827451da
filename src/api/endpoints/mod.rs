//! API endpoint handlers, one module per feature area.

pub mod appointments;
pub mod auth;
pub mod doctor;
pub mod documents;
pub mod health;
pub mod history;
