//! Account registration, password verification and bearer sessions.

pub mod password;
pub mod service;
pub mod sessions;
pub mod validation;

pub use password::*;
pub use service::*;
pub use sessions::*;
pub use validation::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Username or email already exists")]
    AlreadyExists,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Stored credentials are corrupted")]
    CorruptedCredentials,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
