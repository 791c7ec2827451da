use serde::{Deserialize, Serialize};

use super::enums::UserRole;

/// A registered account. Credentials are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
}

/// Stored PBKDF2 material for an account, base64 encoded.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub credentials: StoredCredentials,
}
