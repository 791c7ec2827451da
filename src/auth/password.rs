use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::AuthError;
use crate::models::StoredCredentials;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut hash);
    hash
}

/// Hash a password with a fresh salt (PBKDF2-HMAC-SHA256).
pub fn hash_password(password: &str) -> StoredCredentials {
    let salt = generate_salt();
    let hash = derive(password, &salt);
    StoredCredentials {
        password_hash: STANDARD.encode(hash),
        password_salt: STANDARD.encode(salt),
    }
}

/// Constant-time check of `password` against stored credentials.
pub fn verify_password(password: &str, stored: &StoredCredentials) -> Result<bool, AuthError> {
    let salt = STANDARD
        .decode(&stored.password_salt)
        .map_err(|_| AuthError::CorruptedCredentials)?;
    let expected = STANDARD
        .decode(&stored.password_hash)
        .map_err(|_| AuthError::CorruptedCredentials)?;

    let actual = derive(password, &salt);
    Ok(actual.ct_eq(expected.as_slice()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("Password123!");
        assert!(verify_password("Password123!", &stored).unwrap());
        assert!(!verify_password("Password123?", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Password123!");
        let b = hash_password("Password123!");
        assert_ne!(a.password_salt, b.password_salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn corrupted_salt_is_reported() {
        let stored = StoredCredentials {
            password_hash: "AAAA".into(),
            password_salt: "not base64!".into(),
        };
        assert!(matches!(
            verify_password("x", &stored),
            Err(AuthError::CorruptedCredentials)
        ));
    }
}
