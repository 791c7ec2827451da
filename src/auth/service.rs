use rusqlite::Connection;

use super::{hash_password, verify_password, AuthError, Registration};
use crate::db::{self, DatabaseError};
use crate::models::{NewUser, User, UserRole};

/// Create a patient account. Doctor and admin accounts come from seeding.
pub fn register(conn: &Connection, registration: Registration) -> Result<User, AuthError> {
    let reg = registration.validated()?;

    if db::username_or_email_taken(conn, &reg.username, &reg.email)? {
        return Err(AuthError::AlreadyExists);
    }

    let new_user = NewUser {
        username: reg.username,
        email: reg.email,
        full_name: reg.full_name,
        role: UserRole::Patient,
        credentials: hash_password(&reg.password),
    };
    let id = db::insert_user(conn, &new_user).map_err(|e| match e {
        DatabaseError::ConstraintViolation(_) => AuthError::AlreadyExists,
        other => other.into(),
    })?;

    tracing::info!(user_id = id, username = %new_user.username, "User registered");
    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        role: new_user.role,
        full_name: new_user.full_name,
    })
}

/// Verify a username-or-email and password pair.
pub fn authenticate(conn: &Connection, login: &str, password: &str) -> Result<User, AuthError> {
    let Some((user, credentials)) = db::find_user_with_credentials(conn, login.trim())? else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password, &credentials)? {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(AuthError::InvalidCredentials);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn registration() -> Registration {
        Registration {
            username: "rossi".into(),
            email: "mario.rossi@email.com".into(),
            password: "Password123!".into(),
            full_name: "Mario Rossi".into(),
        }
    }

    #[test]
    fn register_then_login_by_name_or_email() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, registration()).unwrap();
        assert_eq!(user.role, UserRole::Patient);

        assert_eq!(authenticate(&conn, "rossi", "Password123!").unwrap().id, user.id);
        assert_eq!(
            authenticate(&conn, "mario.rossi@email.com", "Password123!").unwrap().id,
            user.id
        );
        assert!(matches!(
            authenticate(&conn, "rossi", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&conn, "nobody", "Password123!"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let conn = open_memory_database().unwrap();
        register(&conn, registration()).unwrap();
        assert!(matches!(
            register(&conn, registration()),
            Err(AuthError::AlreadyExists)
        ));
    }

    #[test]
    fn weak_password_rejected_before_hashing() {
        let conn = open_memory_database().unwrap();
        let mut reg = registration();
        reg.password = "weak".into();
        assert!(matches!(register(&conn, reg), Err(AuthError::Validation(_))));
    }
}
