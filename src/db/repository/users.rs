use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, username, email, role, full_name";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(User, String)> {
    let role: String = row.get(3)?;
    Ok((
        User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            role: UserRole::Patient,
            full_name: row.get(4)?,
        },
        role,
    ))
}

fn resolve_role((mut user, role): (User, String)) -> Result<User, DatabaseError> {
    user.role = UserRole::from_str(&role)?;
    Ok(user)
}

pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, email, password_hash, password_salt, role, full_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.username,
            user.email,
            user.credentials.password_hash,
            user.credentials.password_salt,
            user.role.as_str(),
            user.full_name,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation("Username or email already exists".into())
        }
        other => other.into(),
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn username_or_email_taken(
    conn: &Connection,
    username: &str,
    email: &str,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
        params![username, email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Look up an account by username or email, returning its stored credentials.
pub fn find_user_with_credentials(
    conn: &Connection,
    username_or_email: &str,
) -> Result<Option<(User, StoredCredentials)>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS}, password_hash, password_salt
                 FROM users WHERE username = ?1 OR email = ?1"
            ),
            params![username_or_email],
            |row| {
                let user = user_from_row(row)?;
                let credentials = StoredCredentials {
                    password_hash: row.get(5)?,
                    password_salt: row.get(6)?,
                };
                Ok((user, credentials))
            },
        )
        .optional()?;

    row.map(|(user, credentials)| Ok((resolve_role(user)?, credentials)))
        .transpose()
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()?
    .map(resolve_role)
    .transpose()
}
