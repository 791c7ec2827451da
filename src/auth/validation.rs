use std::sync::LazyLock;

use regex::Regex;

use super::AuthError;

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Check password strength. Returns the first unmet rule as the error message.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let rules: [(bool, &str); 5] = [
        (
            password.chars().count() >= 8,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one number",
        ),
        (
            password.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            "Password must contain at least one special character",
        ),
    ];

    match rules.iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(AuthError::Validation((*message).into())),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl Registration {
    /// Trim fields and apply every registration rule.
    pub fn validated(self) -> Result<Self, AuthError> {
        let reg = Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            full_name: self.full_name.trim().to_string(),
        };

        if reg.username.chars().count() < 3 {
            return Err(AuthError::Validation(
                "Username must be at least 3 characters long".into(),
            ));
        }
        if !validate_email(&reg.email) {
            return Err(AuthError::Validation("Invalid email format".into()));
        }
        validate_password(&reg.password)?;
        if reg.full_name.chars().count() < 2 {
            return Err(AuthError::Validation(
                "Full name must be at least 2 characters long".into(),
            ));
        }
        Ok(reg)
    }
}
