//! Common validation utilities.

use validator::ValidationError;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Usernames are 3-64 characters of ASCII letters, digits, `_`, `-` or `.`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!(
                "Username must be between {} and {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        let mut err = ValidationError::new("username_charset");
        err.message =
            Some("Username may only contain letters, digits, '_', '-' and '.'".into());
        return Err(err);
    }

    Ok(())
}

/// Passwords must be at least 8 characters and not only whitespace.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH || password.trim().is_empty() {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}
