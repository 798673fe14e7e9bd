use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;
use crate::constants::limits::{MAX_USERNAME_LEN, MIN_PASSWORD_LEN};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("Invalid regex")
    })
}

/// Trimmed username; letters, digits and `@ . + - _` only.
pub fn validate_username(username: &str) -> Result<String, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }

    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::validation(format!(
            "Username must be {MAX_USERNAME_LEN} characters or less"
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, and @/./+/-/_ characters",
        ));
    }

    Ok(trimmed.to_string())
}

/// Trimmed, lowercased email.
pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    if !email_regex().is_match(&normalized) {
        return Err(ApiError::validation("Enter a valid email address"));
    }

    Ok(normalized)
}

pub fn validate_password(password: &str, username: &str, email: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("Password cannot be entirely numeric"));
    }

    let lowered = password.to_lowercase();
    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    if (!username.is_empty() && lowered == username.to_lowercase())
        || (!local_part.is_empty() && lowered == local_part)
    {
        return Err(ApiError::validation(
            "Password is too similar to the username or email",
        ));
    }

    Ok(())
}

pub fn validate_qr_code(qr_code: &str) -> Result<&str, ApiError> {
    let trimmed = qr_code.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("qr_code is required"));
    }
    Ok(trimmed)
}

pub fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  ana.maria ").unwrap(), "ana.maria");
        assert!(validate_username("user+tag@x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" Ana@Example.COM ").unwrap(),
            "ana@example.com"
        );
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("s3cure-pass", "ana", "ana@example.com").is_ok());
        assert!(validate_password("short1", "ana", "ana@example.com").is_err());
        assert!(validate_password("12345678", "ana", "ana@example.com").is_err());
        assert!(validate_password("AnaLopez99", "analopez99", "x@example.com").is_err());
        assert!(validate_password("traveler88", "ana", "traveler88@example.com").is_err());
    }

    #[test]
    fn test_validate_qr_code() {
        assert_eq!(validate_qr_code("  QR-001 ").unwrap(), "QR-001");
        assert!(validate_qr_code("   ").is_err());
    }
}
