//! Input rules applied before an account is registered or edited.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must be at least 3 characters")]
    Name,

    #[error("Phone number must be 8 to 15 characters")]
    Phone,

    #[error("Invalid email")]
    Email,

    #[error("Password too short (minimum 6 characters)")]
    Password,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= 3
}

pub fn is_valid_phone(phone: &str) -> bool {
    let len = phone.chars().count();
    !phone.trim().is_empty() && (8..=15).contains(&len)
}

/// Accepts `local@domain.tld` with no whitespace and non-empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.trim().is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 6
}

/// Checks registration input in form order and reports the first problem.
pub fn validate_registration(
    full_name: &str,
    phone: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if !is_valid_name(full_name) {
        return Err(ValidationError::Name);
    }
    if !is_valid_phone(phone) {
        return Err(ValidationError::Phone);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::Email);
    }
    if !is_valid_password(password) {
        return Err(ValidationError::Password);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert!(is_valid_name("Ann"));
        assert!(!is_valid_name("  Al  "));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("0123456789"));
        assert!(!is_valid_phone("1234567"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("        "));
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@farm.example.my"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x..com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_password() {
        assert!(is_valid_password("secret"));
        assert!(!is_valid_password("12345"));
    }

    #[test]
    fn test_validate_registration_reports_first_error() {
        assert_eq!(
            validate_registration("Ann", "0123456789", "bad", "x", "y"),
            Err(ValidationError::Email)
        );
        assert_eq!(
            validate_registration("Ann", "0123456789", "a@x.com", "secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_registration("Ann", "0123456789", "a@x.com", "secret1", "secret1").is_ok());
    }
}
