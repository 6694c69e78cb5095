//! Input validation for license issue requests.
//!
//! These checks sit in front of key generation so a malformed expiry date or
//! user count is rejected before anything is signed or stored.

use std::fmt;

use chrono::NaiveDate;

/// Validation error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate that a field is not empty after trimming whitespace.
pub fn validate_non_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field_name, "cannot be empty"))
    } else {
        Ok(())
    }
}

/// Validate an expiry date in `YYYY-MM-DD` format and return it parsed.
///
/// # Example
/// ```
/// use keyforge::validation::validate_expiry_date;
///
/// assert!(validate_expiry_date("2025-12-01", "expiry").is_ok());
/// assert!(validate_expiry_date("2025-02-30", "expiry").is_err());
/// assert!(validate_expiry_date("01/12/2025", "expiry").is_err());
/// ```
pub fn validate_expiry_date(value: &str, field_name: &str) -> ValidationResult<NaiveDate> {
    let date_regex = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    let value = value.trim();

    if !date_regex.is_match(value) {
        return Err(ValidationError::new(
            field_name,
            "invalid date format (expected: YYYY-MM-DD)",
        ));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field_name, format!("'{value}' is not a calendar date")))
}

/// Validate a maximum user count: numeric and at least 1.
pub fn validate_max_users(value: &str, field_name: &str) -> ValidationResult<u32> {
    let users: u32 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field_name, "user count must be numeric"))?;

    if users == 0 {
        return Err(ValidationError::new(field_name, "must be at least 1"));
    }

    Ok(users)
}

/// Validate a hardware id.
///
/// Accepts 1 to 64 characters of `[A-Za-z0-9_-]`, which covers both machine
/// fingerprints (`72318E764B4D4508`) and operator-assigned ids (`HWID_001`).
pub fn validate_hardware_id(value: &str, field_name: &str) -> ValidationResult<()> {
    let hwid_regex = regex::Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();

    if hwid_regex.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field_name,
            "invalid hardware id (expected 1-64 characters of A-Z, a-z, 0-9, '_' or '-')",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_rejects_whitespace() {
        assert!(validate_non_empty("Acme", "client").is_ok());
        let err = validate_non_empty("   ", "client").unwrap_err();
        assert_eq!(err.field, "client");
    }

    #[test]
    fn expiry_date_parses_valid_dates() {
        let date = validate_expiry_date("2026-01-31", "expiry").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());

        // Surrounding whitespace from form input is tolerated
        assert!(validate_expiry_date(" 2026-01-31 ", "expiry").is_ok());
    }

    #[test]
    fn expiry_date_rejects_bad_input() {
        assert!(validate_expiry_date("2026-1-31", "expiry").is_err());
        assert!(validate_expiry_date("2026-13-01", "expiry").is_err());
        assert!(validate_expiry_date("2023-02-29", "expiry").is_err());
        assert!(validate_expiry_date("tomorrow", "expiry").is_err());
        assert!(validate_expiry_date("", "expiry").is_err());
    }

    #[test]
    fn max_users_accepts_positive_numbers() {
        assert_eq!(validate_max_users("5", "max_users").unwrap(), 5);
        assert_eq!(validate_max_users(" 12 ", "max_users").unwrap(), 12);
    }

    #[test]
    fn max_users_rejects_zero_and_text() {
        assert!(validate_max_users("0", "max_users").is_err());
        assert!(validate_max_users("-3", "max_users").is_err());
        let err = validate_max_users("five", "max_users").unwrap_err();
        assert!(err.message.contains("numeric"));
    }

    #[test]
    fn hardware_id_accepts_fingerprints_and_custom_ids() {
        assert!(validate_hardware_id("72318E764B4D4508", "hwid").is_ok());
        assert!(validate_hardware_id("HWID_001", "hwid").is_ok());
        assert!(validate_hardware_id("lab-bench-7", "hwid").is_ok());
    }

    #[test]
    fn hardware_id_rejects_bad_input() {
        assert!(validate_hardware_id("", "hwid").is_err());
        assert!(validate_hardware_id("has space", "hwid").is_err());
        assert!(validate_hardware_id(&"A".repeat(65), "hwid").is_err());
    }
}
