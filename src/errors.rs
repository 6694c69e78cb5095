//! Error types shared across keyforge.

use chrono::NaiveDate;
use thiserror::Error;

use crate::validation::ValidationError;

pub type LicenseResult<T> = Result<T, LicenseError>;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The token could not be decoded or its payload could not be parsed.
    #[error("Invalid token format: {0}")]
    InvalidToken(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("License expired on {expired_on} and the {grace_days}-day grace period has ended")]
    LicenseExpired {
        expired_on: NaiveDate,
        grace_days: u32,
    },

    #[error("Hardware mismatch (expected {expected})")]
    HardwareMismatch { expected: String },

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LicenseError {
    /// Returns true if this error is a verdict on the license itself rather
    /// than an operational failure (I/O, database, configuration).
    pub fn is_license_invalid(&self) -> bool {
        matches!(
            self,
            LicenseError::InvalidToken(_)
                | LicenseError::InvalidSignature
                | LicenseError::LicenseExpired { .. }
                | LicenseError::HardwareMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_errors_are_license_invalid() {
        assert!(LicenseError::InvalidSignature.is_license_invalid());
        assert!(LicenseError::InvalidToken("bad".into()).is_license_invalid());
        assert!(LicenseError::HardwareMismatch {
            expected: "ABCD".into()
        }
        .is_license_invalid());
        assert!(LicenseError::LicenseExpired {
            expired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            grace_days: 7,
        }
        .is_license_invalid());

        assert!(!LicenseError::ConfigError("x".into()).is_license_invalid());
        assert!(!LicenseError::DatabaseError("x".into()).is_license_invalid());
    }

    #[test]
    fn hardware_mismatch_display_names_expected_id() {
        let err = LicenseError::HardwareMismatch {
            expected: "72318E764B4D4508".into(),
        };
        assert_eq!(
            err.to_string(),
            "Hardware mismatch (expected 72318E764B4D4508)"
        );
    }
}
