//! Offline license verification.
//!
//! Checks run in a fixed order: token format, signature, payload, expiry
//! (with grace period), then hardware lock. The first failing check decides
//! the error.

use chrono::{Local, NaiveDate};

use crate::errors::{LicenseError, LicenseResult};
use crate::hardware::get_hardware_id;
use crate::token::{decode_token, parse_payload, LicensePayload, LicenseSigner};

/// Default number of days a license keeps working after its expiry date.
pub const DEFAULT_GRACE_DAYS: u32 = 7;

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// Not expired yet. `days_left` is 0 on the expiry day itself.
    Valid { days_left: i64 },
    /// Past expiry but still inside the grace period.
    Grace { days_remaining: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub payload: LicensePayload,
    pub status: LicenseStatus,
}

impl Verification {
    pub fn is_grace(&self) -> bool {
        matches!(self.status, LicenseStatus::Grace { .. })
    }

    /// One-line human-readable status.
    pub fn summary(&self) -> String {
        match self.status {
            LicenseStatus::Valid { days_left } => format!(
                "License valid for {} until {} ({} day(s) left, max {} users)",
                self.payload.product, self.payload.exp, days_left, self.payload.users
            ),
            LicenseStatus::Grace { days_remaining } => format!(
                "License for {} expired on {}; grace period active, {} day(s) remaining",
                self.payload.product, self.payload.exp, days_remaining
            ),
        }
    }
}

/// Verifies tokens against this machine and the local date.
#[derive(Debug, Clone)]
pub struct Verifier {
    signer: LicenseSigner,
    grace_days: u32,
}

impl Verifier {
    pub fn new(signer: LicenseSigner, grace_days: u32) -> Self {
        Self { signer, grace_days }
    }

    pub fn with_default_grace(signer: LicenseSigner) -> Self {
        Self::new(signer, DEFAULT_GRACE_DAYS)
    }

    pub fn grace_days(&self) -> u32 {
        self.grace_days
    }

    /// Verify a token for the current machine, today.
    pub fn verify(&self, token: &str) -> LicenseResult<Verification> {
        let today = Local::now().date_naive();
        self.verify_at(token, today, &get_hardware_id())
    }

    /// Verify a token as of `today` on a machine with fingerprint `current_hwid`.
    pub fn verify_at(
        &self,
        token: &str,
        today: NaiveDate,
        current_hwid: &str,
    ) -> LicenseResult<Verification> {
        let (payload_bytes, signature) = decode_token(token)?;
        self.signer.verify_signature(&payload_bytes, &signature)?;
        let payload = parse_payload(&payload_bytes)?;

        let days_left = (payload.exp - today).num_days();
        let status = if days_left < 0 {
            let grace_remaining = i64::from(self.grace_days) + days_left;
            if grace_remaining < 0 {
                return Err(LicenseError::LicenseExpired {
                    expired_on: payload.exp,
                    grace_days: self.grace_days,
                });
            }
            LicenseStatus::Grace {
                days_remaining: grace_remaining,
            }
        } else {
            LicenseStatus::Valid { days_left }
        };

        // Applies inside the grace period too.
        if payload.hwid != current_hwid {
            return Err(LicenseError::HardwareMismatch {
                expected: payload.hwid,
            });
        }

        Ok(Verification { payload, status })
    }
}
