//! Batch license generation and JSON export.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{error, info};

use crate::errors::{LicenseError, LicenseResult};
use crate::logging::{log_license_event, LicenseEvent};
use crate::token::LicenseSigner;
use crate::validation::ValidationError;

/// One generated license plus the inputs it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub hwid: String,
    /// Product as given by the caller (the token itself carries it upper-cased)
    pub product: String,
    pub expiry: NaiveDate,
    pub users: u32,
    pub license: String,
}

/// Generate one license per hardware id, all expiring `days_valid` days
/// after `today`. Output order follows `hwids`.
pub fn batch_generate_licenses<S: AsRef<str>>(
    signer: &LicenseSigner,
    product: &str,
    days_valid: u32,
    max_users: u32,
    hwids: &[S],
    today: NaiveDate,
) -> LicenseResult<Vec<BatchRecord>> {
    let expiry = today
        .checked_add_signed(Duration::days(i64::from(days_valid)))
        .ok_or_else(|| {
            LicenseError::ValidationError(ValidationError::new(
                "days_valid",
                format!("{today} + {days_valid} days is out of range"),
            ))
        })?;

    let records = hwids
        .iter()
        .map(|hwid| {
            let hwid = hwid.as_ref();
            let license = signer.generate_license(product, expiry, max_users, hwid)?;
            Ok(BatchRecord {
                hwid: hwid.to_string(),
                product: product.to_string(),
                expiry,
                users: max_users,
                license,
            })
        })
        .collect::<LicenseResult<Vec<_>>>()?;

    log_license_event(
        LicenseEvent::BatchGenerated,
        product,
        Some(&format!("{} license(s), expiring {expiry}", records.len())),
    );

    Ok(records)
}

fn to_pretty_json(records: &[BatchRecord]) -> LicenseResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer).map_err(|e| {
        error!("Failed to serialize batch: {e}");
        LicenseError::SerializationError(format!("batch: {e}"))
    })?;
    Ok(out)
}

/// Write records as a pretty-printed JSON array. Returns the record count.
pub async fn save_licenses_to_file(
    records: &[BatchRecord],
    path: impl AsRef<Path>,
) -> LicenseResult<usize> {
    let path = path.as_ref();
    let json = to_pretty_json(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, json).await?;

    info!("Saved {} license(s) to '{}'", records.len(), path.display());
    Ok(records.len())
}

/// Read records written by [`save_licenses_to_file`].
pub async fn load_licenses_from_file(path: impl AsRef<Path>) -> LicenseResult<Vec<BatchRecord>> {
    let data = fs::read(path.as_ref()).await?;
    serde_json::from_slice(&data)
        .map_err(|e| LicenseError::SerializationError(format!("batch file: {e}")))
}
