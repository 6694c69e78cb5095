//! License issuing workflow: generate, record, renew and export.
//!
//! [`Issuer`] ties the signer to the ledger. Each operation validates its
//! input first, so nothing is signed or stored for a malformed request.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::BatchRecord;
use crate::errors::{LicenseError, LicenseResult};
use crate::key_file::{default_key_file_name, write_key_file};
use crate::logging::{log_license_event, LicenseEvent};
use crate::store::{LicenseRecord, LicenseStore, NewLicense, SortOrder};
use crate::token::LicenseSigner;
use crate::validation::{
    validate_expiry_date, validate_hardware_id, validate_max_users, validate_non_empty,
};

/// Raw issue-form input. All fields are required.
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    pub client: String,
    pub product: String,
    /// `YYYY-MM-DD`
    pub expiry: String,
    pub max_users: String,
    pub hwid: String,
}

#[derive(Debug, Clone)]
pub struct Issuer {
    signer: LicenseSigner,
    store: LicenseStore,
}

impl Issuer {
    pub fn new(signer: LicenseSigner, store: LicenseStore) -> Self {
        Self { signer, store }
    }

    pub fn store(&self) -> &LicenseStore {
        &self.store
    }

    /// Generate a license from form input and record it.
    pub async fn issue(&self, request: IssueRequest) -> LicenseResult<LicenseRecord> {
        validate_non_empty(&request.client, "client")?;
        validate_non_empty(&request.product, "product")?;
        let expiry = validate_expiry_date(&request.expiry, "expiry")?;
        let max_users = validate_max_users(&request.max_users, "max_users")?;
        validate_hardware_id(&request.hwid, "hwid")?;

        let client = request.client.trim().to_string();
        let product = request.product.trim().to_string();
        let hwid = request.hwid.trim().to_string();

        let license_key = self
            .signer
            .generate_license(&product, expiry, max_users, &hwid)?;

        let record = self
            .store
            .save_license(NewLicense {
                client_name: client,
                product,
                license_key,
                expiry_date: expiry,
                max_users,
                hwid,
            })
            .await?;

        log_license_event(
            LicenseEvent::Issued,
            &record.id.to_string(),
            Some(&format!(
                "client={} product={} expiry={}",
                record.client_name, record.product, record.expiry_date
            )),
        );

        Ok(record)
    }

    async fn get_existing(&self, id: i64) -> LicenseResult<LicenseRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LicenseError::NotFound(format!("license {id}")))
    }

    /// Re-issue license `id` with a new expiry date.
    ///
    /// The new key is stored as a new row; the old row is kept as history.
    pub async fn renew(&self, id: i64, new_expiry: &str) -> LicenseResult<LicenseRecord> {
        let expiry = validate_expiry_date(new_expiry, "expiry")?;
        let existing = self.get_existing(id).await?;
        // Rows from older ledgers may have NULL-filled columns.
        validate_non_empty(&existing.product, "product")?;
        validate_hardware_id(&existing.hwid, "hwid")?;

        let license_key = self.signer.generate_license(
            &existing.product,
            expiry,
            existing.max_users,
            &existing.hwid,
        )?;

        let record = self
            .store
            .save_license(NewLicense {
                client_name: existing.client_name.clone(),
                product: existing.product.clone(),
                license_key,
                expiry_date: expiry,
                max_users: existing.max_users,
                hwid: existing.hwid.clone(),
            })
            .await?;

        log_license_event(
            LicenseEvent::Renewed,
            &record.id.to_string(),
            Some(&format!(
                "renewed from {} (expiry {} -> {})",
                existing.id, existing.expiry_date, record.expiry_date
            )),
        );

        Ok(record)
    }

    /// Write license `id` to `dir` under its default `.key` file name.
    pub async fn export(&self, id: i64, dir: impl AsRef<Path>) -> LicenseResult<PathBuf> {
        let record = self.get_existing(id).await?;
        let path = dir
            .as_ref()
            .join(default_key_file_name(&record.client_name, &record.product));

        write_key_file(&path, &record.license_key).await?;

        log_license_event(
            LicenseEvent::Exported,
            &record.id.to_string(),
            Some(&path.display().to_string()),
        );

        Ok(path)
    }

    pub async fn list(&self, order: SortOrder) -> LicenseResult<Vec<LicenseRecord>> {
        self.store.fetch_all(order).await
    }

    pub async fn search(&self, term: &str) -> LicenseResult<Vec<LicenseRecord>> {
        self.store.search(term).await
    }

    /// Store batch-generated licenses under `client`. Returns the new rows.
    pub async fn record_batch(
        &self,
        client: &str,
        records: &[BatchRecord],
    ) -> LicenseResult<Vec<LicenseRecord>> {
        validate_non_empty(client, "client")?;

        let client = client.trim();
        let rows: Vec<NewLicense> = records
            .iter()
            .map(|record| NewLicense {
                client_name: client.to_string(),
                product: record.product.clone(),
                license_key: record.license.clone(),
                expiry_date: record.expiry,
                max_users: record.users,
                hwid: record.hwid.clone(),
            })
            .collect();

        let saved = self.store.save_licenses(&rows).await?;

        info!("Recorded {} batch license(s) for {client}", saved.len());
        Ok(saved)
    }
}
