// src/bin/batch.rs

use chrono::Local;
use tracing::info;

use keyforge::batch::{batch_generate_licenses, save_licenses_to_file};
use keyforge::config::init_config;
use keyforge::errors::{LicenseError, LicenseResult};
use keyforge::logging::init_logging;
use keyforge::token::LicenseSigner;

/// Batch key generator.
///
/// Everything comes from the `[batch]` section of `keyforge.toml` (or the
/// environment); there are no command-line flags:
///
/// ```toml
/// [signing]
/// secret = "change-me"
///
/// [batch]
/// product = "CHRONOTIME"
/// client = "Acme Corp"
/// days_valid = 365
/// max_users = 10
/// hwids = ["72318E764B4D4508", "HWID_002"]
/// output = "licenses.json"
/// record = true
/// ```
#[tokio::main]
async fn main() -> LicenseResult<()> {
    let config = init_config()?;
    init_logging(&config.logging);

    let batch = &config.batch;
    if batch.product.trim().is_empty() {
        return Err(LicenseError::ConfigError(
            "batch.product must be set".to_string(),
        ));
    }

    let signer = LicenseSigner::from_config(&config.signing)?;
    let today = Local::now().date_naive();

    let records = batch_generate_licenses(
        &signer,
        batch.product.trim(),
        batch.days_valid,
        batch.max_users,
        batch.hwids.as_slice(),
        today,
    )?;

    let written = save_licenses_to_file(&records, &batch.output).await?;
    println!("Saved {written} license(s) to '{}'", batch.output);

    if batch.record {
        record(config, &signer, &records).await?;
    }

    info!("Batch complete");
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn record(
    config: &keyforge::config::KeyforgeConfig,
    signer: &LicenseSigner,
    records: &[keyforge::batch::BatchRecord],
) -> LicenseResult<()> {
    use keyforge::issuer::Issuer;
    use keyforge::store::LicenseStore;

    let store = LicenseStore::from_config(&config.database).await?;
    let issuer = Issuer::new(signer.clone(), store);
    let saved = issuer.record_batch(&config.batch.client, records).await?;
    println!(
        "Recorded {} license(s) in {}",
        saved.len(),
        config.database.sqlite_url
    );
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn record(
    _config: &keyforge::config::KeyforgeConfig,
    _signer: &LicenseSigner,
    _records: &[keyforge::batch::BatchRecord],
) -> LicenseResult<()> {
    Err(LicenseError::ConfigError(
        "batch.record requires the 'sqlite' feature".to_string(),
    ))
}
