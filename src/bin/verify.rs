// src/bin/verify.rs

use std::process::ExitCode;

use keyforge::config::init_config;
use keyforge::errors::LicenseResult;
use keyforge::hardware::get_hardware_id;
use keyforge::key_file::{find_key_file, persist_verified_key, read_key_file};
use keyforge::logging::{init_logging, log_license_event, LicenseEvent};
use keyforge::token::LicenseSigner;
use keyforge::verify::Verifier;

/// Check the license installed on this machine.
///
/// Looks in `verify.key_dir` for `license.key` (or any `*.key`), verifies it
/// with `signing.secret`, and on success saves it as `license.key` so the
/// next run finds it directly. When no key is present, prints this machine's
/// hardware id to send to the vendor.
async fn run() -> LicenseResult<bool> {
    let config = init_config()?;
    init_logging(&config.logging);

    let key_dir = &config.verify.key_dir;
    let Some(path) = find_key_file(key_dir).await? else {
        println!("No license found.");
        println!();
        println!("Hardware ID for this machine:\n{}", get_hardware_id());
        println!();
        println!("Send this hardware ID to your software provider to get a license.");
        return Ok(false);
    };

    println!("Using key file: {}", path.display());
    let token = read_key_file(&path).await?;

    let signer = LicenseSigner::from_config(&config.signing)?;
    let verifier = Verifier::new(signer, config.verify.grace_days);

    match verifier.verify(&token) {
        Ok(verification) => {
            log_license_event(LicenseEvent::Verified, &token, None);
            println!("{}", verification.summary());

            let saved = persist_verified_key(key_dir, &token).await?;
            println!("Saved verified key to: {}", saved.display());
            Ok(true)
        }
        Err(e) if e.is_license_invalid() => {
            log_license_event(LicenseEvent::VerificationFailed, &token, Some(&e.to_string()));
            println!("INVALID: {e}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
