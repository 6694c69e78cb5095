//! Structured logging for license lifecycle events.
//!
//! Events are emitted inside a `license_event` span carrying the event name
//! and a shortened license reference. Full keys are never logged.

use tracing::{info, info_span, warn, Level};

use crate::config::LoggingConfig;

/// Number of leading key characters kept by [`short_key`].
const SHORT_KEY_LEN: usize = 12;

/// License lifecycle event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseEvent {
    /// A single license was generated and stored
    Issued,
    /// A license was re-issued with a new expiry
    Renewed,
    /// A license was written to a `.key` file
    Exported,
    /// A license passed verification
    Verified,
    /// A license failed verification
    VerificationFailed,
    /// A batch of licenses was generated
    BatchGenerated,
}

impl std::fmt::Display for LicenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseEvent::Issued => "issued",
            LicenseEvent::Renewed => "renewed",
            LicenseEvent::Exported => "exported",
            LicenseEvent::Verified => "verified",
            LicenseEvent::VerificationFailed => "verification_failed",
            LicenseEvent::BatchGenerated => "batch_generated",
        };
        write!(f, "{}", s)
    }
}

/// Shorten a license key for log output.
pub fn short_key(key: &str) -> String {
    match key.char_indices().nth(SHORT_KEY_LEN) {
        Some((idx, _)) => format!("{}…", &key[..idx]),
        None => key.to_string(),
    }
}

/// Log a license lifecycle event.
///
/// # Arguments
///
/// * `event` - The type of license event
/// * `license_ref` - A record id or a key (shortened before logging)
/// * `details` - Optional additional details about the event
pub fn log_license_event(event: LicenseEvent, license_ref: &str, details: Option<&str>) {
    let span = info_span!(
        "license_event",
        event = %event,
        license = %short_key(license_ref),
    );
    let _enter = span.enter();

    match event {
        LicenseEvent::VerificationFailed => {
            if let Some(d) = details {
                warn!(reason = %d, "License event occurred");
            } else {
                warn!("License event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "License event occurred");
            } else {
                info!("License event occurred");
            }
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global fmt subscriber if logging is enabled.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    if !config.enabled {
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(LicenseEvent::Issued.to_string(), "issued");
        assert_eq!(
            LicenseEvent::VerificationFailed.to_string(),
            "verification_failed"
        );
        assert_eq!(LicenseEvent::BatchGenerated.to_string(), "batch_generated");
    }

    #[test]
    fn short_key_truncates_long_keys() {
        assert_eq!(short_key("eyJleHAiOiIyMDI1LTEy"), "eyJleHAiOiIy…");
        assert_eq!(short_key("42"), "42");
        assert_eq!(short_key("exactly12chr"), "exactly12chr");
    }

    #[test]
    fn level_parsing_defaults_to_info() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }

    #[test]
    fn init_logging_twice_does_not_panic() {
        let config = LoggingConfig {
            enabled: true,
            level: "debug".to_string(),
        };
        init_logging(&config);
        init_logging(&config);
        log_license_event(LicenseEvent::Verified, "some-license-key-value", None);
    }
}
