//! Configuration system for keyforge.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `keyforge.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `KEYFORGE_SECRET` - HMAC secret used to sign and verify license keys
//! - `KEYFORGE_GRACE_DAYS` - Days a license keeps working after expiry
//! - `KEYFORGE_KEY_DIR` - Directory searched for `.key` files
//! - `KEYFORGE_DATABASE_URL` - SQLite URL of the issuance ledger
//! - `KEYFORGE_OUTPUT_DIR` - Directory `.key` files are exported to
//! - `KEYFORGE_LOGGING_ENABLED` - Enable logging output
//! - `KEYFORGE_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};

/// Global configuration singleton.
static CONFIG: OnceLock<KeyforgeConfig> = OnceLock::new();

/// Upper bound for `verify.grace_days`.
pub const MAX_GRACE_DAYS: u32 = 365;

/// Upper bound for `batch.days_valid` (100 years).
pub const MAX_DAYS_VALID: u32 = 36_500;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyforgeConfig {
    /// Signing configuration
    pub signing: SigningConfig,
    /// Verification configuration
    pub verify: VerifyConfig,
    /// Issuance ledger configuration
    pub database: DatabaseConfig,
    /// `.key` export configuration
    pub export: ExportConfig,
    /// Batch generation job
    pub batch: BatchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Signing configuration.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC secret. Each vendor should use their own.
    pub secret: String,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &if self.secret.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Verification configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Days a license keeps working after its expiry date
    pub grace_days: u32,
    /// Directory searched for `license.key` / `*.key`
    pub key_dir: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            grace_days: crate::verify::DEFAULT_GRACE_DAYS,
            key_dir: ".".to_string(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub sqlite_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_url: "sqlite://licenses.db".to_string(),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported `.key` files are written to
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

/// Batch generation configuration, consumed by `keyforge_batch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Product name for every generated key
    pub product: String,
    /// Client name used when recording the batch in the ledger
    pub client: String,
    /// Days until the generated keys expire
    pub days_valid: u32,
    /// Maximum allowed users per key
    pub max_users: u32,
    /// Hardware ids to generate keys for
    pub hwids: Vec<String>,
    /// JSON output path
    pub output: String,
    /// Also store the generated keys in the ledger
    pub record: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            product: String::new(),
            client: String::new(),
            days_valid: 30,
            max_users: 5,
            hwids: Vec::new(),
            output: "licenses.json".to_string(),
            record: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

impl KeyforgeConfig {
    /// Load configuration from file and environment, bypassing the cache.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `keyforge.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> LicenseResult<Self> {
        let builder = Config::builder()
            .set_default("signing.secret", "")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("verify.grace_days", i64::from(crate::verify::DEFAULT_GRACE_DAYS))
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("verify.key_dir", ".")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("database.sqlite_url", "sqlite://licenses.db")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("export.output_dir", ".")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("batch.days_valid", 30)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("batch.max_users", 5)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("batch.output", "licenses.json")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("batch.record", false)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("logging.enabled", false)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("logging.level", "info")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            // Load from keyforge.toml (optional)
            .add_source(config::File::with_name("keyforge").required(false))
            // Override with environment variables
            .set_override_option("signing.secret", env::var("KEYFORGE_SECRET").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option(
                "verify.grace_days",
                env::var("KEYFORGE_GRACE_DAYS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("verify.key_dir", env::var("KEYFORGE_KEY_DIR").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option(
                "database.sqlite_url",
                env::var("KEYFORGE_DATABASE_URL").ok(),
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("export.output_dir", env::var("KEYFORGE_OUTPUT_DIR").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option(
                "logging.enabled",
                env::var("KEYFORGE_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("logging.level", env::var("KEYFORGE_LOG_LEVEL").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?;

        let settings = builder
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| LicenseError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    ///
    /// An empty signing secret is not an error here: only operations that
    /// sign or verify need it, and `LicenseSigner::from_config` reports it.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.verify.grace_days > MAX_GRACE_DAYS {
            return Err(LicenseError::ConfigError(format!(
                "verify.grace_days must be at most {MAX_GRACE_DAYS}, got {}",
                self.verify.grace_days
            )));
        }

        if !self.database.sqlite_url.starts_with("sqlite:") {
            return Err(LicenseError::ConfigError(format!(
                "database.sqlite_url must start with 'sqlite:', got '{}'",
                self.database.sqlite_url
            )));
        }

        if self.batch.days_valid == 0 {
            return Err(LicenseError::ConfigError(
                "batch.days_valid must be greater than 0".to_string(),
            ));
        }

        if self.batch.days_valid > MAX_DAYS_VALID {
            return Err(LicenseError::ConfigError(format!(
                "batch.days_valid must be at most {MAX_DAYS_VALID}, got {}",
                self.batch.days_valid
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> LicenseResult<&'static KeyforgeConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = KeyforgeConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is fine.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| LicenseError::ConfigError("configuration was not initialized".to_string()))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> LicenseResult<&'static KeyforgeConfig> {
    get_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = KeyforgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.verify.grace_days, 7);
        assert_eq!(config.batch.output, "licenses.json");
        assert_eq!(config.database.sqlite_url, "sqlite://licenses.db");
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = KeyforgeConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(LicenseError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_excessive_grace() {
        let mut config = KeyforgeConfig::default();
        config.verify.grace_days = MAX_GRACE_DAYS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_days_valid_out_of_range() {
        let mut config = KeyforgeConfig::default();
        config.batch.days_valid = 0;
        assert!(matches!(
            config.validate(),
            Err(LicenseError::ConfigError(_))
        ));

        config.batch.days_valid = MAX_DAYS_VALID;
        assert!(config.validate().is_ok());

        config.batch.days_valid = MAX_DAYS_VALID + 1;
        assert!(matches!(
            config.validate(),
            Err(LicenseError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_non_sqlite_url() {
        let mut config = KeyforgeConfig::default();
        config.database.sqlite_url = "postgres://localhost/licenses".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_masks_secret() {
        let signing = SigningConfig {
            secret: "hunter2".to_string(),
        };
        let debug = format!("{:?}", signing);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
