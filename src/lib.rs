//! keyforge - offline, hardware-locked license keys
//!
//! Keys are HMAC-signed tokens that carry their own claims (product, expiry,
//! user limit, hardware id), so they can be verified without a server.
//!
//! # Features
//!
//! - `sqlite` - SQLite issuance ledger ([`store`]) and the [`issuer`]
//!   workflow built on it. Enabled by default.
//!
//! # Example
//!
//! ```toml
//! # Generator with ledger (default)
//! keyforge = { path = "../keyforge" }
//!
//! # Verification only, no database
//! keyforge = { path = "../keyforge", default-features = false }
//! ```

// Core modules (always available)
pub mod batch;
pub mod config;
pub mod errors;
pub mod hardware;
pub mod key_file;
pub mod logging;
pub mod token;
pub mod validation;
pub mod verify;

// Ledger modules (requires "sqlite" feature)
#[cfg(feature = "sqlite")]
pub mod issuer;
#[cfg(feature = "sqlite")]
pub mod store;

pub use errors::{LicenseError, LicenseResult};
pub use token::{LicensePayload, LicenseSigner};
pub use verify::{LicenseStatus, Verification, Verifier};
