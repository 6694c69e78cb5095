//! License token encoding and signing.
//!
//! A token carries its own payload, so it can be checked fully offline:
//!
//! ```text
//! base64url( payload_json || "." || HMAC-SHA256(secret, payload_json)[..8] )
//! ```
//!
//! `payload_json` is compact JSON with sorted keys (`exp`, `hwid`, `product`,
//! `users`). The trailing `=` padding is stripped from the encoded form.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use keyforge::token::{inspect_token, LicenseSigner};
//!
//! let signer = LicenseSigner::new(b"my-secret").unwrap();
//! let expiry = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
//! let token = signer.generate_license("demo", expiry, 5, "HWID_001").unwrap();
//!
//! let payload = inspect_token(&token).unwrap();
//! assert_eq!(payload.product, "DEMO");
//! ```

use std::fmt;
use std::io::{self, Write};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::NaiveDate;
use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::errors::{LicenseError, LicenseResult};

/// Number of HMAC bytes kept in a token.
pub const SIGNATURE_LEN: usize = 8;

const SEPARATOR: u8 = b'.';

/// URL-safe alphabet, unpadded output. Decoding ignores non-zero trailing
/// bits in the last symbol, so hand-edited tokens still decode.
const B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Compact JSON that escapes every non-ASCII char (and DEL) as `\uXXXX`,
/// using UTF-16 surrogate pairs outside the BMP.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (idx, c) in fragment.char_indices() {
            if c.is_ascii() && c != '\x7f' {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Claims carried inside a license token.
///
/// Field order is alphabetical: serde serializes in declaration order, and
/// the signed bytes must be the sorted-key form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// Expiration date (`YYYY-MM-DD`)
    pub exp: NaiveDate,
    /// Hardware id the license is locked to
    pub hwid: String,
    /// Product name, upper-cased at generation time
    pub product: String,
    /// Maximum allowed users
    pub users: u32,
}

impl LicensePayload {
    /// Canonical bytes that get signed.
    pub fn to_canonical_bytes(&self) -> LicenseResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
        self.serialize(&mut serializer)
            .map_err(|e| LicenseError::SerializationError(format!("payload: {e}")))?;
        Ok(out)
    }
}

/// Signs and checks license tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct LicenseSigner {
    key: hmac::Key,
}

impl fmt::Debug for LicenseSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseSigner").finish_non_exhaustive()
    }
}

impl LicenseSigner {
    /// Create a signer from a secret. The secret must not be empty.
    pub fn new(secret: impl AsRef<[u8]>) -> LicenseResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(LicenseError::ConfigError(
                "signing secret cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    /// Create a signer from the `signing.secret` configuration value.
    pub fn from_config(config: &crate::config::SigningConfig) -> LicenseResult<Self> {
        Self::new(config.secret.as_bytes())
    }

    /// Compute the truncated signature for some payload bytes.
    pub fn sign(&self, data: &[u8]) -> [u8; SIGNATURE_LEN] {
        let tag = hmac::sign(&self.key, data);
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&tag.as_ref()[..SIGNATURE_LEN]);
        out
    }

    /// Check a truncated signature in constant time.
    pub fn verify_signature(&self, data: &[u8], signature: &[u8]) -> LicenseResult<()> {
        let expected = self.sign(data);
        #[allow(deprecated)]
        ring::constant_time::verify_slices_are_equal(&expected, signature)
            .map_err(|_| LicenseError::InvalidSignature)
    }

    /// Encode and sign an already-built payload.
    pub fn sign_payload(&self, payload: &LicensePayload) -> LicenseResult<String> {
        let mut raw = payload.to_canonical_bytes()?;
        let signature = self.sign(&raw);
        raw.push(SEPARATOR);
        raw.extend_from_slice(&signature);
        Ok(B64.encode(raw))
    }

    /// Generate a license key locked to `hwid`.
    ///
    /// The product name is upper-cased in the payload.
    pub fn generate_license(
        &self,
        product: &str,
        expiry: NaiveDate,
        max_users: u32,
        hwid: &str,
    ) -> LicenseResult<String> {
        let payload = LicensePayload {
            exp: expiry,
            hwid: hwid.to_string(),
            product: product.to_uppercase(),
            users: max_users,
        };
        self.sign_payload(&payload)
    }
}

/// Split a token into its payload bytes and signature.
///
/// Accepts tokens with or without `=` padding. The signature has a fixed
/// length, so the split is positional and a `.` inside the signature bytes
/// does not confuse it.
pub fn decode_token(token: &str) -> LicenseResult<(Vec<u8>, Vec<u8>)> {
    let trimmed = token.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(LicenseError::InvalidToken("token is empty".to_string()));
    }

    let mut raw = B64
        .decode(trimmed)
        .map_err(|e| LicenseError::InvalidToken(format!("base64 decode failed: {e}")))?;

    if raw.len() < SIGNATURE_LEN + 2 || raw[raw.len() - SIGNATURE_LEN - 1] != SEPARATOR {
        return Err(LicenseError::InvalidToken(
            "missing payload/signature separator".to_string(),
        ));
    }

    let signature = raw.split_off(raw.len() - SIGNATURE_LEN);
    raw.pop(); // separator
    Ok((raw, signature))
}

/// Parse the payload bytes of a decoded token.
pub fn parse_payload(payload_bytes: &[u8]) -> LicenseResult<LicensePayload> {
    serde_json::from_slice(payload_bytes)
        .map_err(|e| LicenseError::InvalidToken(format!("payload is not valid JSON: {e}")))
}

/// Decode a token's payload without checking its signature.
///
/// Useful for showing what a `.key` file claims before (or instead of)
/// verifying it.
pub fn inspect_token(token: &str) -> LicenseResult<LicensePayload> {
    let (payload_bytes, _) = decode_token(token)?;
    parse_payload(&payload_bytes)
}
