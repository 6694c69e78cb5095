//! `.key` file export and discovery.
//!
//! A `.key` file holds exactly one license token and nothing else.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::errors::{LicenseError, LicenseResult};

/// File name an application looks for first.
pub const LICENSE_FILE_NAME: &str = "license.key";

const KEY_EXTENSION: &str = "key";

/// Default export name for a client/product pair: `{client}_{product}.key`.
///
/// Spaces and path separators become `_` so the result is a single file name.
pub fn default_key_file_name(client: &str, product: &str) -> String {
    format!("{client}_{product}.{KEY_EXTENSION}")
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Write a token to `path`, with no trailing newline.
pub async fn write_key_file(path: impl AsRef<Path>, token: &str) -> LicenseResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, token.trim()).await?;
    Ok(())
}

/// Read a token from `path`, trimmed.
pub async fn read_key_file(path: impl AsRef<Path>) -> LicenseResult<String> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).await?;
    let token = contents.trim();
    if token.is_empty() {
        return Err(LicenseError::InvalidToken(format!(
            "key file '{}' is empty",
            path.display()
        )));
    }
    Ok(token.to_string())
}

fn has_key_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(KEY_EXTENSION))
}

/// Locate the key file in `dir`.
///
/// Prefers `license.key`; otherwise the first `*.key` in name order.
/// Returns `Ok(None)` if the directory has no key file (or does not exist).
pub async fn find_key_file(dir: impl AsRef<Path>) -> LicenseResult<Option<PathBuf>> {
    let dir = dir.as_ref();

    let preferred = dir.join(LICENSE_FILE_NAME);
    if fs::metadata(&preferred).await.is_ok_and(|m| m.is_file()) {
        return Ok(Some(preferred));
    }

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LicenseError::StorageError(e)),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if has_key_extension(&path) && entry.file_type().await?.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    if let Some(first) = candidates.first() {
        debug!("No {LICENSE_FILE_NAME} found, using {}", first.display());
    }
    Ok(candidates.into_iter().next())
}

/// Save a verified token as `dir/license.key` so it is found on next start.
pub async fn persist_verified_key(dir: impl AsRef<Path>, token: &str) -> LicenseResult<PathBuf> {
    let path = dir.as_ref().join(LICENSE_FILE_NAME);
    write_key_file(&path, token).await?;
    Ok(path)
}
