//! Machine fingerprinting for hardware-locked licenses.
//!
//! The fingerprint is the first 16 hex digits (upper-case) of
//! `SHA-256("{os}-{cpu}-{board}")`. Probes that fail fall back to fixed
//! tokens, so fingerprinting itself never fails.

use ring::digest::{digest, SHA256};
use tracing::debug;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as platform;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as platform;

/// Length of a machine fingerprint in hex characters.
pub const HARDWARE_ID_LEN: usize = 16;

/// Used when the CPU model cannot be determined.
pub const FALLBACK_CPU: &str = "GENCPU";

/// Used when no board identifier can be determined.
pub const FALLBACK_BOARD: &str = "GENBOARD";

/// Platform family name, matching what `uname -s` reports.
fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

/// Hash the raw machine attributes into a fingerprint.
pub fn fingerprint(os: &str, cpu: &str, board: &str) -> String {
    let base = format!("{os}-{cpu}-{board}");
    let hash = digest(&SHA256, base.as_bytes());
    hex::encode_upper(&hash.as_ref()[..HARDWARE_ID_LEN / 2])
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn probe_cpu() -> Option<String> {
    platform::get_cpu_id()
        .map_err(|e| debug!("CPU probe failed: {e}"))
        .ok()
        .filter(|s| !s.is_empty())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn probe_cpu() -> Option<String> {
    None
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn probe_board() -> Option<String> {
    platform::get_motherboard_id()
        .map_err(|e| debug!("board probe failed: {e}"))
        .ok()
        .filter(|s| !s.is_empty())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn probe_board() -> Option<String> {
    None
}

/// Returns the fingerprint of the current machine.
pub fn get_hardware_id() -> String {
    let cpu = probe_cpu().unwrap_or_else(|| FALLBACK_CPU.to_string());
    let board = probe_board().unwrap_or_else(|| FALLBACK_BOARD.to_string());
    fingerprint(os_name(), &cpu, &board)
}
