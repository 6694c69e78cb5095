use std::error::Error;
use std::process::Command;

/// Get a CPU brand string on macOS.
///
/// Uses `sysctl machdep.cpu.brand_string`.
pub fn get_cpu_id() -> Result<String, Box<dyn Error>> {
    let output = Command::new("sysctl")
        .args(["-n", "machdep.cpu.brand_string"])
        .output()?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get the platform serial number on macOS.
///
/// Uses `ioreg -rd1 -c IOPlatformExpertDevice` and reads `IOPlatformSerialNumber`.
pub fn get_motherboard_id() -> Result<String, Box<dyn Error>> {
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()?;

    let result = String::from_utf8_lossy(&output.stdout);

    let serial = result
        .lines()
        .find(|line| line.contains("IOPlatformSerialNumber"))
        .and_then(|line| line.split('=').nth(1))
        .map(|value| value.trim().trim_matches('"').to_string())
        .unwrap_or_default();

    Ok(serial)
}
