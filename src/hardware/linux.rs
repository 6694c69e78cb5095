use std::fs;

/// CPU model name from `/proc/cpuinfo`.
pub fn get_cpu_id() -> Result<String, Box<dyn std::error::Error>> {
    let cpuinfo = fs::read_to_string("/proc/cpuinfo")?;
    let model = cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split(':').nth(1))
        .unwrap_or("");
    Ok(model.trim().to_string())
}

/// Board serial if readable, otherwise the systemd machine id.
pub fn get_motherboard_id() -> Result<String, Box<dyn std::error::Error>> {
    // board_serial is usually root-only
    if let Ok(serial) = fs::read_to_string("/sys/devices/virtual/dmi/id/board_serial") {
        let serial = serial.trim();
        if !serial.is_empty() {
            return Ok(serial.to_string());
        }
    }

    let machine_id = fs::read_to_string("/etc/machine-id")?;
    Ok(machine_id.trim().to_string())
}
