use std::process::Command;

fn wmic_value(args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let output = Command::new("wmic").args(args).output()?;
    let result = String::from_utf8_lossy(&output.stdout);
    // First line is the column header
    let value = result.lines().nth(1).unwrap_or("").trim();
    Ok(value.to_string())
}

pub fn get_cpu_id() -> Result<String, Box<dyn std::error::Error>> {
    wmic_value(&["cpu", "get", "Name"])
}

pub fn get_motherboard_id() -> Result<String, Box<dyn std::error::Error>> {
    wmic_value(&["baseboard", "get", "SerialNumber"])
}
