use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Renders permission bits in octal, without a prefix (`0o755` -> `"755"`).
pub fn normalize_mode(mode: u32) -> String {
    format!("{:o}", mode)
}

/// Joins paths for a log message.
pub fn paths_string<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// Times before the epoch render as 0
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
