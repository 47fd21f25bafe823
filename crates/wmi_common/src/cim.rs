//! CIM value helpers: datetime parsing and byte formatting.

use chrono::NaiveDateTime;

/// Parse a CIM datetime such as `20231106120000.000000+000`.
///
/// The timezone offset is ignored; WMI reports local time and the only
/// consumer (uptime) compares against local now.
pub fn parse_cim_datetime(raw: &str) -> Option<NaiveDateTime> {
    let stamp = raw.split('.').next()?;
    if stamp.len() != 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()
}

/// Human-readable byte count, e.g. `1.50 GB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}
