//! Human-readable formatting for sizes and durations shown in pages and logs

use std::time::Duration;

/// Formats a byte count with binary units, e.g. `1.50MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0}{}", UNITS[unit_index])
    } else if size >= 10.0 {
        format!("{size:.1}{}", UNITS[unit_index])
    } else {
        format!("{size:.2}{}", UNITS[unit_index])
    }
}

/// Size column of the directory listing: always kilobytes with two decimals.
pub fn format_kilobytes(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Formats a duration compactly, e.g. `2h`, `1h30m`, `45s`.
///
/// A zero duration renders as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    if total_seconds == 0 {
        return "0s".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut formatted = String::new();
    for (value, unit) in [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")] {
        if value > 0 {
            formatted.push_str(&format!("{value}{unit}"));
        }
    }
    formatted
}
