//! Human readable byte counts for upload metadata.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count the way upload metadata reports it: `1 Byte`, `345 Bytes`,
/// `1.21 KB`, `3.5 MB`. Three significant digits, trailing zeros stripped.
pub fn human_filesize(bytes: u64) -> String {
    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1024 {
        return format!("{} Bytes", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut formatted = format!("{:.*}", decimals_for(value), value);
    // Rounding can carry into the next unit (1023.9 KB prints as 1024).
    if formatted.parse::<f64>().is_ok_and(|rounded| rounded >= 1024.0) && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
        formatted = format!("{:.*}", decimals_for(value), value);
    }
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    format!("{} {}", trimmed, UNITS[unit])
}

fn decimals_for(value: f64) -> usize {
    if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    }
}
