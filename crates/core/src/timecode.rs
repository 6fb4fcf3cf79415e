//! `HH:MM:SS` timecodes used for trim points and video durations.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Accepted trim-point format: hours 00-23, minutes and seconds 00-59.
const TIME_PATTERN: &str = r"^([0-1][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])$";

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TIME_PATTERN).expect("valid regex"));

/// Format a playback position as zero-padded `HH:MM:SS`.
///
/// Fractional seconds are floored. Negative and NaN inputs format as
/// `00:00:00`. Hours are not capped, so very long positions produce
/// three-digit hours.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Convert `H:M:S` to whole seconds. An empty string counts as zero.
pub fn time_to_seconds(time: &str) -> Result<u64, CoreError> {
    let time = time.trim();
    if time.is_empty() {
        return Ok(0);
    }

    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 3 {
        return Err(CoreError::Validation(format!(
            "Invalid time '{time}'. Expected HH:MM:SS"
        )));
    }

    let mut total = 0u64;
    for (part, scale) in parts.iter().zip([3600u64, 60, 1]) {
        let value: u64 = part
            .parse()
            .map_err(|_| CoreError::Validation(format!("Invalid time component in '{time}'")))?;
        total = value
            .checked_mul(scale)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| CoreError::Validation(format!("Time '{time}' is out of range")))?;
    }
    Ok(total)
}

/// Strict boundary check applied to user-entered trim points.
pub fn validate_time_format(time: &str) -> bool {
    TIME_RE.is_match(time)
}
