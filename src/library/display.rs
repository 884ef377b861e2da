/// Format seconds as `m:ss`, or `h:mm:ss` past the hour.
///
/// Unknown, zero or non-finite values render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hrs > 0 {
        format!("{hrs}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}

/// Same as [`format_time`] for an optional duration.
pub fn format_duration(seconds: Option<f64>) -> String {
    format_time(seconds.unwrap_or(0.0))
}

/// Truncate `name` to `max` characters, appending `...` when cut.
pub fn truncate_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut out: String = name.chars().take(max).collect();
    out.push_str("...");
    out
}
