//! Clock-style time formatting for status lines and the exit banner

/// Format seconds as a zero-padded `HH:MM:SS` clock.
///
/// Fractional seconds are truncated; negative or non-finite input
/// formats as `00:00:00`.
///
/// ```
/// use rawnav_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "00:00:00");
/// assert_eq!(format_clock(3661.9), "01:01:01");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Format seconds as `M:SS`, switching to `H:MM:SS` from one hour up.
///
/// ```
/// use rawnav_common::human_time::format_position;
///
/// assert_eq!(format_position(65.0), "1:05");
/// assert_eq!(format_position(3725.0), "1:02:05");
/// ```
pub fn format_position(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format an elapsed/total pair, e.g. `0:12 / 3:30`.
pub fn format_progress(elapsed: f64, total: f64) -> String {
    format!("{} / {}", format_position(elapsed), format_position(total))
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    }
}
