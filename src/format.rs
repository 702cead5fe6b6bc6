use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Formats a number of seconds as `"{hours}h {minutes}m"`, dropping the seconds.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{}h {}m", hours, minutes)
}

/// True when every specifier in `time_format` is one chrono understands.
pub fn is_valid_time_format(time_format: &str) -> bool {
    !StrftimeItems::new(time_format).any(|item| matches!(item, Item::Error))
}

/// Formats the time of day, using [`DEFAULT_TIME_FORMAT`] when `time_format`
/// is not a valid strftime string.
pub fn format_time_of_day(instant: DateTime<Local>, time_format: &str) -> String {
    let time_format = if is_valid_time_format(time_format) {
        time_format
    } else {
        DEFAULT_TIME_FORMAT
    };
    instant.format(time_format).to_string()
}

/// Whole seconds between two instants, floored and never negative.
pub fn elapsed_seconds(from: DateTime<Local>, to: DateTime<Local>) -> u64 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}
