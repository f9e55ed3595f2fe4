use chrono::{DateTime, Duration, TimeZone, Utc};

/// This is the standard way of rendering an accumulated duration in windowtime: `H:MM:SS`.
/// Hours keep growing past a day and fractions of a second are dropped.
pub fn format_elapsed(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Renders a moment in the given timezone as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp<Tz: TimeZone>(moment: DateTime<Utc>, timezone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment
        .with_timezone(timezone)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
