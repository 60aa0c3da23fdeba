use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};

use crate::domain::TaskDefinition;

/// Convert fractional minutes into a chrono duration (millisecond precision)
pub fn duration_from_minutes(minutes: f64) -> Duration {
    if !minutes.is_finite() {
        return Duration::zero();
    }
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Whole seconds between two instants, floored
pub fn seconds_between<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> i64 {
    end.clone()
        .signed_duration_since(start.clone())
        .num_milliseconds()
        .div_euclid(1000)
}

/// Fractional minutes between two instants (negative if `end` is before `start`)
pub fn minutes_between<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> f64 {
    end.clone()
        .signed_duration_since(start.clone())
        .num_milliseconds() as f64
        / 60_000.0
}

/// Minutes elapsed since `since`, never negative
pub fn elapsed_minutes(since: &DateTime<Utc>, now: &DateTime<Utc>) -> f64 {
    minutes_between(since, now).max(0.0)
}

/// Parse a 24-hour "HH:MM" time of day
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// The instant at "HH:MM" on the same calendar day as `now`, in `now`'s zone
pub fn resolve_time_of_day<Tz: TimeZone>(now: &DateTime<Tz>, value: &str) -> Option<DateTime<Tz>> {
    let time = parse_time_of_day(value)?;
    let naive = now.date_naive().and_time(time);
    now.timezone().from_local_datetime(&naive).earliest()
}

/// Start time plus the planned duration of every task
pub fn estimated_end(start: DateTime<Utc>, tasks: &[TaskDefinition]) -> DateTime<Utc> {
    let total: i64 = tasks.iter().map(|task| i64::from(task.duration)).sum();
    start + Duration::minutes(total)
}

/// Format minutes as "Xh Ym" or "Ym" (both parts floored).
/// Negative input is formatted by magnitude with a leading "-".
pub fn format_minutes(minutes: f64) -> String {
    if !minutes.is_finite() {
        return "0m".to_string();
    }
    let total = minutes.abs().floor() as i64;
    let sign = if minutes < 0.0 && total > 0 { "-" } else { "" };
    let hours = total / 60;
    let mins = total % 60;

    if hours > 0 {
        format!("{}{}h {}m", sign, hours, mins)
    } else {
        format!("{}{}m", sign, mins)
    }
}

/// Format seconds for a countdown display: "HH:MM:SS" past an hour, "MM:SS" otherwise.
/// Negative input is formatted by magnitude; the caller decides how to mark overtime.
pub fn format_timer(seconds: i64) -> String {
    let seconds = seconds.unsigned_abs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format an instant as a local wall-clock time ("9:05 AM" or "09:05")
pub fn format_clock(ts: &DateTime<Utc>, use_12_hour: bool) -> String {
    let local = ts.with_timezone(&Local);
    if use_12_hour {
        local.format("%-I:%M %p").to_string()
    } else {
        local.format("%H:%M").to_string()
    }
}

/// Format a wall-clock range ("9:00 AM - 10:30 AM")
pub fn format_time_range(start: &DateTime<Utc>, end: &DateTime<Utc>, use_12_hour: bool) -> String {
    format!(
        "{} - {}",
        format_clock(start, use_12_hour),
        format_clock(end, use_12_hour)
    )
}

/// Human-readable span between two instants
pub fn time_diff(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    format_minutes(minutes_between(start, end))
}
