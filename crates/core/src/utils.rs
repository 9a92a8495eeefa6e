use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Parses a Slack `ts` ("<seconds>.<fraction>") into a UTC instant
pub fn ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Right-pad (or cut) the fraction to nanoseconds
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse().ok()?
    };
    DateTime::from_timestamp(secs, nanos)
}

/// Formats an instant the way Slack writes `ts` values (microsecond precision).
pub fn datetime_to_ts(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Renders a Slack `ts` in the local timezone.
/// Returns the input unchanged if it is not a valid timestamp.
pub fn format_ts_local(ts: &str) -> String {
    match ts_to_datetime(ts) {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Parses an operator-supplied date bound.
///
/// `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS` are read as UTC (a bare date means
/// midnight); anything else goes through `dateparser`, also pinned to UTC.
pub fn parse_date_bound(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Config("empty date".to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive_dt.and_utc());
    }

    dateparser::parse_with_timezone(input, &Utc).map_err(|e| {
        Error::Config(format!(
            "invalid date `{input}` ({e}); expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"
        ))
    })
}

/// Sanitizes a string for use in a filename
/// Replaces invalid filename characters with hyphens
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `<user>_slack_messages_<channel>.json` in the working directory.
pub fn default_output_file(user_id: &str, channel_id: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_slack_messages_{}.json",
        sanitize_filename(user_id),
        sanitize_filename(channel_id)
    ))
}
