use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
///
/// Fixed millisecond precision and a `Z` suffix keep stored values
/// lexicographically ordered, which the staleness scans rely on.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a peer-reported unix timestamp in milliseconds
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
