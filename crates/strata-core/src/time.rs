use time::OffsetDateTime;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Timestamp stamped on values refreshed or written locally.
///
/// One millisecond behind `now`, so an invalidation recorded in the same
/// millisecond as the refresh still marks the value stale.
pub fn refresh_stamp() -> i64 {
    now_millis() - 1
}
