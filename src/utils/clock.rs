use time::OffsetDateTime;

/// Current wall-clock time as unix milliseconds, the unit every persisted
/// timestamp in the store uses.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// One hour in milliseconds, the lifetime of a freshly issued session token.
pub const HOUR_MS: i64 = 60 * 60 * 1000;
