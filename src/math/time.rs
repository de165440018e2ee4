//! Time-bucket boundary arithmetic.

pub const ONE_HOUR: i64 = 3_600;
pub const ONE_DAY: i64 = 86_400;

/// Most recent interval boundary at or before `timestamp`.
pub fn bucket_open_time(timestamp: i64, interval: i64) -> i64 {
    timestamp - timestamp.rem_euclid(interval)
}
