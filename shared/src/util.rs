//! Shared utilities

/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Millisecond timestamp `minutes` back from now.
pub fn minutes_ago(minutes: i64) -> i64 {
    now_millis() - minutes * 60_000
}
