//! Wall-clock access for receive timestamps.

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
///
/// Receive timestamps are compared against exchange timestamps downstream;
/// clock skew between the two is expected and tolerated there.
#[must_use]
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
