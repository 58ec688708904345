//! Time utilities and constants for the rate engine.

use chrono::{DateTime, Duration, Local, Utc};

/// Engine timing constants.
pub mod constants {
    use super::Duration;

    /// How long a cached snapshot is served without asking the network (24 hours).
    ///
    /// The feed publishes at most once per business day.
    pub fn cache_freshness_window() -> Duration {
        Duration::hours(24)
    }

    /// Upper bound on the single feed request (10 seconds).
    pub fn feed_request_timeout() -> Duration {
        Duration::seconds(10)
    }

    /// Largest request timeout a configuration may ask for (60 seconds).
    pub fn max_request_timeout() -> Duration {
        Duration::seconds(60)
    }
}

/// Date layout used for source dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Today's date on the local clock, as `YYYY-MM-DD`.
pub fn local_date_string() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Seconds since the Unix epoch, with millisecond precision.
pub fn to_epoch_seconds(ts: Timestamp) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

/// Inverse of [`to_epoch_seconds`]. `None` for non-finite or out-of-range input.
pub fn from_epoch_seconds(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

/// Age of a timestamp relative to now. Negative for timestamps in the future.
pub fn age_of(ts: Timestamp) -> Duration {
    now().signed_duration_since(ts)
}

/// Check if a timestamp is younger than `window`.
pub fn is_within(ts: Timestamp, window: Duration) -> bool {
    age_of(ts) < window
}
