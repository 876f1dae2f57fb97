//! Database metrics collection.
//!
//! Provides functions for recording repository-related metrics.

use metrics::histogram;
use std::time::Instant;

/// Record repository query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "device_records_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// A helper to time repository operations and record metrics.
///
/// Usage:
/// ```ignore
/// let timer = QueryTimer::new("find_by_device_id");
/// let result = sqlx::query_as::<_, DeviceRecordEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Create a new timer for the given query name.
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(self.query_name, duration);
    }
}
