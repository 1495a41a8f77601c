//! Events-per-minute rates between two counter observations.

use std::fmt;

use crate::data::PipelineView;

/// Direction of an event counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDirection {
    In,
    Out,
}

impl EventDirection {
    /// Lowercase name used in messages and perfdata labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventDirection::In => "in",
            EventDirection::Out => "out",
        }
    }

    /// The counter of a pipeline for this direction.
    pub fn count(&self, view: &PipelineView) -> i64 {
        match self {
            EventDirection::In => view.events_in,
            EventDirection::Out => view.events_out,
        }
    }
}

impl fmt::Display for EventDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate of a pipeline counter, or the marker that no rate exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throughput {
    /// No usable prior observation; the state has just been initialized.
    Initializing,
    /// Events per minute since the prior observation.
    PerMinute(i64),
}

impl Throughput {
    pub fn per_minute(&self) -> Option<i64> {
        match self {
            Throughput::Initializing => None,
            Throughput::PerMinute(rate) => Some(*rate),
        }
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Throughput::Initializing => f.write_str("Initialized"),
            Throughput::PerMinute(rate) => write!(f, "{}", rate),
        }
    }
}

/// Events per minute between two observations, truncated toward zero.
///
/// Timestamps are seconds. Returns `None` when both observations share the
/// same timestamp. Rates beyond the `i64` range saturate.
pub fn rate_per_minute(
    prior_count: i64,
    prior_at: f64,
    current_count: i64,
    current_at: f64,
) -> Option<i64> {
    let elapsed = current_at - prior_at;
    if elapsed == 0.0 || !elapsed.is_finite() {
        return None;
    }

    // Widened so a corrupted state file cannot overflow the subtraction.
    let delta = i128::from(current_count) - i128::from(prior_count);
    Some((delta as f64 / elapsed * 60.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_one_minute() {
        assert_eq!(rate_per_minute(100, 0.0, 160, 60.0), Some(60));
    }

    #[test]
    fn test_rate_scales_to_minutes() {
        // 30 events in 10 seconds
        assert_eq!(rate_per_minute(0, 100.0, 30, 110.0), Some(180));
        // 90 events in 5 minutes
        assert_eq!(rate_per_minute(10, 0.0, 100, 300.0), Some(18));
    }

    #[test]
    fn test_rate_truncates_toward_zero() {
        // 1 event in 7 seconds = 8.57/min
        assert_eq!(rate_per_minute(0, 0.0, 1, 7.0), Some(8));
        // counter reset: -1 event in 7 seconds = -8.57/min
        assert_eq!(rate_per_minute(1, 0.0, 0, 7.0), Some(-8));
    }

    #[test]
    fn test_rate_extreme_counters_saturate() {
        assert_eq!(rate_per_minute(i64::MIN, 0.0, i64::MAX, 60.0), Some(i64::MAX));
        assert_eq!(rate_per_minute(i64::MAX, 0.0, i64::MIN, 60.0), Some(i64::MIN));
    }

    #[test]
    fn test_rate_same_timestamp() {
        assert_eq!(rate_per_minute(100, 42.5, 160, 42.5), None);
    }

    #[test]
    fn test_throughput_display() {
        assert_eq!(Throughput::Initializing.to_string(), "Initialized");
        assert_eq!(Throughput::PerMinute(-3).to_string(), "-3");
        assert_eq!(Throughput::PerMinute(60).per_minute(), Some(60));
        assert_eq!(Throughput::Initializing.per_minute(), None);
    }
}
