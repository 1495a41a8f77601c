//! Threshold evaluation.
//!
//! Two modes are supported:
//!
//! - [`PercentThreshold`]: a value above the critical (or warning) bound
//!   yields that severity. Used for file descriptor, heap and CPU usage.
//! - [`RangeThreshold`]: a value outside the `min:max` bounds of a level
//!   yields that severity. Used for inflight events, event rates and queue
//!   backpressure.
//!
//! All comparisons are strict: a value equal to a bound never triggers it.

use std::fmt;
use std::str::FromStr;

use super::severity::Severity;
use crate::error::CheckError;

/// Greater-than thresholds. An unset level is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PercentThreshold {
    pub warning: Option<i64>,
    pub critical: Option<i64>,
}

impl PercentThreshold {
    pub const fn new(warning: Option<i64>, critical: Option<i64>) -> Self {
        Self { warning, critical }
    }

    pub fn evaluate(&self, value: f64) -> Severity {
        if self.critical.is_some_and(|crit| value > crit as f64) {
            Severity::Critical
        } else if self.warning.is_some_and(|warn| value > warn as f64) {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    /// Reject bounds outside `0..=100`.
    pub fn validate_percent(&self) -> Result<(), CheckError> {
        for value in [self.warning, self.critical].into_iter().flatten() {
            if !(0..=100).contains(&value) {
                return Err(CheckError::Configuration(format!(
                    "{} is not in range 0..100",
                    value
                )));
            }
        }
        Ok(())
    }
}

/// Lower and upper bound of one severity level.
///
/// Parsed from `N` (maximum only), `N:` (minimum only) or `N:M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Bounds {
    pub const fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn is_above_max(&self, value: i64) -> bool {
        self.max.is_some_and(|max| value > max)
    }

    pub fn is_below_min(&self, value: i64) -> bool {
        self.min.is_some_and(|min| value < min)
    }

    fn excludes(&self, value: f64) -> bool {
        self.max.is_some_and(|max| value > max as f64)
            || self.min.is_some_and(|min| value < min as f64)
    }
}

impl FromStr for Bounds {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CheckError::Configuration(format!("invalid range argument {:?}", s));
        let parse = |part: &str| part.trim().parse::<i64>().map_err(|_| invalid());

        let s = s.trim();
        if s.is_empty() || s.starts_with(':') {
            return Err(invalid());
        }

        match s.split_once(':') {
            None => Ok(Self::new(None, Some(parse(s)?))),
            Some((min, "")) => Ok(Self::new(Some(parse(min)?), None)),
            Some((min, max)) => Ok(Self::new(Some(parse(min)?), Some(parse(max)?))),
        }
    }
}

impl fmt::Display for Bounds {
    /// Renders `min:max`, `min:` or `max`; unset bounds render empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(min) = self.min {
            write!(f, "{}:", min)?;
        }
        if let Some(max) = self.max {
            write!(f, "{}", max)?;
        }
        Ok(())
    }
}

/// Min/max thresholds for the warning and critical levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeThreshold {
    pub warning: Bounds,
    pub critical: Bounds,
}

impl RangeThreshold {
    pub const fn new(warning: Bounds, critical: Bounds) -> Self {
        Self { warning, critical }
    }

    /// Whether any bound is configured.
    pub fn is_set(&self) -> bool {
        self.warning.is_set() || self.critical.is_set()
    }

    /// Evaluate a value. Bounds are checked in the order critical max,
    /// critical min, warning max, warning min; the first match wins.
    pub fn evaluate(&self, value: i64) -> Severity {
        if self.critical.is_above_max(value) || self.critical.is_below_min(value) {
            Severity::Critical
        } else if self.warning.is_above_max(value) || self.warning.is_below_min(value) {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    /// Evaluate a fractional value such as a flow rate.
    pub fn evaluate_float(&self, value: f64) -> Severity {
        if self.critical.excludes(value) {
            Severity::Critical
        } else if self.warning.excludes(value) {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

/// Default file descriptor usage thresholds, in percent.
pub const DEFAULT_FILE_DESCRIPTORS: PercentThreshold = PercentThreshold::new(Some(85), Some(95));

/// Default heap usage thresholds, in percent.
pub const DEFAULT_HEAP: PercentThreshold = PercentThreshold::new(Some(70), Some(80));

/// All thresholds of a health evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub file_descriptors: PercentThreshold,
    pub heap: PercentThreshold,
    pub cpu: PercentThreshold,
    pub inflight_events: RangeThreshold,
    pub events_in_per_minute: RangeThreshold,
    pub events_out_per_minute: RangeThreshold,
    /// Per-pipeline `flow.queue_backpressure.current`; disabled when unset.
    pub queue_backpressure: RangeThreshold,
    /// Map the node `status` (green/yellow/red) to a severity.
    pub node_status: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            file_descriptors: DEFAULT_FILE_DESCRIPTORS,
            heap: DEFAULT_HEAP,
            cpu: PercentThreshold::default(),
            inflight_events: RangeThreshold::default(),
            events_in_per_minute: RangeThreshold::default(),
            events_out_per_minute: RangeThreshold::default(),
            queue_backpressure: RangeThreshold::default(),
            node_status: false,
        }
    }
}

impl Thresholds {
    /// Whether any events-per-minute rule is enabled, which requires state.
    pub fn tracks_event_rates(&self) -> bool {
        self.events_in_per_minute.is_set() || self.events_out_per_minute.is_set()
    }

    /// Check percentage bounds before anything is fetched.
    pub fn validate(&self) -> Result<(), CheckError> {
        self.file_descriptors.validate_percent()?;
        self.heap.validate_percent()
    }
}
