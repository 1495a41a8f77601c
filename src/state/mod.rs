//! Persisted event counters for rate computation across invocations.
//!
//! Each monitored endpoint (host, port and pipeline filter) gets its own
//! state file. The file is read once before an evaluation and replaced
//! wholesale afterwards. There is no locking: concurrent runs against the
//! same endpoint and directory race and the last writer wins.

pub mod rate;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use rate::{rate_per_minute, EventDirection, Throughput};

use crate::data::{PipelineSet, PipelineView};
use crate::error::{CheckError, Result};

/// Directory used for state files unless configured otherwise.
pub const DEFAULT_STATE_DIR: &str = "/tmp/";

/// Marker used in the state file name when no pipeline filter is set.
pub const ALL_PIPELINES: &str = "all";

/// Counters of one pipeline at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineCounters {
    pub events_in: i64,
    pub events_out: i64,
    /// Capture time in seconds since the Unix epoch.
    pub timestamp: f64,
}

impl PipelineCounters {
    pub fn count(&self, direction: EventDirection) -> i64 {
        match direction {
            EventDirection::In => self.events_in,
            EventDirection::Out => self.events_out,
        }
    }
}

/// Prior counters keyed by pipeline name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateRecord {
    pipelines: BTreeMap<String, PipelineCounters>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the counters of every pipeline in `set` at `captured_at`.
    pub fn capture(set: &PipelineSet, captured_at: f64) -> Self {
        let pipelines = set
            .iter()
            .map(|view| {
                (
                    view.name.clone(),
                    PipelineCounters {
                        events_in: view.events_in,
                        events_out: view.events_out,
                        timestamp: captured_at,
                    },
                )
            })
            .collect();

        Self { pipelines }
    }

    pub fn get(&self, pipeline: &str) -> Option<&PipelineCounters> {
        self.pipelines.get(pipeline)
    }

    pub fn contains(&self, pipeline: &str) -> bool {
        self.pipelines.contains_key(pipeline)
    }

    pub fn insert(&mut self, pipeline: impl Into<String>, counters: PipelineCounters) {
        self.pipelines.insert(pipeline.into(), counters);
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Rate of a pipeline counter relative to the stored observation.
    ///
    /// Yields [`Throughput::Initializing`] when the pipeline has no stored
    /// entry or the stored entry has the same timestamp as `now`.
    pub fn events_per_minute(
        &self,
        view: &PipelineView,
        direction: EventDirection,
        now: f64,
    ) -> Throughput {
        self.get(&view.name)
            .and_then(|prior| {
                rate_per_minute(prior.count(direction), prior.timestamp, direction.count(view), now)
            })
            .map_or(Throughput::Initializing, Throughput::PerMinute)
    }
}

/// File name of the state for one monitored endpoint.
pub fn state_file_name(host: &str, port: u16, pipeline: Option<&str>) -> String {
    format!(
        "check_logstash_{}_{}_{}_events_state.tmp",
        host,
        port,
        pipeline.unwrap_or(ALL_PIPELINES)
    )
}

/// Reads and writes the [`StateRecord`] of one monitored endpoint.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by an explicit file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create the store for an endpoint inside `dir`.
    pub fn for_endpoint<P: AsRef<Path>>(
        dir: P,
        host: &str,
        port: u16,
        pipeline: Option<&str>,
    ) -> Self {
        Self::new(dir.as_ref().join(state_file_name(host, port, pipeline)))
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record. A missing file yields an empty record.
    pub fn load(&self) -> Result<StateRecord> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "no prior state, starting fresh");
            return Ok(StateRecord::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CheckError::StateIo(format!(
                "Can not load state from {}, reason: {}",
                self.path.display(),
                e
            ))
        })?;

        let record: StateRecord = serde_json::from_str(&content).map_err(|e| {
            CheckError::StateIo(format!(
                "Can not load state from {}, reason: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), pipelines = record.len(), "loaded prior state");
        Ok(record)
    }

    /// Replace the stored record.
    pub fn save(&self, record: &StateRecord) -> Result<()> {
        let json = serde_json::to_string(record).map_err(|e| {
            CheckError::StateIo(format!("Can not serialize state, reason: {}", e))
        })?;

        fs::write(&self.path, json).map_err(|e| {
            CheckError::StateIo(format!(
                "Can not save state to {}, reason: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), pipelines = record.len(), "saved state");
        Ok(())
    }
}
