//! Normalized per-pipeline view over both stats API shapes.
//!
//! Before 6.0.0 the stats carry a single `pipeline` object. Later versions
//! carry a `pipelines` map keyed by pipeline name. [`PipelineSet::from_snapshot`]
//! resolves the shape once so the health rules only deal with
//! [`PipelineView`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::snapshot::{as_float, as_integer, lookup, Fields, Snapshot};
use super::version::ServiceVersion;
use crate::error::{CheckError, Result};

/// Internal pipeline used by X-Pack monitoring; never evaluated.
pub const MONITORING_PIPELINE: &str = ".monitoring-logstash";

/// Name given to the single pipeline of the legacy shape.
pub const LEGACY_PIPELINE: &str = "main";

/// Which stats API shape a snapshot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineLayout {
    /// Single `pipeline` object (before 6.0.0).
    Legacy,
    /// Map of named pipelines under `pipelines` (6.0.0 and later).
    Named,
}

/// Current flow rates of a pipeline, reported by recent named-pipeline
/// versions under `flow.<metric>.current`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowMetrics {
    pub queue_backpressure: Option<f64>,
    pub input_throughput: Option<f64>,
    pub filter_throughput: Option<f64>,
    pub output_throughput: Option<f64>,
}

/// Counters and reload status of one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineView {
    pub name: String,
    pub events_in: i64,
    pub events_out: i64,
    pub reload_failures: i64,
    /// Last reload error message, trimmed; empty when there is none.
    pub last_reload_error: String,
    /// Reload timestamps; only read for the legacy layout.
    pub last_reload_success_at: Option<DateTime<Utc>>,
    pub last_reload_failure_at: Option<DateTime<Utc>>,
    pub flow: FlowMetrics,
}

/// All evaluated pipelines of a snapshot plus the shape they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSet {
    pub layout: PipelineLayout,
    pub pipelines: Vec<PipelineView>,
}

impl PipelineSet {
    /// Extract the pipelines of a snapshot.
    ///
    /// Pipelines keep the order of the API response. The monitoring
    /// pipeline is skipped.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let version = match snapshot.get("version")? {
            Value::String(raw) => raw.parse::<ServiceVersion>()?,
            other => {
                return Err(CheckError::InvalidField(format!(
                    "version (unrecognised value {})",
                    other
                )))
            }
        };

        if version.has_named_pipelines() {
            let pipelines = match snapshot.get("pipelines")? {
                Value::Object(map) => map,
                _ => return Err(CheckError::InvalidField("pipelines".to_string())),
            };

            let views = pipelines
                .iter()
                .filter(|(name, _)| name.as_str() != MONITORING_PIPELINE)
                .map(|(name, entry)| {
                    let prefix = format!("pipelines.{}", name);
                    match entry {
                        Value::Object(fields) => {
                            read_view(name, &prefix, fields, PipelineLayout::Named)
                        }
                        _ => Err(CheckError::InvalidField(prefix)),
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Self {
                layout: PipelineLayout::Named,
                pipelines: views,
            })
        } else {
            let fields = match snapshot.get("pipeline")? {
                Value::Object(map) => map,
                _ => return Err(CheckError::InvalidField("pipeline".to_string())),
            };

            Ok(Self {
                layout: PipelineLayout::Legacy,
                pipelines: vec![read_view(
                    LEGACY_PIPELINE,
                    "pipeline",
                    fields,
                    PipelineLayout::Legacy,
                )?],
            })
        }
    }

    /// Inflight events of a pipeline.
    ///
    /// Named pipelines report `in - out`; the legacy shape reports `out - in`.
    pub fn inflight_events(&self, view: &PipelineView) -> i64 {
        match self.layout {
            PipelineLayout::Named => view.events_in - view.events_out,
            PipelineLayout::Legacy => view.events_out - view.events_in,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineView> {
        self.pipelines.iter()
    }
}

fn read_view(
    name: &str,
    prefix: &str,
    fields: &Fields,
    layout: PipelineLayout,
) -> Result<PipelineView> {
    let qualified = |path: &str| format!("{}.{}", prefix, path);

    let integer = |path: &str| -> Result<i64> {
        lookup(path, fields)
            .ok()
            .and_then(as_integer)
            .ok_or_else(|| CheckError::InvalidField(qualified(path)))
    };

    let optional = |path: &str| lookup(path, fields).ok().filter(|value| !value.is_null());

    // Named pipelines are judged on the failure count alone.
    let timestamp = |path: &str| -> Result<Option<DateTime<Utc>>> {
        if layout == PipelineLayout::Named {
            return Ok(None);
        }
        match optional(path) {
            None => Ok(None),
            Some(Value::String(raw)) => parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| CheckError::InvalidField(qualified(path))),
            Some(_) => Err(CheckError::InvalidField(qualified(path))),
        }
    };

    let flow = |metric: &str| {
        let path = format!("flow.{}.current", metric);
        optional(path.as_str()).and_then(as_float)
    };

    let last_reload_error = match optional("reloads.last_error.message") {
        Some(Value::String(message)) => message.trim().to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    Ok(PipelineView {
        name: name.to_string(),
        events_in: integer("events.in")?,
        events_out: integer("events.out")?,
        reload_failures: integer("reloads.failures")?,
        last_reload_error,
        last_reload_success_at: timestamp("reloads.last_success_timestamp")?,
        last_reload_failure_at: timestamp("reloads.last_failure_timestamp")?,
        flow: FlowMetrics {
            queue_backpressure: flow("queue_backpressure"),
            input_throughput: flow("input_throughput"),
            filter_throughput: flow("filter_throughput"),
            output_throughput: flow("output_throughput"),
        },
    })
}

/// Timestamp layouts with an explicit UTC offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Timestamp layouts without an offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a reload timestamp.
///
/// Accepts RFC 3339, ISO 8601 with a `+hhmm` offset, `YYYY-MM-DD hh:mm:ss`
/// optionally followed by an offset or a `UTC`/`GMT` zone name, and plain
/// `YYYY-MM-DD` dates. Values without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = ["UTC", "GMT", "Z"]
        .iter()
        .find_map(|zone| raw.strip_suffix(zone))
        .map(str::trim_end)
        .unwrap_or(raw);
    if let Some(ts) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
    {
        return Some(ts.and_utc());
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
