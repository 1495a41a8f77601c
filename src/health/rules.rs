//! The individual health rules.
//!
//! Each rule turns part of a [`Snapshot`] into one [`HealthResult`]. Rules
//! spanning several pipelines report the worst severity of any pipeline and
//! list every pipeline in their message.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::severity::{HealthResult, Severity};
use super::threshold::{PercentThreshold, RangeThreshold};
use crate::data::pipeline::parse_timestamp;
use crate::data::{PipelineLayout, PipelineSet, ServiceVersion, Snapshot};
use crate::error::{CheckError, Result};
use crate::state::{EventDirection, StateRecord};

/// Reload success time assumed when the legacy stats carry none.
const LEGACY_SUCCESS_PLACEHOLDER: &str = "1970-01-01";
/// Reload failure time assumed when the legacy stats carry none.
const LEGACY_FAILURE_PLACEHOLDER: &str = "1970-01-02";

/// Open file descriptors relative to the process limit.
pub fn file_descriptors(snapshot: &Snapshot, threshold: &PercentThreshold) -> Result<HealthResult> {
    let open = snapshot.get_i64("process.open_file_descriptors")?;
    let max = snapshot.get_i64("process.max_file_descriptors")?;
    let percent = open as f64 / max as f64 * 100.0;

    let message = format!(
        "Open file descriptors at {:.2}%. ({} out of {} file descriptors are open)",
        percent, open, max
    );
    Ok(HealthResult::new(threshold.evaluate(percent), message))
}

/// JVM heap usage as reported by the service.
pub fn heap(snapshot: &Snapshot, threshold: &PercentThreshold) -> Result<HealthResult> {
    let percent = snapshot.get_f64("jvm.mem.heap_used_percent")?;
    let used = snapshot.get_i64("jvm.mem.heap_used_in_bytes")?;
    let max = snapshot.get_i64("jvm.mem.heap_max_in_bytes")?;

    let message = format!(
        "Heap usage at {:.2}% ({} out of {} bytes in use)",
        percent, used, max
    );
    Ok(HealthResult::new(threshold.evaluate(percent), message))
}

/// Process CPU usage, truncated to whole percent before comparison.
pub fn cpu(snapshot: &Snapshot, threshold: &PercentThreshold) -> Result<HealthResult> {
    let percent = snapshot.get_i64("process.cpu.percent")?;
    let message = format!("CPU usage in percent: {}", percent);
    Ok(HealthResult::new(threshold.evaluate(percent as f64), message))
}

/// Events accepted but not yet emitted, per pipeline.
pub fn inflight_events(pipelines: &PipelineSet, threshold: &RangeThreshold) -> HealthResult {
    match pipelines.layout {
        PipelineLayout::Named => {
            let mut message = String::from("Inflight events:");
            let mut severity = Severity::Ok;
            for view in pipelines.iter() {
                let inflight = pipelines.inflight_events(view);
                message.push_str(&format!(" {}: {};", view.name, inflight));
                severity = severity.max(threshold.evaluate(inflight));
            }
            HealthResult::new(severity, message)
        }
        PipelineLayout::Legacy => {
            let inflight = pipelines
                .iter()
                .next()
                .map(|view| pipelines.inflight_events(view))
                .unwrap_or_default();
            HealthResult::new(
                threshold.evaluate(inflight),
                format!("Inflight events: {}", inflight),
            )
        }
    }
}

/// Configuration reload failures.
///
/// Named pipelines are critical as soon as any reload failure was counted.
/// The legacy shape is only critical while the last failure is more recent
/// than the last success.
pub fn config_reload(pipelines: &PipelineSet) -> HealthResult {
    match pipelines.layout {
        PipelineLayout::Named => {
            let mut message = String::from("Config reload syntax check:");
            let mut failures = 0;
            for view in pipelines.iter() {
                failures += view.reload_failures;
                let status = if view.last_reload_error.is_empty() {
                    "OK"
                } else {
                    view.last_reload_error.as_str()
                };
                message.push_str(&format!(" {}: {};", view.name, status));
            }

            let severity = if failures > 0 {
                Severity::Critical
            } else {
                Severity::Ok
            };
            HealthResult::new(severity, message)
        }
        PipelineLayout::Legacy => {
            let failing = pipelines.iter().any(|view| {
                let succeeded = view
                    .last_reload_success_at
                    .or_else(|| placeholder(LEGACY_SUCCESS_PLACEHOLDER));
                let failed = view
                    .last_reload_failure_at
                    .or_else(|| placeholder(LEGACY_FAILURE_PLACEHOLDER));
                view.reload_failures > 0 && succeeded < failed
            });

            let severity = if failing {
                Severity::Critical
            } else {
                Severity::Ok
            };
            HealthResult::new(severity, "Config reload syntax check")
        }
    }
}

fn placeholder(date: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(date)
}

/// Event throughput per minute against the previous run.
///
/// Returns `None` when no bound is configured for `direction`. Pipelines
/// without a usable prior observation report `Initialized` and are OK.
pub fn events_per_minute(
    pipelines: &PipelineSet,
    state: &StateRecord,
    direction: EventDirection,
    threshold: &RangeThreshold,
    now: f64,
) -> Option<HealthResult> {
    if !threshold.is_set() {
        return None;
    }

    let mut message = format!("Events {} per minute:", direction);
    let mut severity = Severity::Ok;

    for view in pipelines.iter() {
        let throughput = state.events_per_minute(view, direction, now);
        if let Some(rate) = throughput.per_minute() {
            severity = severity.max(threshold.evaluate(rate));
        }
        match pipelines.layout {
            PipelineLayout::Named => message.push_str(&format!(" {}: {};", view.name, throughput)),
            PipelineLayout::Legacy => message.push_str(&format!(" {}", throughput)),
        }
    }

    Some(HealthResult::new(severity, message))
}

/// Node health indicator (`status`: green, yellow or red).
///
/// Versions before 7.0.0 report no status; a parsed response counts as
/// green there.
pub fn node_status(snapshot: &Snapshot) -> Result<HealthResult> {
    let status = reported_status(snapshot)?;
    let severity = match status.as_str() {
        "green" => Severity::Ok,
        "yellow" => Severity::Warning,
        "red" => Severity::Critical,
        other => {
            return Err(CheckError::InvalidField(format!(
                "status (unrecognised value {:?})",
                other
            )))
        }
    };
    Ok(HealthResult::new(severity, format!("Node status: {}", status)))
}

/// The node status as reported, or `green` where none is reported.
pub fn reported_status(snapshot: &Snapshot) -> Result<String> {
    match snapshot.get_optional("status") {
        Some(Value::String(status)) => Ok(status.trim().to_lowercase()),
        Some(_) => Err(CheckError::InvalidField("status".to_string())),
        None => {
            let version = match snapshot.get("version")? {
                Value::String(raw) => raw.parse::<ServiceVersion>()?,
                _ => return Err(CheckError::InvalidField("version".to_string())),
            };
            if version.reports_node_status() {
                Err(CheckError::InvalidField("status".to_string()))
            } else {
                Ok("green".to_string())
            }
        }
    }
}

/// Current queue backpressure per pipeline.
///
/// Returns `Ok(None)` when no bound is configured. A pipeline without flow
/// metrics is an [`CheckError::InvalidField`].
pub fn queue_backpressure(
    pipelines: &PipelineSet,
    threshold: &RangeThreshold,
) -> Result<Option<HealthResult>> {
    if !threshold.is_set() {
        return Ok(None);
    }

    let mut message = String::from("Queue backpressure:");
    let mut severity = Severity::Ok;
    for view in pipelines.iter() {
        let value = view.flow.queue_backpressure.ok_or_else(|| {
            let prefix = match pipelines.layout {
                PipelineLayout::Named => format!("pipelines.{}", view.name),
                PipelineLayout::Legacy => "pipeline".to_string(),
            };
            CheckError::InvalidField(format!("{}.flow.queue_backpressure.current", prefix))
        })?;
        severity = severity.max(threshold.evaluate_float(value));
        message.push_str(&format!(" {}: {:.2};", view.name, value));
    }

    Ok(Some(HealthResult::new(severity, message)))
}
