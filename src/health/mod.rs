//! Health evaluation of a Logstash node.
//!
//! [`evaluate`] runs every rule over one [`Snapshot`] and returns the
//! [`HealthReport`], the performance data line and the counters to persist
//! for the next run.
//!
//! Rules are evaluated in a fixed order:
//!
//! 1. open file descriptors
//! 2. heap usage
//! 3. inflight events
//! 4. configuration reloads
//! 5. CPU usage
//! 6. events in per minute (only when configured)
//! 7. events out per minute (only when configured)
//! 8. node status (only when enabled)
//! 9. queue backpressure (only when configured)

pub mod perfdata;
pub mod report;
pub mod rules;
pub mod severity;
pub mod threshold;

use serde_json::Value;
use tracing::debug;

pub use perfdata::{Perfdata, PerfdataList, Uom};
pub use report::HealthReport;
pub use severity::{HealthResult, Severity};
pub use threshold::{Bounds, PercentThreshold, RangeThreshold, Thresholds};

use crate::data::{render_value, PipelineLayout, PipelineSet, Snapshot};
use crate::error::Result;
use crate::state::{EventDirection, StateRecord};

/// Outcome of one evaluation run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: HealthReport,
    pub perfdata: PerfdataList,
    /// Counters to persist, present only when event rates are tracked.
    pub next_state: Option<StateRecord>,
}

impl Evaluation {
    /// Full plugin output.
    pub fn render(&self) -> String {
        self.report.render(&self.perfdata)
    }

    pub fn exit_code(&self) -> u8 {
        self.report.exit_code()
    }
}

/// Evaluate a snapshot against the thresholds and the prior state.
///
/// # Errors
///
/// Fails with [`CheckError::InvalidField`](crate::CheckError::InvalidField)
/// when a field a rule needs is missing or malformed.
pub fn evaluate(snapshot: &Snapshot, state: &StateRecord, thresholds: &Thresholds) -> Result<Evaluation> {
    let pipelines = PipelineSet::from_snapshot(snapshot)?;
    let now = snapshot.captured_at();
    debug!(
        layout = ?pipelines.layout,
        pipelines = pipelines.len(),
        "evaluating snapshot"
    );

    let mut report = HealthReport::default();
    report.push(rules::file_descriptors(snapshot, &thresholds.file_descriptors)?);
    report.push(rules::heap(snapshot, &thresholds.heap)?);
    report.push(rules::inflight_events(&pipelines, &thresholds.inflight_events));
    report.push(rules::config_reload(&pipelines));
    report.push(rules::cpu(snapshot, &thresholds.cpu)?);

    let rates = [
        (EventDirection::In, &thresholds.events_in_per_minute),
        (EventDirection::Out, &thresholds.events_out_per_minute),
    ];
    for (direction, threshold) in rates {
        if let Some(result) = rules::events_per_minute(&pipelines, state, direction, threshold, now) {
            report.push(result);
        }
    }

    if thresholds.node_status {
        report.push(rules::node_status(snapshot)?);
    }
    if let Some(result) = rules::queue_backpressure(&pipelines, &thresholds.queue_backpressure)? {
        report.push(result);
    }

    let perfdata = collect_perfdata(snapshot, &pipelines, state, thresholds)?;

    let next_state = thresholds
        .tracks_event_rates()
        .then(|| StateRecord::capture(&pipelines, now));

    debug!(status = %report.status(), rules = report.results().len(), "evaluation complete");

    Ok(Evaluation {
        report,
        perfdata,
        next_state,
    })
}

/// Build the performance data line.
fn collect_perfdata(
    snapshot: &Snapshot,
    pipelines: &PipelineSet,
    state: &StateRecord,
    thresholds: &Thresholds,
) -> Result<PerfdataList> {
    let mut list = PerfdataList::new();

    let raw = |path: &str| snapshot.get(path).map(render_value);

    if thresholds.node_status {
        list.push(Perfdata::text("status", rules::reported_status(snapshot)?));
    }

    list.push(
        Perfdata::metric("process.cpu.percent", raw("process.cpu.percent")?, Uom::Percent)
            .thresholds(thresholds.cpu.warning, thresholds.cpu.critical)
            .bounds(Some(0), Some(100)),
    );
    list.push(
        Perfdata::metric("jvm.mem.heap_used_percent", raw("jvm.mem.heap_used_percent")?, Uom::Percent)
            .thresholds(thresholds.heap.warning, thresholds.heap.critical)
            .bounds(Some(0), Some(100)),
    );
    list.push(
        Perfdata::metric("jvm.threads.count", raw("jvm.threads.count")?, Uom::None)
            .bounds(Some(0), None::<i64>),
    );

    let max_descriptors = snapshot.get("process.max_file_descriptors")?;
    let descriptors = |percent: Option<i64>| percent.map(|p| descriptor_count(max_descriptors, p));
    list.push(
        Perfdata::metric(
            "process.open_file_descriptors",
            raw("process.open_file_descriptors")?,
            Uom::None,
        )
        .thresholds(
            descriptors(thresholds.file_descriptors.warning),
            descriptors(thresholds.file_descriptors.critical),
        )
        .bounds(Some(0), Some(render_value(max_descriptors))),
    );

    let now = snapshot.captured_at();
    for view in pipelines.iter() {
        let (suffix, counter_prefix) = match pipelines.layout {
            PipelineLayout::Named => (format!("_{}", view.name), format!("pipelines.{}", view.name)),
            PipelineLayout::Legacy => (String::new(), "pipeline".to_string()),
        };

        let rates = [
            (EventDirection::In, &thresholds.events_in_per_minute),
            (EventDirection::Out, &thresholds.events_out_per_minute),
        ];
        for (direction, threshold) in rates {
            if !threshold.is_set() {
                continue;
            }
            if let Some(rate) = state.events_per_minute(view, direction, now).per_minute() {
                let label = format!("events_{}_per_minute{}", direction, suffix);
                list.push(Perfdata::derived(label, rate, threshold));
            }
        }

        for direction in [EventDirection::In, EventDirection::Out] {
            let label = format!("{}.events.{}", counter_prefix, direction);
            list.push(
                Perfdata::metric(label, direction.count(view), Uom::Counter)
                    .bounds(Some(0), None::<i64>),
            );
        }

        list.push(Perfdata::derived(
            format!("inflight_events{}", suffix),
            view.events_in - view.events_out,
            &thresholds.inflight_events,
        ));

        if thresholds.queue_backpressure.is_set() {
            let flow = &view.flow;
            if let Some(value) = flow.queue_backpressure {
                list.push(Perfdata::derived(
                    format!("pipelines.queue_backpressure_{}", view.name),
                    value,
                    &thresholds.queue_backpressure,
                ));
            }
            let throughputs = [
                ("input", flow.input_throughput),
                ("filter", flow.filter_throughput),
                ("output", flow.output_throughput),
            ];
            for (stage, value) in throughputs {
                if let Some(value) = value {
                    let label = format!("pipelines.{}.{}_throughput", view.name, stage);
                    list.push(Perfdata::metric(label, value, Uom::None));
                }
            }
        }
    }

    Ok(list)
}

/// Number of descriptors corresponding to `percent` of the limit.
///
/// An integral limit is divided by 100 before scaling, truncating.
fn descriptor_count(max: &Value, percent: i64) -> String {
    match max.as_i64() {
        Some(max) => (max / 100 * percent).to_string(),
        None => max
            .as_f64()
            .map(|max| (max / 100.0 * percent as f64).to_string())
            .unwrap_or_default(),
    }
}
