//! # logstash-check
//!
//! A monitoring plugin and library for evaluating the health of a Logstash
//! node from its node stats API (`/_node/stats`).
//!
//! One invocation fetches a stats snapshot, compares selected metrics
//! against thresholds and reports a verdict in the Nagios/Icinga plugin
//! format: a summary line with performance data, one line per rule and an
//! exit status of 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌─────────────┐  │
//! │  │ source  │───▶│   data   │───▶│  health  │───▶│ report +    │  │
//! │  │ (fetch) │    │(snapshot,│    │ (rules,  │    │ perfdata    │  │
//! │  └─────────┘    │ pipelines)    │thresholds)    └─────────────┘  │
//! │                 └──────────┘    └────┬─────┘                     │
//! │                                      │ ▲                         │
//! │                                      ▼ │                         │
//! │                                 ┌──────────┐                     │
//! │                                 │  state   │ events per minute   │
//! │                                 └──────────┘                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: [`StatsSource`] trait with [`HttpSource`] for a live node
//!   and [`FileSource`] for a saved stats response
//! - **[`data`]**: [`Snapshot`] with dotted-path lookups, and [`PipelineSet`]
//!   which hides the difference between the single-pipeline (before 6.0.0)
//!   and named-pipeline stats shapes
//! - **[`health`]**: the rules, [`Thresholds`], [`HealthReport`] and perfdata
//! - **[`state`]**: per-endpoint counter file used to compute event rates
//!   across invocations
//! - **[`config`]**: layered [`Settings`] (defaults, file, environment, flags)
//!
//! ## Usage
//!
//! ### As a plugin
//!
//! ```bash
//! check_logstash -H 127.0.0.1 -p 9600 --inflight-events-crit 0:5000
//! check_logstash --pipeline beats --events-in-per-minute-warn 100:
//! ```
//!
//! ### As a library
//!
//! ```
//! use logstash_check::{evaluate, Snapshot, StateRecord, Thresholds};
//!
//! let stats = serde_json::json!({
//!     "version": "8.12.0",
//!     "process": { "open_file_descriptors": 96, "max_file_descriptors": 100,
//!                  "cpu": { "percent": 4 } },
//!     "jvm": { "threads": { "count": 40 },
//!              "mem": { "heap_used_percent": 20, "heap_used_in_bytes": 200,
//!                       "heap_max_in_bytes": 1000 } },
//!     "pipelines": {
//!         "main": { "events": { "in": 500, "out": 480 }, "reloads": { "failures": 0 } }
//!     }
//! });
//! let snapshot = Snapshot::new(stats.as_object().unwrap().clone());
//!
//! let evaluation = evaluate(&snapshot, &StateRecord::new(), &Thresholds::default()).unwrap();
//! assert_eq!(evaluation.exit_code(), 2);
//! println!("{}", evaluation.render());
//! ```

pub mod check;
pub mod config;
pub mod data;
pub mod error;
pub mod health;
pub mod source;
pub mod state;

// Re-export main types for convenience
pub use check::run_check;
pub use crate::config::Settings;
pub use data::{FlowMetrics, PipelineLayout, PipelineSet, PipelineView, ServiceVersion, Snapshot};
pub use error::{CheckError, Result, UNKNOWN_EXIT_CODE};
pub use health::{
    evaluate, Bounds, Evaluation, HealthReport, HealthResult, PercentThreshold, PerfdataList,
    RangeThreshold, Severity, Thresholds,
};
pub use source::{FileSource, HttpSource, StatsSource};
pub use state::{StateRecord, StateStore};
