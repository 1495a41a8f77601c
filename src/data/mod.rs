//! Data models for node stats snapshots.
//!
//! This module turns the raw stats payload into structured data the health
//! rules can evaluate.
//!
//! ## Submodules
//!
//! - [`snapshot`]: The immutable [`Snapshot`] and the dotted-path [`lookup`]
//! - [`version`]: Service version parsing used to detect the payload shape
//! - [`pipeline`]: Normalized [`PipelineView`]s for both payload shapes
//!
//! ## Data Flow
//!
//! ```text
//! Stats JSON
//!        │
//!        ▼
//! Snapshot::new()
//!        │
//!        ├──▶ process / jvm metrics (read by path)
//!        │
//!        └──▶ PipelineSet::from_snapshot() ──▶ PipelineView per pipeline
//! ```

pub mod pipeline;
pub mod snapshot;
pub mod version;

pub use pipeline::{
    FlowMetrics, PipelineLayout, PipelineSet, PipelineView, LEGACY_PIPELINE, MONITORING_PIPELINE,
};
pub use snapshot::{as_float, as_integer, lookup, render_value, Fields, Snapshot};
pub use version::ServiceVersion;
