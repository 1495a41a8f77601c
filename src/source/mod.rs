//! Sources of node stats snapshots.
//!
//! A [`StatsSource`] produces one [`Snapshot`] per call. [`HttpSource`] queries
//! a live node's `/_node/stats` endpoint; [`FileSource`] reads a saved copy of
//! that response, which is handy for offline checks and tests.

mod file;
mod http;

pub use file::FileSource;
pub use http::{parse_credentials, HttpSource, HttpSourceBuilder, DEFAULT_TIMEOUT};

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::data::{Fields, Snapshot};
use crate::error::{CheckError, Result};

/// Trait for retrieving node stats.
///
/// # Example
///
/// ```no_run
/// use logstash_check::{FileSource, StatsSource};
///
/// # tokio_test::block_on(async {
/// let source = FileSource::new("node_stats.json");
/// let snapshot = source.fetch().await.unwrap();
/// println!("Logstash {}", snapshot.get("version").unwrap());
/// # });
/// ```
#[async_trait]
pub trait StatsSource: Send + Sync + Debug {
    /// Retrieve one snapshot, stamped with the local capture time.
    async fn fetch(&self) -> Result<Snapshot>;

    /// Returns a human-readable description of the source.
    ///
    /// Used in log output.
    fn description(&self) -> &str;
}

/// Decode a stats response body and apply the optional pipeline filter.
pub(crate) fn parse_stats(body: &str, pipeline: Option<&str>) -> Result<Fields> {
    let mut data = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(CheckError::Fetch(
                "Failed parsing JSON response. Expected an object".to_string(),
            ))
        }
        Err(e) => {
            return Err(CheckError::Fetch(format!(
                "Failed parsing JSON response. {}",
                e
            )))
        }
    };

    if let Some(name) = pipeline {
        filter_pipeline(&mut data, name)?;
    }
    Ok(data)
}

/// Keep only the named pipeline in the `pipelines` section.
///
/// # Errors
///
/// [`CheckError::Fetch`] when the stats have no `pipelines` section or the
/// pipeline is not among them.
pub fn filter_pipeline(data: &mut Fields, name: &str) -> Result<()> {
    let pipelines = match data.get_mut("pipelines") {
        Some(Value::Object(pipelines)) => pipelines,
        _ => {
            return Err(CheckError::Fetch(
                "Failed parsing JSON response. No pipelines section".to_string(),
            ))
        }
    };

    pipelines.retain(|key, _| key == name);
    if pipelines.is_empty() {
        return Err(CheckError::Fetch(format!("Pipeline not found: {}", name)));
    }
    Ok(())
}
