//! File-based stats source.
//!
//! Reads a saved `/_node/stats` response, e.g. one captured with
//! `curl -s localhost:9600/_node/stats > stats.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{parse_stats, StatsSource};
use crate::data::Snapshot;
use crate::error::{CheckError, Result};

/// A source that reads node stats from a JSON file.
///
/// The capture time of each snapshot is the time the file was read.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    pipeline: Option<String>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            pipeline: None,
        }
    }

    /// Only keep the given pipeline of the stats.
    pub fn with_pipeline(mut self, pipeline: Option<String>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatsSource for FileSource {
    async fn fetch(&self) -> Result<Snapshot> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CheckError::Fetch(format!(
                "Can not read stats from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let data = parse_stats(&content, self.pipeline.as_deref())?;
        debug!(source = %self.description, "read stats");
        Ok(Snapshot::new(data))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "version": "7.17.0",
            "pipelines": {
                "main": { "events": { "in": 100, "out": 90 } },
                "beats": { "events": { "in": 5, "out": 5 } }
            }
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/stats.json");
        assert_eq!(source.path(), Path::new("/tmp/stats.json"));
        assert_eq!(source.description(), "file: /tmp/stats.json");
    }

    #[tokio::test]
    async fn test_file_source_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let source = FileSource::new(file.path());
        let snapshot = source.fetch().await.unwrap();
        assert_eq!(snapshot.get_i64("pipelines.main.events.in").unwrap(), 100);
        assert!(snapshot.captured_at() > 0.0);
    }

    #[tokio::test]
    async fn test_file_source_applies_pipeline_filter() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let source = FileSource::new(file.path()).with_pipeline(Some("beats".to_string()));
        let snapshot = source.fetch().await.unwrap();
        assert!(snapshot.get_optional("pipelines.main").is_none());
        assert!(snapshot.get_optional("pipelines.beats").is_some());

        let missing = FileSource::new(file.path()).with_pipeline(Some("other".to_string()));
        assert!(matches!(
            missing.fetch().await,
            Err(CheckError::Fetch(message)) if message == "Pipeline not found: other"
        ));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileSource::new("/nonexistent/path/stats.json");
        match source.fetch().await {
            Err(CheckError::Fetch(message)) => assert!(message.contains("Can not read stats")),
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let source = FileSource::new(file.path());
        match source.fetch().await {
            Err(CheckError::Fetch(message)) => {
                assert!(message.starts_with("Failed parsing JSON response."))
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }
}
