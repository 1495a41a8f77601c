//! Layered plugin settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional configuration file (any format the `config` crate reads)
//! 3. `CHECK_LOGSTASH_*` environment variables, e.g. `CHECK_LOGSTASH_BEARER`
//! 4. command line flags, applied by the caller as overrides
//!
//! Keys use the long flag names with `_` instead of `-`, so a TOML file
//! may contain:
//!
//! ```toml
//! hostname = "logstash.internal"
//! port = 9600
//! pipeline = "beats"
//! heap_usage_threshold_warn = 75
//! inflight_events_crit = "0:1000"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::health::{Bounds, PercentThreshold, RangeThreshold, Thresholds};
use crate::source::{parse_credentials, FileSource, HttpSource, StatsSource};
use crate::state::{StateStore, DEFAULT_STATE_DIR};

/// Prefix of the environment variables read by [`Settings::builder`].
pub const ENV_PREFIX: &str = "CHECK_LOGSTASH";

/// Resolved plugin settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub pipeline: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub bearer: Option<String>,
    /// Basic authentication as `user:password`.
    #[serde(default, alias = "basicauth")]
    pub user: Option<String>,
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// Client certificate and PKCS#8 key for mutual TLS.
    #[serde(default)]
    pub cert_file: Option<PathBuf>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub temp_filedir: PathBuf,
    /// Read the stats from this file instead of querying the node.
    #[serde(default)]
    pub file: Option<PathBuf>,

    pub file_descriptor_threshold_warn: Option<i64>,
    pub file_descriptor_threshold_crit: Option<i64>,
    pub heap_usage_threshold_warn: Option<i64>,
    pub heap_usage_threshold_crit: Option<i64>,
    #[serde(default)]
    pub cpu_usage_threshold_warn: Option<i64>,
    #[serde(default)]
    pub cpu_usage_threshold_crit: Option<i64>,

    #[serde(default)]
    pub inflight_events_warn: Option<String>,
    #[serde(default)]
    pub inflight_events_crit: Option<String>,
    #[serde(default)]
    pub events_in_per_minute_warn: Option<String>,
    #[serde(default)]
    pub events_in_per_minute_crit: Option<String>,
    #[serde(default)]
    pub events_out_per_minute_warn: Option<String>,
    #[serde(default)]
    pub events_out_per_minute_crit: Option<String>,
    #[serde(default)]
    pub queue_backpressure_warn: Option<String>,
    #[serde(default)]
    pub queue_backpressure_crit: Option<String>,
    /// Evaluate the node health status.
    #[serde(default)]
    pub node_status: bool,
}

impl Settings {
    /// Defaults, the optional file and the environment, ready for overrides.
    pub fn builder(config_file: Option<&Path>) -> Result<ConfigBuilder<DefaultState>> {
        layered(config_file, Environment::with_prefix(ENV_PREFIX))
    }

    /// Deserialize settings from a built configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        Ok(config.try_deserialize()?)
    }

    /// Load settings without command line overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::from_config(Self::builder(config_file)?.build()?)
    }

    /// Pipeline filter; an empty value means all pipelines.
    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref().filter(|name| !name.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Parse and validate all thresholds.
    ///
    /// # Errors
    ///
    /// [`CheckError::Configuration`](crate::CheckError::Configuration) for a
    /// malformed range or a percentage outside `0..=100`.
    pub fn thresholds(&self) -> Result<Thresholds> {
        let thresholds = Thresholds {
            file_descriptors: PercentThreshold::new(
                self.file_descriptor_threshold_warn,
                self.file_descriptor_threshold_crit,
            ),
            heap: PercentThreshold::new(self.heap_usage_threshold_warn, self.heap_usage_threshold_crit),
            cpu: PercentThreshold::new(self.cpu_usage_threshold_warn, self.cpu_usage_threshold_crit),
            inflight_events: range(&self.inflight_events_warn, &self.inflight_events_crit)?,
            events_in_per_minute: range(
                &self.events_in_per_minute_warn,
                &self.events_in_per_minute_crit,
            )?,
            events_out_per_minute: range(
                &self.events_out_per_minute_warn,
                &self.events_out_per_minute_crit,
            )?,
            queue_backpressure: range(&self.queue_backpressure_warn, &self.queue_backpressure_crit)?,
            node_status: self.node_status,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// State store of the monitored endpoint.
    pub fn state_store(&self) -> StateStore {
        StateStore::for_endpoint(&self.temp_filedir, &self.hostname, self.port, self.pipeline())
    }

    /// The stats source selected by these settings.
    pub fn source(&self) -> Result<Box<dyn StatsSource>> {
        if let Some(path) = &self.file {
            let source = FileSource::new(path).with_pipeline(self.pipeline().map(str::to_string));
            return Ok(Box::new(source));
        }

        let mut builder = HttpSource::builder()
            .hostname(&self.hostname)
            .port(self.port)
            .secure(self.secure)
            .insecure(self.insecure)
            .timeout(self.timeout());

        if let Some(token) = self.bearer.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.bearer(token);
        }
        if let Some(raw) = self.user.as_deref().filter(|u| !u.is_empty()) {
            let (user, password) = parse_credentials(raw)?;
            builder = builder.credentials(user, password);
        }
        if let Some(path) = &self.ca_file {
            builder = builder.ca_file(path);
        }
        if let Some(path) = &self.cert_file {
            builder = builder.cert_file(path);
        }
        if let Some(path) = &self.key_file {
            builder = builder.key_file(path);
        }
        if let Some(pipeline) = self.pipeline() {
            builder = builder.pipeline(pipeline);
        }

        Ok(Box::new(builder.build()?))
    }
}

fn layered(config_file: Option<&Path>, env: Environment) -> Result<ConfigBuilder<DefaultState>> {
    let mut builder = Config::builder()
        .set_default("hostname", "127.0.0.1")?
        .set_default("port", 9600)?
        .set_default("timeout", 30)?
        .set_default("temp_filedir", DEFAULT_STATE_DIR)?
        .set_default("file_descriptor_threshold_warn", 85)?
        .set_default("file_descriptor_threshold_crit", 95)?
        .set_default("heap_usage_threshold_warn", 70)?
        .set_default("heap_usage_threshold_crit", 80)?;

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    Ok(builder.add_source(env))
}

fn range(warning: &Option<String>, critical: &Option<String>) -> Result<RangeThreshold> {
    Ok(RangeThreshold::new(bounds(warning)?, bounds(critical)?))
}

fn bounds(raw: &Option<String>) -> Result<Bounds> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Bounds::default()),
        Some(value) => value.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use std::io::Write;
    use tempfile::Builder;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    fn settings(config_file: Option<&Path>, vars: &[(&str, &str)]) -> Settings {
        Settings::from_config(layered(config_file, env(vars)).unwrap().build().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let s = settings(None, &[]);
        assert_eq!(s.hostname, "127.0.0.1");
        assert_eq!(s.port, 9600);
        assert_eq!(s.timeout(), Duration::from_secs(30));
        assert_eq!(s.temp_filedir, PathBuf::from("/tmp/"));
        assert!(s.pipeline().is_none());
        assert!(!s.secure);

        let thresholds = s.thresholds().unwrap();
        assert_eq!(thresholds, Thresholds::default());
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let s = settings(
            None,
            &[
                ("CHECK_LOGSTASH_HOSTNAME", "logstash.local"),
                ("CHECK_LOGSTASH_PORT", "9601"),
                ("CHECK_LOGSTASH_BASICAUTH", "user:pass"),
                ("CHECK_LOGSTASH_HEAP_USAGE_THRESHOLD_WARN", "60"),
                ("CHECK_LOGSTASH_INFLIGHT_EVENTS_CRIT", "0:500"),
            ],
        );
        assert_eq!(s.hostname, "logstash.local");
        assert_eq!(s.port, 9601);
        assert_eq!(s.user.as_deref(), Some("user:pass"));

        let thresholds = s.thresholds().unwrap();
        assert_eq!(thresholds.heap, PercentThreshold::new(Some(60), Some(80)));
        assert_eq!(
            thresholds.inflight_events.critical,
            Bounds::new(Some(0), Some(500))
        );
    }

    #[test]
    fn test_file_then_environment() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "hostname = \"from-file\"\nport = 9700\npipeline = \"beats\"\nevents_in_per_minute_warn = \"10:\""
        )
        .unwrap();

        let s = settings(Some(file.path()), &[("CHECK_LOGSTASH_PORT", "9800")]);
        assert_eq!(s.hostname, "from-file");
        assert_eq!(s.port, 9800);
        assert_eq!(s.pipeline(), Some("beats"));
        assert!(s.thresholds().unwrap().tracks_event_rates());
        assert!(s
            .state_store()
            .path()
            .ends_with("check_logstash_from-file_9800_beats_events_state.tmp"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let builder = layered(None, env(&[("CHECK_LOGSTASH_HOSTNAME", "from-env")]))
            .unwrap()
            .set_override_option("hostname", Some("from-cli"))
            .unwrap()
            .set_override_option("port", None::<i64>)
            .unwrap();
        let s = Settings::from_config(builder.build().unwrap()).unwrap();
        assert_eq!(s.hostname, "from-cli");
        assert_eq!(s.port, 9600);
    }

    #[test]
    fn test_opt_in_checks() {
        let s = settings(
            None,
            &[
                ("CHECK_LOGSTASH_NODE_STATUS", "true"),
                ("CHECK_LOGSTASH_QUEUE_BACKPRESSURE_CRIT", "10"),
            ],
        );
        let thresholds = s.thresholds().unwrap();
        assert!(thresholds.node_status);
        assert_eq!(thresholds.queue_backpressure.critical, Bounds::new(None, Some(10)));
        assert!(!thresholds.tracks_event_rates());
    }

    #[test]
    fn test_missing_config_file() {
        let result = layered(Some(Path::new("/nonexistent/check_logstash.toml")), env(&[]))
            .unwrap()
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_thresholds() {
        let s = settings(None, &[("CHECK_LOGSTASH_FILE_DESCRIPTOR_THRESHOLD_CRIT", "101")]);
        match s.thresholds() {
            Err(CheckError::Configuration(message)) => {
                assert_eq!(message, "101 is not in range 0..100")
            }
            other => panic!("expected Configuration, got {:?}", other),
        }

        let s = settings(None, &[("CHECK_LOGSTASH_INFLIGHT_EVENTS_WARN", ":10")]);
        assert!(matches!(s.thresholds(), Err(CheckError::Configuration(_))));
    }

    #[test]
    fn test_invalid_credentials() {
        let s = settings(None, &[("CHECK_LOGSTASH_USER", "no-password")]);
        assert!(matches!(s.source(), Err(CheckError::Configuration(_))));
    }

    #[test]
    fn test_bearer_and_basic_auth_are_exclusive() {
        let s = settings(
            None,
            &[
                ("CHECK_LOGSTASH_BEARER", "token"),
                ("CHECK_LOGSTASH_USER", "user:pass"),
            ],
        );
        assert!(matches!(s.source(), Err(CheckError::Configuration(_))));

        let s = settings(None, &[("CHECK_LOGSTASH_BEARER", "token")]);
        assert!(s.source().is_ok());
    }

    #[test]
    fn test_client_certificate_without_key() {
        let s = settings(None, &[("CHECK_LOGSTASH_CERT_FILE", "/etc/ssl/client.pem")]);
        assert!(matches!(s.source(), Err(CheckError::Configuration(_))));
    }

    #[test]
    fn test_source_selection() {
        let s = settings(None, &[("CHECK_LOGSTASH_SECURE", "true")]);
        assert_eq!(
            s.source().unwrap().description(),
            "http: https://127.0.0.1:9600/_node/stats"
        );

        let s = settings(None, &[("CHECK_LOGSTASH_FILE", "/tmp/stats.json")]);
        assert_eq!(s.source().unwrap().description(), "file: /tmp/stats.json");
    }
}
