use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use config::builder::DefaultState;
use config::ConfigBuilder;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use logstash_check::{run_check, CheckError, Settings, UNKNOWN_EXIT_CODE};

#[derive(Parser, Debug)]
#[command(name = "check_logstash", version)]
#[command(about = "Check the health of a Logstash node through its node stats API")]
struct Args {
    /// Logstash host [default: 127.0.0.1]
    #[arg(short = 'H', long)]
    hostname: Option<String>,

    /// Logstash API port [default: 9600]
    #[arg(short, long)]
    port: Option<u16>,

    /// Only check this pipeline
    #[arg(short = 'P', long)]
    pipeline: Option<String>,

    /// Use HTTPS instead of HTTP
    #[arg(short, long)]
    secure: bool,

    /// Skip the verification of the server's TLS certificate
    #[arg(short, long)]
    insecure: bool,

    /// Bearer token for server authentication
    #[arg(short, long)]
    bearer: Option<String>,

    /// User name and password for server authentication <user:password>
    #[arg(short, long)]
    user: Option<String>,

    /// CA file for TLS verification
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Client certificate for mutual TLS (PEM)
    #[arg(long)]
    cert_file: Option<PathBuf>,

    /// Private key of the client certificate (PKCS#8 PEM)
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Request timeout in seconds [default: 30]
    #[arg(short, long)]
    timeout: Option<u32>,

    /// Directory for the events state file [default: /tmp/]
    #[arg(long)]
    temp_filedir: Option<PathBuf>,

    /// Read the stats from a saved JSON file instead of the API
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Configuration file (TOML, YAML, JSON, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log to stderr; repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Percentage of the file descriptor limit for a warning [default: 85]
    #[arg(long)]
    file_descriptor_threshold_warn: Option<i64>,

    /// Percentage of the file descriptor limit for a critical result [default: 95]
    #[arg(long)]
    file_descriptor_threshold_crit: Option<i64>,

    /// Heap usage percentage for a warning [default: 70]
    #[arg(long)]
    heap_usage_threshold_warn: Option<i64>,

    /// Heap usage percentage for a critical result [default: 80]
    #[arg(long)]
    heap_usage_threshold_crit: Option<i64>,

    /// CPU usage percentage for a warning
    #[arg(long)]
    cpu_usage_threshold_warn: Option<i64>,

    /// CPU usage percentage for a critical result
    #[arg(long)]
    cpu_usage_threshold_crit: Option<i64>,

    /// Inflight events range for a warning (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    inflight_events_warn: Option<String>,

    /// Inflight events range for a critical result (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    inflight_events_crit: Option<String>,

    /// Events in per minute range for a warning (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    events_in_per_minute_warn: Option<String>,

    /// Events in per minute range for a critical result (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    events_in_per_minute_crit: Option<String>,

    /// Events out per minute range for a warning (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    events_out_per_minute_warn: Option<String>,

    /// Events out per minute range for a critical result (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    events_out_per_minute_crit: Option<String>,

    /// Queue backpressure range for a warning (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    queue_backpressure_warn: Option<String>,

    /// Queue backpressure range for a critical result (max, min: or min:max)
    #[arg(long, allow_hyphen_values = true)]
    queue_backpressure_crit: Option<String>,

    /// Also evaluate the node status (green, yellow, red)
    #[arg(long)]
    node_status: bool,
}

impl Args {
    /// Layer the given flags over the file and environment settings.
    fn apply(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());

        builder
            .set_override_option("hostname", self.hostname.clone())?
            .set_override_option("port", self.port.map(i64::from))?
            .set_override_option("pipeline", self.pipeline.clone())?
            .set_override_option("secure", self.secure.then_some(true))?
            .set_override_option("insecure", self.insecure.then_some(true))?
            .set_override_option("bearer", self.bearer.clone())?
            .set_override_option("user", self.user.clone())?
            .set_override_option("ca_file", path(&self.ca_file))?
            .set_override_option("cert_file", path(&self.cert_file))?
            .set_override_option("key_file", path(&self.key_file))?
            .set_override_option("timeout", self.timeout.map(i64::from))?
            .set_override_option("temp_filedir", path(&self.temp_filedir))?
            .set_override_option("file", path(&self.file))?
            .set_override_option("file_descriptor_threshold_warn", self.file_descriptor_threshold_warn)?
            .set_override_option("file_descriptor_threshold_crit", self.file_descriptor_threshold_crit)?
            .set_override_option("heap_usage_threshold_warn", self.heap_usage_threshold_warn)?
            .set_override_option("heap_usage_threshold_crit", self.heap_usage_threshold_crit)?
            .set_override_option("cpu_usage_threshold_warn", self.cpu_usage_threshold_warn)?
            .set_override_option("cpu_usage_threshold_crit", self.cpu_usage_threshold_crit)?
            .set_override_option("inflight_events_warn", self.inflight_events_warn.clone())?
            .set_override_option("inflight_events_crit", self.inflight_events_crit.clone())?
            .set_override_option("events_in_per_minute_warn", self.events_in_per_minute_warn.clone())?
            .set_override_option("events_in_per_minute_crit", self.events_in_per_minute_crit.clone())?
            .set_override_option("events_out_per_minute_warn", self.events_out_per_minute_warn.clone())?
            .set_override_option("events_out_per_minute_crit", self.events_out_per_minute_crit.clone())?
            .set_override_option("queue_backpressure_warn", self.queue_backpressure_warn.clone())?
            .set_override_option("queue_backpressure_crit", self.queue_backpressure_crit.clone())?
            .set_override_option("node_status", self.node_status.then_some(true))
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version are not errors
            let code = if err.use_stderr() { UNKNOWN_EXIT_CODE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            println!("UNKNOWN - {:#}", err);
            ExitCode::from(UNKNOWN_EXIT_CODE)
        }
    }
}

/// Log to stderr; stdout carries the plugin output.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one check and return the plugin exit status.
fn run(args: &Args) -> Result<u8> {
    let builder = Settings::builder(args.config.as_deref())?;
    let config = args
        .apply(builder)
        .and_then(|builder| builder.build())
        .map_err(CheckError::from)?;
    let settings = Settings::from_config(config)?;
    debug!(
        hostname = %settings.hostname,
        port = settings.port,
        pipeline = ?settings.pipeline(),
        "settings loaded"
    );

    // Thresholds are validated before anything is fetched.
    let thresholds = settings.thresholds()?;
    let source = settings.source()?;
    let store = thresholds
        .tracks_event_rates()
        .then(|| settings.state_store());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Can not start async runtime")?;

    let evaluation = runtime.block_on(run_check(source.as_ref(), store.as_ref(), &thresholds))?;

    print!("{}", evaluation.render());
    Ok(evaluation.exit_code())
}
