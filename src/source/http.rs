//! Stats source backed by the Logstash monitoring API.
//!
//! Queries `GET /_node/stats` on the node's API port (9600 by default).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use logstash_check::{HttpSource, StatsSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpSource::builder()
//!         .hostname("logstash.internal")
//!         .port(9600)
//!         .secure(true)
//!         .bearer("my-token")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let snapshot = source.fetch().await?;
//!     println!("version {}", snapshot.get("version")?);
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, StatusCode};
use tracing::{debug, info};

use super::{parse_stats, StatsSource};
use crate::data::Snapshot;
use crate::error::{CheckError, Result};

/// Request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_HOSTNAME: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9600;

/// Split a `user:password` pair.
///
/// The value must contain exactly one `:`.
pub fn parse_credentials(raw: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [user, password] => Ok((user.to_string(), password.to_string())),
        _ => Err(CheckError::Configuration(
            "Specify the user name and password for server authentication <user:password>"
                .to_string(),
        )),
    }
}

/// Source querying a live node over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    description: String,
    bearer: Option<String>,
    credentials: Option<(String, String)>,
    pipeline: Option<String>,
}

impl HttpSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// The stats URL queried by this source.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatsSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot> {
        debug!(url = %self.url, "requesting node stats");

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CheckError::Fetch(format!(
                "Got HTTP response {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let data = parse_stats(&body, self.pipeline.as_deref())?;
        info!(url = %self.url, bytes = body.len(), "fetched node stats");
        Ok(Snapshot::new(data))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    hostname: Option<String>,
    port: Option<u16>,
    secure: bool,
    insecure: bool,
    bearer: Option<String>,
    credentials: Option<(String, String)>,
    ca_file: Option<PathBuf>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    timeout: Option<Duration>,
    pipeline: Option<String>,
}

impl HttpSourceBuilder {
    /// Set the node hostname (default: 127.0.0.1).
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the API port (default: 9600).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Use HTTPS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Skip verification of the server certificate.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Trust the PEM certificates in this file in addition to the system roots.
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Present this PEM certificate to the server (mutual TLS).
    pub fn cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(path.into());
        self
    }

    /// PKCS#8 PEM private key of the client certificate.
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Set the request timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Only keep this pipeline of the stats.
    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    /// Build the source.
    ///
    /// # Errors
    ///
    /// [`CheckError::Configuration`] when both a bearer token and basic
    /// credentials are set, when only one of client certificate and key is
    /// given, when a certificate file cannot be read or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<HttpSource> {
        if self.bearer.is_some() && self.credentials.is_some() {
            return Err(CheckError::Configuration(
                "Specify either a bearer token or a user name and password, not both".to_string(),
            ));
        }

        let scheme = if self.secure { "https" } else { "http" };
        let hostname = self.hostname.unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let port = self.port.unwrap_or(DEFAULT_PORT);
        let url = format!("{}://{}:{}/_node/stats", scheme, hostname, port);

        let mut client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .danger_accept_invalid_certs(self.insecure);

        if let Some(path) = &self.ca_file {
            let pem = read_pem(path, "CA file")?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                CheckError::Configuration(format!(
                    "Invalid CA file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            client = client.add_root_certificate(certificate);
        }

        match (&self.cert_file, &self.key_file) {
            (Some(cert), Some(key)) => {
                let pem = read_pem(cert, "client certificate")?;
                let key_pem = read_pem(key, "client key")?;
                let identity = Identity::from_pkcs8_pem(&pem, &key_pem).map_err(|e| {
                    CheckError::Configuration(format!(
                        "Invalid client certificate {}: {}",
                        cert.display(),
                        e
                    ))
                })?;
                client = client.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(CheckError::Configuration(
                    "Specify both the client certificate and its key".to_string(),
                ))
            }
        }

        let client = client
            .build()
            .map_err(|e| CheckError::Configuration(format!("Can not create HTTP client: {}", e)))?;

        Ok(HttpSource {
            client,
            description: format!("http: {}", url),
            url,
            bearer: self.bearer,
            credentials: self.credentials,
            pipeline: self.pipeline,
        })
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        CheckError::Configuration(format!("Can not read {} {}: {}", what, path.display(), e))
    })
}
