//! Error types for the health evaluation.
//!
//! Every variant is fatal for the current invocation and maps to the
//! plugin's UNKNOWN exit status.

use thiserror::Error;

/// Exit status reported for any evaluation error.
pub const UNKNOWN_EXIT_CODE: u8 = 3;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CheckError>;

/// Errors that abort a health evaluation.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A metric path is absent from the snapshot (unsupported version or shape).
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// The stats could not be retrieved or decoded.
    #[error("{0}")]
    Fetch(String),

    /// The persisted event state could not be read or written.
    #[error("State file error: {0}")]
    StateIo(String),

    /// A threshold or connection setting is malformed or out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CheckError {
    /// Exit status for this error.
    pub fn exit_code(&self) -> u8 {
        UNKNOWN_EXIT_CODE
    }
}

impl From<reqwest::Error> for CheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CheckError::Fetch("Request to Logstash timed out".to_string())
        } else if err.is_connect() {
            CheckError::Fetch(format!("Can not connect to Logstash: {}", err))
        } else if err.is_decode() {
            CheckError::Fetch(format!("Failed parsing JSON response. {}", err))
        } else {
            CheckError::Fetch(format!("HTTP request failed: {}", err))
        }
    }
}

impl From<config::ConfigError> for CheckError {
    fn from(err: config::ConfigError) -> Self {
        CheckError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_is_unknown() {
        let errors = [
            CheckError::InvalidField("process.cpu.percent".to_string()),
            CheckError::Fetch("Got HTTP response 500".to_string()),
            CheckError::StateIo("permission denied".to_string()),
            CheckError::Configuration("101 is not in range 0..100".to_string()),
        ];

        for err in &errors {
            assert_eq!(err.exit_code(), 3);
        }
    }

    #[test]
    fn test_display_names_the_field() {
        let err = CheckError::InvalidField("jvm.mem.heap_used_percent".to_string());
        assert_eq!(err.to_string(), "Invalid field: jvm.mem.heap_used_percent");
    }
}
