//! Error types for graph consolidation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Extraction of unit '{unit}' timed out after {timeout_ms} ms")]
    ExtractionTimeout { unit: String, timeout_ms: u64 },

    #[error("Extraction of unit '{unit}' failed: {reason}")]
    ExtractionFailed { unit: String, reason: String },

    #[error("Extraction task panicked or was cancelled: {0}")]
    TaskJoinError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Unit id for per-unit extraction failures.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Error::ExtractionTimeout { unit, .. } | Error::ExtractionFailed { unit, .. } => {
                Some(unit)
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ExtractionTimeout { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskJoinError(err.to_string())
    }
}
