use std::io;
use thiserror::Error;

/// Error taxonomy for the ingestion pipeline.
///
/// Per-collector and per-batch failures are contained where they occur and
/// surface as log lines plus an error value; only `ConfigError` at the top
/// level and `StorageInitError` escalate to process exit.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to initialize storage: {0}")]
    StorageInitError(String),
    #[error("Unknown collector: {0}")]
    ResolutionError(String),
    #[error("Write failed: {0}")]
    WriteError(String),
    #[error("Observation failed: {0}")]
    ObservationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
