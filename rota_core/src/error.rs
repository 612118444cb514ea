//! Error types for the rota_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rota_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Schedule cannot be laid out on the calendar (bad start date, empty
    /// template, zero cycles). Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Schedule data disagrees with the reference tables
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Holiday table lookup failed
    #[error("Holiday provider error: {0}")]
    Provider(String),

    /// Application settings are inconsistent
    #[error("Settings error: {0}")]
    Settings(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
