//! Error types for the txt-study-rust library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the txt-study-rust application.
#[derive(Error, Debug)]
pub enum TxtStudyError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid participant record ID
    #[error("Invalid record ID: {0}")]
    InvalidRecordId(String),

    /// Required column missing from the input table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Invalid configuration or a violated collaborator contract
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Entity detection collaborator failed
    #[error("Entity detection error: {0}")]
    Detection(String),

    /// Output file already exists
    #[error("Output file already exists: {0}")]
    FileExists(PathBuf),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with TxtStudyError
pub type Result<T> = std::result::Result<T, TxtStudyError>;

impl From<anyhow::Error> for TxtStudyError {
    fn from(err: anyhow::Error) -> Self {
        TxtStudyError::Other(err.to_string())
    }
}
