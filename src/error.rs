//! Error types for ratemeter.

use thiserror::Error;

/// Main error type for ratemeter operations.
///
/// Meters themselves never fail; these cover the registry, configuration
/// and reporting around them.
#[derive(Error, Debug)]
pub enum MeterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A meter with this name already exists
    #[error("Meter already registered: {0}")]
    AlreadyRegistered(String),

    /// Report serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ratemeter operations.
pub type Result<T> = std::result::Result<T, MeterError>;
