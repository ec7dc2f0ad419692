//! Error types for the Pulsetrail Tracker.
//!
//! Only construction-time failures ever reach the host application. Errors
//! produced while capturing or delivering events are logged at debug level
//! and dropped inside the tracker's event loop.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during tracker operations.
///
/// # Examples
///
/// ```ignore
/// use pulsetrail_tracker::error::TrackerError;
///
/// fn build_body(event: &Event) -> Result<serde_json::Value, TrackerError> {
///     Ok(serde_json::to_value(event)?)
/// }
/// ```
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization error while building a payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tracker's event loop is no longer running.
    #[error("tracker event loop has stopped")]
    Stopped,
}

/// A specialized `Result` type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
