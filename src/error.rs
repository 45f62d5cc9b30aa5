//! Error types for traffic-cusum.
//!
//! Only configuration and construction can fail. Stepping, thresholding and
//! detection never return errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of its valid domain
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The earliest attack start lands inside the warm-up window
    #[error("Attack may start at sample {start}, before warm-up ends at sample {warmup}")]
    AttackBeforeWarmup { start: usize, warmup: usize },

    /// The traffic distribution could not be built from the configured parameters
    #[error("Traffic distribution error: {0}")]
    Distribution(String),

    /// A replayed trace has no samples
    #[error("Empty trace: {0}")]
    EmptyTrace(String),

    /// A replayed trace was recorded at a different rate than the session expects
    #[error("Trace sampled at {trace} Hz, configuration expects {config} Hz")]
    SampleRateMismatch { trace: u32, config: u32 },

    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for traffic-cusum operations.
pub type Result<T> = std::result::Result<T, Error>;
