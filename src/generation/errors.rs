//! Error types for plan generation
//!
//! Every failure kind except [`GenerateError::Cleanup`] aborts the whole run.

use std::time::Duration;

/// Convenience alias for Result with `GenerateError`
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Error types for a generation run
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// An operation exceeded its deadline
    #[error("TIMEOUT: {label} exceeded {duration:?} limit (waited {elapsed:?})")]
    Timeout {
        label: String,
        duration: Duration,
        elapsed: Duration,
    },

    /// Every tab is leased and none may be opened
    #[error("Tab pool exhausted. Maximum {capacity} tabs in use.")]
    PoolExhausted { capacity: usize },

    /// Resident memory is above the configured ceiling
    #[error(
        "Memory limit exceeded: {rss_mib}MB > {limit_mib}MB. Consider reducing parallel operations or increasing memory limit."
    )]
    ResourceExhausted { rss_mib: u64, limit_mib: u64 },

    /// Anything raised while a collector interacted with its pages
    #[error("{collector} collector failed: {source:#}")]
    Collector {
        collector: String,
        #[source]
        source: anyhow::Error,
    },

    /// Returning, disposing or tearing down browser resources failed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// Invalid generation configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Automation engine failure outside of any collector
    #[error("Browser error: {0:#}")]
    Engine(#[source] anyhow::Error),

    /// The run was interrupted by a termination request
    #[error("Generation aborted by {signal}")]
    Aborted { signal: String },

    /// Plan output could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Plan output could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GenerateError {
    /// Wrap an error raised inside a collector's page interaction
    pub fn collector(collector: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Collector {
            collector: collector.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Cleanup failures are logged and swallowed; nothing else is.
    #[must_use]
    pub fn is_cleanup(&self) -> bool {
        matches!(self, Self::Cleanup(_))
    }
}
