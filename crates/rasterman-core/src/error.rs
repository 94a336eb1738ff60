//! Error types for Rasterman core.

use std::time::Duration;

use thiserror::Error;

/// The main error type for core operations.
///
/// Scheduling itself never fails: cancelling an idle coalescer or firing
/// into a torn-down one is a no-op, not an error. Errors only arise when a
/// coalescer is built from an unusable configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Debounce configuration is invalid.
    #[error("invalid debounce configuration: {0}")]
    Debounce(#[from] DebounceError),
}

/// Debounce configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebounceError {
    /// The maximum wait must be at least the settling window.
    #[error("max wait {max_wait:?} is shorter than the settling window {wait:?}")]
    MaxWaitShorterThanWait {
        /// The configured settling window.
        wait: Duration,
        /// The configured maximum wait.
        max_wait: Duration,
    },
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
