//! Error types for the panel.

use std::path::PathBuf;

use rasterman_core::CoreError;
use rasterman_render::{FilterError, RenderError};
use thiserror::Error;

/// Errors from configuring or driving the panel.
#[derive(Error, Debug)]
pub enum PanelError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A coalescer could not be built.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A filter identifier or value was rejected.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The rendering engine failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A host message was not valid JSON for the protocol.
    #[error("malformed host message: {0}")]
    Message(#[from] serde_json::Error),

    /// The host transport refused a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// Export was requested with no image bound.
    #[error("no image is bound")]
    NoImage,
}

/// Result type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;
