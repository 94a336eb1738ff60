//! Error types for the filter model and rendering.

use thiserror::Error;

use crate::filter::FilterKind;

/// Errors building a filter from panel input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The identifier names no configured filter slot.
    #[error("unknown filter kind: {0:?}")]
    UnknownKind(String),

    /// A color-valued filter received something that is not a color.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// The value's shape does not fit the filter kind.
    #[error("filter {kind} expects a {expected} value")]
    ValueMismatch {
        /// The filter being built.
        kind: FilterKind,
        /// What the filter accepts.
        expected: &'static str,
    },
}

/// Errors raised by a rendering engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Filter construction failed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A slot index outside the fixed filter table.
    #[error("filter slot {slot} out of range (table has {len} slots)")]
    SlotOutOfRange {
        /// The requested slot.
        slot: usize,
        /// Number of slots in the table.
        len: usize,
    },

    /// Image decoding failed.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// Image encoding failed.
    #[error("image encode error: {0}")]
    ImageEncode(String),

    /// Zero-sized canvas.
    #[error("invalid canvas dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
