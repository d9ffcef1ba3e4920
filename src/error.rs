//! Error types for enclosed region selection.
//!
//! The selection algorithms themselves never fail: degenerate input yields an
//! empty mask. Errors only come from building rasters, masks and options out
//! of caller supplied buffers and strings.

use thiserror::Error;

/// Errors raised while constructing inputs for the selection engine
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel buffer has a channel count the colour space cannot interpret
    #[error("invalid channel count: expected {expected}, got {actual}")]
    InvalidChannels { expected: usize, actual: usize },

    /// Buffer length does not match the declared dimensions
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Option value outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Region selection method name not recognised
    #[error("unknown region selection method: {0}")]
    UnknownMethod(String),
}

/// Result type for enclosed region selection
pub type Result<T> = std::result::Result<T, Error>;
