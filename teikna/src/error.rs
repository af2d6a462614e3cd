//! Error type shared by all glyph operations.

use core::fmt;

use skrifa::{outline::DrawError, raw::ReadError};

/// Errors that may occur when extracting or rasterizing glyphs.
///
/// None of these abort a whole document render: they fail a single glyph or
/// glyph run operation and the host is expected to fall back to a generic
/// painting path.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// The operation or font feature is not available in the current
    /// environment.
    ///
    /// This is an expected outcome. The rasterizer treats it as a signal to
    /// retry with the legacy backend and a missing font table is reported
    /// this way as well.
    Unsupported,
    /// Font resolution produced no face, or a face of the wrong backend type.
    FontTypeMismatch,
    /// An allocation or render target creation failed.
    NoMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "operation is not supported in this environment"),
            Self::FontTypeMismatch => write!(f, "no font face of the expected type was found"),
            Self::NoMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for Error {}

impl From<DrawError> for Error {
    fn from(value: DrawError) -> Self {
        match value {
            DrawError::InsufficientMemory => Self::NoMemory,
            _ => Self::Unsupported,
        }
    }
}

impl From<ReadError> for Error {
    fn from(_: ReadError) -> Self {
        Self::Unsupported
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::NoMemory
    }
}
