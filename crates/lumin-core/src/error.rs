//! Error types for lumin operations.
//!
//! A single [`Error`] enum covers every failure mode the viewer core can
//! produce. The design rule (and the reason the enum is small) is that
//! nothing here is fatal: every failure degrades to "the image did not
//! change" plus an observable status the presentation layer can show.
//!
//! # Categories
//!
//! - **I/O / codec**: [`Decode`](Error::Decode), [`Encode`](Error::Encode),
//!   [`Io`](Error::Io)
//! - **Background execution**: [`TaskFailed`](Error::TaskFailed),
//!   [`Cancelled`](Error::Cancelled)
//! - **Invalid operations**: [`Busy`](Error::Busy),
//!   [`InvalidDimensions`](Error::InvalidDimensions)
//!
//! # Usage
//!
//! ```rust
//! use lumin_core::{Error, Result};
//!
//! fn check_edit_slot(in_flight: bool) -> Result<()> {
//!     if in_flight {
//!         return Err(Error::busy("an edit is already in flight"));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the lumin viewer core.
///
/// Uses [`thiserror`] for automatic [`std::error::Error`] and
/// [`std::fmt::Display`] implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// An image file could not be decoded.
    ///
    /// Surfaced by the codec collaborator on load. The image buffer is
    /// left null or unchanged.
    #[error("failed to decode '{path}': {reason}")]
    Decode {
        /// Path of the file that failed to decode.
        path: PathBuf,
        /// Codec-specific failure description.
        reason: String,
    },

    /// An image file could not be encoded.
    ///
    /// Surfaced by the codec collaborator on save. Saving never mutates
    /// the image, so there is nothing to roll back.
    #[error("failed to encode '{path}': {reason}")]
    Encode {
        /// Path of the file that failed to encode.
        path: PathBuf,
        /// Codec-specific failure description.
        reason: String,
    },

    /// A background edit task failed.
    ///
    /// The failure was captured on the worker thread and re-surfaced at
    /// retrieval time on the polling thread. The live buffer and the
    /// history are untouched.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// A background task was cancelled before completion.
    ///
    /// Cancellation is a no-op from the history's perspective.
    #[error("operation was cancelled")]
    Cancelled,

    /// An operation was rejected because another one is in flight.
    ///
    /// Returned by `asyncModify`-style entry points while an edit slot
    /// is occupied. The caller should retry after draining the slot.
    #[error("image is busy: {0}")]
    Busy(String),

    /// Buffer dimensions and data length are inconsistent.
    #[error("invalid dimensions: {width}x{height}x{channels} ({reason})")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Requested channel count.
        channels: u8,
        /// Why the dimensions are invalid.
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    ///
    /// Catch-all; prefer specific variants when possible.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::Decode`] error.
    #[inline]
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Encode`] error.
    #[inline]
    pub fn encode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Encode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::TaskFailed`] error.
    #[inline]
    pub fn task_failed(reason: impl Into<String>) -> Self {
        Self::TaskFailed(reason.into())
    }

    /// Creates an [`Error::Busy`] error.
    #[inline]
    pub fn busy(what: impl Into<String>) -> Self {
        Self::Busy(what.into())
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(
        width: u32,
        height: u32,
        channels: u8,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            channels,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` if this error came from the codec collaborator.
    #[inline]
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Encode { .. })
    }

    /// Returns `true` if this is a cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the operation was rejected as busy.
    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error() {
        let err = Error::decode("foo.exr", "bad magic");
        assert!(err.to_string().contains("foo.exr"));
        assert!(err.to_string().contains("bad magic"));
        assert!(err.is_codec_error());
        assert!(!err.is_busy());
    }

    #[test]
    fn test_busy_error() {
        let err = Error::busy("an edit is already in flight");
        assert!(err.is_busy());
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::task_failed("boom").is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }
}
