//! Codec collaborator interface.
//!
//! File-format internals are out of scope for this crate; loading and
//! saving delegate to an [`ImageCodec`] implementation supplied by the
//! application. The trait is deliberately small: decode a path into an
//! [`ImageBuffer`], or encode a buffer to a path with the tone-mapping
//! parameters in [`SaveOptions`].

use std::path::Path;

use lumin_core::{ImageBuffer, Result};
use serde::{Deserialize, Serialize};

/// Tone-mapping parameters applied by the codec on export.
///
/// These only affect saving to display-referred formats; HDR formats
/// typically store the buffer as-is (up to `gain`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Multiplier applied to all pixel values before encoding.
    pub gain: f32,
    /// Gamma for tone mapping when `srgb` is false.
    pub gamma: f32,
    /// Use the sRGB transfer curve instead of plain gamma.
    pub srgb: bool,
    /// Dither when quantizing down to 8-bit, to reduce banding.
    pub dither: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            gain: 1.0,
            gamma: 2.2,
            srgb: true,
            dither: true,
        }
    }
}

/// Decodes and encodes image files.
///
/// Implementations are expected to map their format-specific failures
/// into [`lumin_core::Error::Decode`] / [`lumin_core::Error::Encode`].
pub trait ImageCodec {
    /// Decodes the file at `path` into a buffer.
    ///
    /// # Errors
    ///
    /// [`lumin_core::Error::Decode`] on I/O or format failure.
    fn decode(&self, path: &Path) -> Result<ImageBuffer>;

    /// Encodes `image` to `path`, tone-mapped per `opts`.
    ///
    /// Pure read: never mutates the buffer.
    ///
    /// # Errors
    ///
    /// [`lumin_core::Error::Encode`] on I/O or format failure.
    fn encode(&self, path: &Path, image: &ImageBuffer, opts: &SaveOptions) -> Result<()>;
}
