//! The owned HDR pixel buffer.
//!
//! [`ImageBuffer`] stores channel-interleaved f32 samples in row-major
//! order, top-to-bottom:
//!
//! ```text
//! Memory: [R G B R G B R G B ...]  <- Row 0
//!         [R G B R G B R G B ...]  <- Row 1
//!         ...
//! ```
//!
//! Width, height, and channel count are fixed at creation; an image is
//! "resized" only by being replaced with a new buffer. This is what the
//! editing pipeline relies on: background tasks produce fresh buffers
//! from snapshots, and the owning thread swaps them in.
//!
//! # Usage
//!
//! ```rust
//! use lumin_core::ImageBuffer;
//!
//! let mut img = ImageBuffer::new(640, 480, 3);
//! img.set_pixel(10, 20, &[1.0, 0.5, 0.25]);
//! assert_eq!(img.pixel(10, 20), &[1.0, 0.5, 0.25]);
//! ```

use crate::{Error, Result};

/// Owned HDR image buffer: interleaved f32 samples, row-major.
///
/// Values are scene-linear and unbounded (HDR); nothing in this type
/// clamps. A null buffer (zero area, zero channels) is a valid terminal
/// state, used e.g. after a failed load.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    data: Vec<f32>,
    width: u32,
    height: u32,
    channels: u8,
}

impl ImageBuffer {
    /// Creates a new zero-filled buffer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lumin_core::ImageBuffer;
    ///
    /// let img = ImageBuffer::new(1920, 1080, 4);
    /// assert_eq!(img.dimensions(), (1920, 1080));
    /// assert_eq!(img.channels(), 4);
    /// ```
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            data: vec![0.0; len],
            width,
            height,
            channels,
        }
    }

    /// Creates the null (0x0, zero-channel) buffer.
    ///
    /// The null buffer is the terminal state after a failed load and the
    /// initial state of an image that has never been loaded.
    pub fn null() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            channels: 0,
        }
    }

    /// Creates a buffer filled with a constant pixel value.
    ///
    /// The channel count is taken from `pixel.len()`, which must fit in
    /// a `u8`.
    pub fn filled(width: u32, height: u32, pixel: &[f32]) -> Self {
        debug_assert!(pixel.len() <= u8::MAX as usize, "too many channels");
        let channels = pixel.len() as u8;
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Creates a buffer from existing pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data.len()` does not
    /// equal `width * height * channels`.
    pub fn from_data(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                channels,
                format!("expected {} samples, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Returns the buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the buffer height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the dimensions as (width, height).
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the number of channels per pixel.
    #[inline]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Returns the total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if this is a null (zero-area) buffer.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns a reference to the raw sample data.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns a mutable reference to the raw sample data.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns one scanline of samples.
    ///
    /// The scanline is the unit of incremental texture transfer.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[f32] {
        debug_assert!(y < self.height, "row out of bounds");
        let stride = self.width as usize * self.channels as usize;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Returns a span of `count` consecutive scanlines starting at `y`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the image height.
    #[inline]
    pub fn rows(&self, y: u32, count: u32) -> &[f32] {
        debug_assert!(y + count <= self.height, "row range out of bounds");
        let stride = self.width as usize * self.channels as usize;
        let start = y as usize * stride;
        &self.data[start..start + count as usize * stride]
    }

    /// Returns one mutable scanline of samples.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [f32] {
        debug_assert!(y < self.height, "row out of bounds");
        let stride = self.width as usize * self.channels as usize;
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Returns the samples of the pixel at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let c = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * c;
        &self.data[offset..offset + c]
    }

    /// Sets the pixel at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is out of bounds or the sample count mismatches.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: &[f32]) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let c = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * c;
        self.data[offset..offset + c].copy_from_slice(pixel);
    }

    /// Fills the buffer with a constant pixel value.
    pub fn fill(&mut self, pixel: &[f32]) {
        for chunk in self.data.chunks_exact_mut(self.channels as usize) {
            chunk.copy_from_slice(pixel);
        }
    }

    /// Applies a function to every sample in place.
    pub fn map_samples<F>(&mut self, f: F)
    where
        F: Fn(f32) -> f32,
    {
        for v in &mut self.data {
            *v = f(*v);
        }
    }
}

impl Default for ImageBuffer {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_zeroed() {
        let img = ImageBuffer::new(8, 4, 3);
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.channels(), 3);
        assert_eq!(img.pixel_count(), 32);
        assert!(img.data().iter().all(|&v| v == 0.0));
        assert!(!img.is_null());
    }

    #[test]
    fn test_null_buffer() {
        let img = ImageBuffer::null();
        assert!(img.is_null());
        assert_eq!(img.pixel_count(), 0);
        assert_eq!(img.data().len(), 0);
    }

    #[test]
    fn test_filled_and_pixel_access() {
        let mut img = ImageBuffer::filled(4, 4, &[1.0, 0.5, 0.25]);
        assert_eq!(img.pixel(3, 3), &[1.0, 0.5, 0.25]);
        img.set_pixel(1, 2, &[0.0, 0.0, 9.0]);
        assert_eq!(img.pixel(1, 2), &[0.0, 0.0, 9.0]);
        assert_eq!(img.pixel(0, 0), &[1.0, 0.5, 0.25]);
    }

    #[test]
    #[should_panic(expected = "too many channels")]
    fn test_filled_rejects_oversized_pixel() {
        let pixel = vec![0.0; 300];
        let _ = ImageBuffer::filled(1, 1, &pixel);
    }

    #[test]
    fn test_from_data_validates_length() {
        let ok = ImageBuffer::from_data(2, 2, 3, vec![0.0; 12]);
        assert!(ok.is_ok());
        let bad = ImageBuffer::from_data(2, 2, 3, vec![0.0; 11]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rows() {
        let mut img = ImageBuffer::new(4, 3, 2);
        img.row_mut(1).fill(7.0);
        assert!(img.row(1).iter().all(|&v| v == 7.0));
        assert!(img.row(0).iter().all(|&v| v == 0.0));
        let span = img.rows(1, 2);
        assert_eq!(span.len(), 2 * 4 * 2);
        assert_eq!(span[0], 7.0);
        assert_eq!(span[4 * 2], 0.0);
    }

    #[test]
    fn test_hdr_values_unclamped() {
        let mut img = ImageBuffer::new(2, 2, 1);
        img.set_pixel(0, 0, &[42.5]);
        img.map_samples(|v| v * 2.0);
        assert_relative_eq!(img.pixel(0, 0)[0], 85.0);
    }

    #[test]
    fn test_map_samples_applies_everywhere() {
        let mut img = ImageBuffer::filled(3, 3, &[0.1, 0.2]);
        img.map_samples(|v| v + 1.0);
        assert_relative_eq!(img.pixel(0, 0)[0], 1.1);
        assert_relative_eq!(img.pixel(2, 2)[1], 1.2);
    }
}
