//! Time-sliced GPU texture upload.
//!
//! Uploading a large HDR texture in one call can stall the render thread
//! for tens of milliseconds. [`LazyTextureUploader`] instead pushes a
//! few scanline chunks per frame, resuming from a cursor, until the
//! whole image is resident. The per-cycle wall-clock budget caps the
//! stall; repeated calls converge, uploading each scanline exactly once
//! per dirty cycle.
//!
//! The GPU itself is a collaborator behind the [`GpuContext`] trait:
//! texture creation/destruction and scanline-range transfer, assumed
//! synchronous and fast per chunk. Tests use a recording mock.

use std::time::{Duration, Instant};

use lumin_core::ImageBuffer;
use tracing::{debug, trace};

/// Opaque GPU texture handle (GL-style id).
pub type TextureId = u32;

/// GPU context collaborator: texture lifetime and partial transfer.
pub trait GpuContext {
    /// Creates a texture sized for `width` x `height` with `channels`
    /// interleaved f32 samples per pixel, returning its handle.
    fn create_texture(&mut self, width: u32, height: u32, channels: u8) -> TextureId;

    /// Destroys a texture.
    fn delete_texture(&mut self, id: TextureId);

    /// Uploads `row_count` scanlines starting at `first_row` of the given
    /// mip level. `data` holds exactly `row_count` rows of interleaved
    /// samples.
    fn upload_scanlines(
        &mut self,
        id: TextureId,
        mip_level: u32,
        first_row: u32,
        row_count: u32,
        data: &[f32],
    );
}

/// Incremental, resumable texture uploader.
///
/// State machine: [`set_dirty`](Self::set_dirty) rewinds the scanline
/// cursor and clears the time accumulator; [`upload`](Self::upload)
/// advances the cursor chunk by chunk until the image height is reached,
/// at which point the dirty flag clears.
#[derive(Debug, Default)]
pub struct LazyTextureUploader {
    texture: Option<TextureId>,
    texture_size: (u32, u32, u8),
    next_scanline: u32,
    dirty: bool,
    upload_time: Duration,
}

impl LazyTextureUploader {
    /// Creates an uploader with no texture and nothing to do.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the GPU copy is out of date.
    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the current texture handle, if one exists.
    ///
    /// The texture may be partially uploaded while
    /// [`dirty`](Self::dirty) is still `true`.
    #[inline]
    pub fn texture_id(&self) -> Option<TextureId> {
        self.texture
    }

    /// Scanline the next upload call resumes from.
    #[inline]
    pub fn next_scanline(&self) -> u32 {
        self.next_scanline
    }

    /// Marks the GPU copy stale: rewinds the cursor and clears the time
    /// accumulator. Call whenever the buffer changes identity.
    pub fn set_dirty(&mut self) {
        self.dirty = true;
        self.next_scanline = 0;
        self.upload_time = Duration::ZERO;
    }

    /// Uploads pending scanlines of `buffer`, bounded by `budget`.
    ///
    /// No-op when not dirty. Otherwise uploads chunks of
    /// `max(1, chunk_pixels / width)` scanlines from the cursor, and
    /// stops when either the image is fully uploaded (dirty clears,
    /// returns `true`) or the accumulated upload time for this dirty
    /// cycle exceeds `budget` (returns `false`; the next call resumes).
    /// At least one chunk is uploaded per call, so repeated calls always
    /// converge.
    ///
    /// A null buffer releases the texture and completes immediately.
    pub fn upload(
        &mut self,
        gpu: &mut dyn GpuContext,
        buffer: &ImageBuffer,
        budget: Duration,
        mip_level: u32,
        chunk_pixels: usize,
    ) -> bool {
        if !self.dirty {
            return true;
        }

        if buffer.is_null() {
            if let Some(id) = self.texture.take() {
                gpu.delete_texture(id);
            }
            self.dirty = false;
            return true;
        }

        let (width, height) = buffer.dimensions();
        let channels = buffer.channels();
        let id = self.ensure_texture(gpu, width, height, channels);

        let rows_per_chunk = (chunk_pixels / width.max(1) as usize).clamp(1, height as usize) as u32;
        let timer = Instant::now();
        let mut last = Duration::ZERO;

        while self.next_scanline < height {
            let count = rows_per_chunk.min(height - self.next_scanline);
            gpu.upload_scanlines(
                id,
                mip_level,
                self.next_scanline,
                count,
                buffer.rows(self.next_scanline, count),
            );
            self.next_scanline += count;
            trace!(scanline = self.next_scanline, height, "uploaded chunk");

            // Per-chunk delta; the accumulator tracks wall-clock time
            // spent across the whole dirty cycle.
            let now = timer.elapsed();
            self.upload_time += now - last;
            last = now;
            if self.next_scanline < height && self.upload_time > budget {
                return false;
            }
        }

        debug!(
            width,
            height,
            elapsed_ms = self.upload_time.as_millis() as u64,
            "texture upload complete"
        );
        self.dirty = false;
        true
    }

    /// Releases the texture, if any. The uploader stays usable; the next
    /// dirty upload recreates the texture.
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(id) = self.texture.take() {
            gpu.delete_texture(id);
        }
    }

    fn ensure_texture(
        &mut self,
        gpu: &mut dyn GpuContext,
        width: u32,
        height: u32,
        channels: u8,
    ) -> TextureId {
        let wanted = (width, height, channels);
        if let Some(id) = self.texture
            && self.texture_size == wanted
        {
            return id;
        }
        if let Some(old) = self.texture.take() {
            gpu.delete_texture(old);
        }
        let id = gpu.create_texture(width, height, channels);
        self.texture = Some(id);
        self.texture_size = wanted;
        id
    }
}
