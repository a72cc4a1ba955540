//! The managed image: one HDR buffer plus everything the viewer needs
//! around it.
//!
//! [`ManagedImage`] owns the live buffer and coordinates the moving
//! parts: the undo history, the background edit slot, the histogram
//! cache, and the incremental texture uploader. The render thread drives
//! it with [`poll`](ManagedImage::poll) once per frame; background
//! outcomes are only ever absorbed there (or in the blocking paths that
//! call it), so the live buffer never changes out from under a frame.
//!
//! One edit at a time: while an edit is in flight,
//! [`async_modify`](ManagedImage::async_modify) rejects further commands
//! with [`Error::Busy`] rather than queueing them. Undo, redo, and save
//! need a settled buffer and block on the pending edit instead.
//!
//! Histogram requests supersede: a new exposure cancels the in-flight
//! computation and only the snapshot for the most recent request is ever
//! exposed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lumin_core::{Error, ImageBuffer, Result};
use lumin_sched::{AsyncTask, TaskError, TaskOutcome};
use tracing::{debug, info, warn};

use crate::codec::{ImageCodec, SaveOptions};
use crate::command::EditCommand;
use crate::history::CommandHistory;
use crate::options::ImageOptions;
use crate::stats::{self, HistogramSnapshot};
use crate::texture::{GpuContext, LazyTextureUploader, TextureId};

struct PendingEdit {
    task: AsyncTask<ImageBuffer>,
    label: String,
}

/// An HDR image with undo history, a background edit slot, cached
/// histogram statistics, and a lazily uploaded GPU texture.
pub struct ManagedImage {
    image: Arc<ImageBuffer>,
    path: Option<PathBuf>,
    history: CommandHistory,
    uploader: LazyTextureUploader,
    pending_edit: Option<PendingEdit>,
    histogram_task: Option<AsyncTask<HistogramSnapshot>>,
    histograms: Option<Arc<HistogramSnapshot>>,
    histogram_exposure: f32,
    last_error: Option<Error>,
    options: ImageOptions,
}

impl ManagedImage {
    /// Wraps a buffer with default options.
    pub fn new(buffer: ImageBuffer) -> Self {
        Self::with_options(buffer, ImageOptions::default())
    }

    /// Wraps a buffer with explicit options.
    pub fn with_options(buffer: ImageBuffer, options: ImageOptions) -> Self {
        let image = Arc::new(buffer);
        let mut uploader = LazyTextureUploader::new();
        uploader.set_dirty();
        Self {
            image: Arc::clone(&image),
            path: None,
            history: CommandHistory::new(image, options.history_capacity),
            uploader,
            pending_edit: None,
            histogram_task: None,
            histograms: None,
            histogram_exposure: 0.0,
            last_error: None,
            options,
        }
    }

    /// The live buffer.
    pub fn buffer(&self) -> &Arc<ImageBuffer> {
        &self.image
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The file path this image was loaded from or saved to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The options in effect.
    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    // ---- frame pump ----------------------------------------------------

    /// Absorbs any finished background work. Call once per frame.
    ///
    /// A completed edit is committed to the buffer and history; a failed
    /// one is recorded for [`take_error`](Self::take_error) and the
    /// buffer stays untouched; a cancelled one is discarded silently.
    /// Finished histogram computations become visible through
    /// [`histograms`](Self::histograms). Never blocks.
    pub fn poll(&mut self) {
        if self.pending_edit.as_ref().is_some_and(|p| p.task.ready())
            && let Some(PendingEdit { task, label }) = self.pending_edit.take()
        {
            // take() will not block: the task is terminal.
            self.absorb_edit(task.take(), &label);
        }

        if self.histogram_task.as_ref().is_some_and(AsyncTask::ready)
            && let Some(task) = self.histogram_task.take()
        {
            self.absorb_histograms(task.take());
        }
    }

    // ---- async editing -------------------------------------------------

    /// Returns `true` if no edit is in flight.
    pub fn can_modify(&self) -> bool {
        self.pending_edit.is_none()
    }

    /// Starts `command` on a worker thread against a snapshot of the
    /// live buffer.
    ///
    /// The result is committed by a later [`poll`](Self::poll). Only one
    /// edit may be in flight.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if an edit is already pending (checked after
    /// absorbing any finished one).
    pub fn async_modify(&mut self, command: EditCommand) -> Result<()> {
        self.poll();
        if let Some(pending) = &self.pending_edit {
            warn!(
                rejected = command.name(),
                pending = %pending.label,
                "edit slot occupied"
            );
            return Err(Error::busy(pending.label.clone()));
        }

        let label = command.name().to_string();
        debug!(command = %label, "starting background edit");
        let src = Arc::clone(&self.image);
        let task = AsyncTask::spawn(move |ctx| command.apply(&src, ctx));
        self.pending_edit = Some(PendingEdit { task, label });
        Ok(())
    }

    /// Progress of the pending edit in [0, 1], or `None` when idle.
    pub fn modify_progress(&self) -> Option<f32> {
        self.pending_edit.as_ref().map(|p| p.task.progress())
    }

    /// Display name of the pending edit, or `None` when idle.
    pub fn pending_label(&self) -> Option<&str> {
        self.pending_edit.as_ref().map(|p| p.label.as_str())
    }

    /// Requests cancellation of the pending edit, if any.
    ///
    /// Cancellation is cooperative; the slot frees up once the worker
    /// observes the flag and the next [`poll`](Self::poll) absorbs the
    /// outcome.
    pub fn cancel_pending(&self) {
        if let Some(pending) = &self.pending_edit {
            debug!(command = %pending.label, "cancelling background edit");
            pending.task.cancel();
        }
    }

    /// Blocks until the pending edit (if any) is absorbed.
    pub fn wait_for_pending(&mut self) {
        if let Some(PendingEdit { task, label }) = self.pending_edit.take() {
            self.absorb_edit(task.take(), &label);
        }
    }

    fn absorb_edit(&mut self, outcome: TaskOutcome<ImageBuffer>, label: &str) {
        match outcome {
            Ok(buffer) => {
                debug!(command = %label, "committing edit");
                let state = Arc::new(buffer);
                self.history.record(Arc::clone(&state), label);
                self.set_image(state);
            }
            Err(TaskError::Cancelled) => {
                debug!(command = %label, "edit cancelled, buffer unchanged");
            }
            Err(err) => {
                warn!(command = %label, %err, "edit failed, buffer unchanged");
                self.last_error = Some(Error::task_failed(format!("{label}: {err}")));
            }
        }
    }

    /// Takes the most recent background failure, if one occurred.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    // ---- history -------------------------------------------------------

    /// Returns `true` if an undo step exists.
    pub fn has_undo(&self) -> bool {
        self.history.has_undo()
    }

    /// Returns `true` if a redo step exists.
    pub fn has_redo(&self) -> bool {
        self.history.has_redo()
    }

    /// Steps back one edit. Blocks on a pending edit first, so the
    /// history is settled before moving.
    ///
    /// Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.wait_for_pending();
        match self.history.undo() {
            Some(state) => {
                self.set_image(state);
                true
            }
            None => false,
        }
    }

    /// Steps forward one edit. Blocks on a pending edit first.
    ///
    /// Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.wait_for_pending();
        match self.history.redo() {
            Some(state) => {
                self.set_image(state);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if the buffer differs from its last saved state.
    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    /// The undo history.
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    // ---- load / save ---------------------------------------------------

    /// Replaces the image with the decoded contents of `path`.
    ///
    /// On success the history, histogram cache, and texture state are
    /// reset; a pending edit (against the old buffer) is absorbed first
    /// and its result discarded with the old history.
    ///
    /// # Errors
    ///
    /// Whatever the codec's `decode` returns; the image is unchanged on
    /// failure.
    pub fn load(&mut self, codec: &dyn ImageCodec, path: &Path) -> Result<()> {
        self.wait_for_pending();
        let buffer = codec.decode(path)?;
        info!(path = %path.display(), width = buffer.width(), height = buffer.height(), "loaded image");

        let image = Arc::new(buffer);
        self.history = CommandHistory::new(Arc::clone(&image), self.options.history_capacity);
        self.set_image(image);
        self.path = Some(path.to_path_buf());
        self.last_error = None;
        Ok(())
    }

    /// Encodes the current buffer to `path`.
    ///
    /// Blocks on a pending edit first so the file reflects it. On
    /// success the current state becomes the saved baseline and `path`
    /// becomes the image's path.
    ///
    /// # Errors
    ///
    /// Whatever the codec's `encode` returns.
    pub fn save(&mut self, codec: &dyn ImageCodec, path: &Path, opts: &SaveOptions) -> Result<()> {
        self.wait_for_pending();
        codec.encode(path, &self.image, opts)?;
        info!(path = %path.display(), "saved image");
        self.history.mark_saved();
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    // ---- histograms ----------------------------------------------------

    /// The most recent histogram snapshot, if one is current.
    ///
    /// `None` while the first computation for the requested exposure is
    /// still running, or right after the buffer changed.
    pub fn histograms(&self) -> Option<&Arc<HistogramSnapshot>> {
        self.histograms.as_ref()
    }

    /// Returns `true` if a histogram computation is in flight.
    pub fn histograms_pending(&self) -> bool {
        self.histogram_task.is_some()
    }

    /// Requests histogram statistics at `exposure` (stops).
    ///
    /// No-op when a current snapshot for this exposure already exists or
    /// a computation for it is already in flight, so calling this every
    /// frame is cheap. A *different* exposure cancels and replaces the
    /// in-flight computation: requests supersede, and only the snapshot
    /// for the latest exposure ever becomes visible.
    pub fn recompute_histograms(&mut self, exposure: f32) {
        if self.histogram_task.is_some() && self.histogram_exposure == exposure {
            return;
        }
        if self.histogram_task.is_none()
            && let Some(current) = &self.histograms
            && current.exposure == exposure
        {
            return;
        }

        self.histogram_exposure = exposure;
        if let Some(task) = self.histogram_task.take() {
            debug!("superseding histogram computation");
            task.cancel();
        }

        let src = Arc::clone(&self.image);
        self.histogram_task =
            Some(AsyncTask::spawn(move |ctx| stats::compute(&src, exposure, ctx)));
    }

    fn absorb_histograms(&mut self, outcome: TaskOutcome<HistogramSnapshot>) {
        match outcome {
            // A snapshot for a stale exposure can surface when a new
            // request arrived after the worker finished; drop it.
            Ok(snapshot) if snapshot.exposure == self.histogram_exposure => {
                self.histograms = Some(Arc::new(snapshot));
            }
            Ok(stale) => {
                debug!(exposure = stale.exposure, "discarding stale histogram snapshot");
            }
            Err(TaskError::Cancelled) => {}
            Err(err) => {
                warn!(%err, "histogram computation failed");
            }
        }
    }

    // ---- texture -------------------------------------------------------

    /// Pushes pending scanlines to the GPU within the configured budget.
    ///
    /// Returns `true` once the texture is fully up to date. Call every
    /// frame after [`poll`](Self::poll).
    pub fn upload_to_gpu(&mut self, gpu: &mut dyn GpuContext) -> bool {
        self.uploader.upload(
            gpu,
            &self.image,
            Duration::from_millis(self.options.upload_budget_ms),
            0,
            self.options.upload_chunk_pixels,
        )
    }

    /// The GPU texture handle, possibly partially uploaded.
    pub fn texture_id(&self) -> Option<TextureId> {
        self.uploader.texture_id()
    }

    /// Returns `true` if the GPU copy is out of date.
    pub fn texture_dirty(&self) -> bool {
        self.uploader.dirty()
    }

    /// Releases GPU resources. The image stays usable; the texture is
    /// recreated on the next upload.
    pub fn release_gpu(&mut self, gpu: &mut dyn GpuContext) {
        self.uploader.release(gpu);
        self.uploader.set_dirty();
    }

    // Every buffer change funnels through here: the GPU copy and the
    // histogram cache are stale the moment the pixels move.
    fn set_image(&mut self, state: Arc<ImageBuffer>) {
        self.image = state;
        self.uploader.set_dirty();
        self.histograms = None;
        if let Some(task) = self.histogram_task.take() {
            task.cancel();
        }
    }
}

impl std::fmt::Debug for ManagedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedImage")
            .field("size", &self.image.dimensions())
            .field("path", &self.path)
            .field("pending", &self.pending_label())
            .field("modified", &self.is_modified())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn image(v: f32) -> ImageBuffer {
        ImageBuffer::filled(4, 4, &[v])
    }

    fn poll_until<F: Fn(&ManagedImage) -> bool>(img: &mut ManagedImage, done: F) {
        for _ in 0..2000 {
            img.poll();
            if done(img) {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_edit_commits_on_poll() {
        let mut img = ManagedImage::new(image(0.0));
        img.async_modify(EditCommand::new("fill", |src| {
            let mut out = src.clone();
            out.fill(&[1.0]);
            Ok(out)
        }))
        .unwrap();

        poll_until(&mut img, |i| i.can_modify());
        assert_eq!(img.buffer().pixel(0, 0), &[1.0]);
        assert!(img.has_undo());
        assert!(img.is_modified());
        assert!(img.take_error().is_none());
    }

    #[test]
    fn test_busy_while_edit_pending() {
        let mut img = ManagedImage::new(image(0.0));
        img.async_modify(EditCommand::new("slow", |src| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(src.clone())
        }))
        .unwrap();

        let err = img
            .async_modify(EditCommand::new("second", |src| Ok(src.clone())))
            .unwrap_err();
        assert!(err.is_busy());

        poll_until(&mut img, |i| i.can_modify());
        // Slot is free again.
        img.async_modify(EditCommand::new("second", |src| Ok(src.clone())))
            .unwrap();
        img.wait_for_pending();
    }

    #[test]
    fn test_result_absorbed_only_on_poll() {
        let mut img = ManagedImage::new(image(0.0));
        img.async_modify(EditCommand::new("quick", |src| Ok(src.clone())))
            .unwrap();

        // Give the worker ample time to finish; without a poll the slot
        // stays occupied and the buffer untouched.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!img.can_modify());
        assert!(!img.has_undo());

        poll_until(&mut img, |i| i.can_modify());
        assert!(img.has_undo());
    }

    #[test]
    fn test_failed_edit_leaves_buffer_unchanged() {
        let mut img = ManagedImage::new(image(0.25));
        img.async_modify(EditCommand::new("bad", |_| {
            Err(Error::other("filter exploded"))
        }))
        .unwrap();

        poll_until(&mut img, |i| i.can_modify());
        assert_eq!(img.buffer().pixel(0, 0), &[0.25]);
        assert!(!img.has_undo());
        let err = img.take_error().unwrap();
        assert!(err.to_string().contains("filter exploded"));
    }

    #[test]
    fn test_cancelled_edit_is_discarded() {
        let mut img = ManagedImage::new(image(0.25));
        img.async_modify(EditCommand::with_progress("slow", |src, ctx| {
            for _ in 0..1000 {
                ctx.checkpoint()?;
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(src.clone())
        }))
        .unwrap();

        img.cancel_pending();
        poll_until(&mut img, |i| i.can_modify());
        assert_eq!(img.buffer().pixel(0, 0), &[0.25]);
        assert!(!img.has_undo());
        assert!(img.take_error().is_none());
    }

    #[test]
    fn test_undo_waits_for_pending_edit() {
        let mut img = ManagedImage::new(image(0.0));
        img.async_modify(EditCommand::new("fill", |src| {
            std::thread::sleep(Duration::from_millis(20));
            let mut out = src.clone();
            out.fill(&[1.0]);
            Ok(out)
        }))
        .unwrap();

        // Undo blocks until the edit lands, then reverts it.
        assert!(img.undo());
        assert_eq!(img.buffer().pixel(0, 0), &[0.0]);
        assert!(img.redo());
        assert_eq!(img.buffer().pixel(0, 0), &[1.0]);
    }

    #[test]
    fn test_undo_redo_empty_history() {
        let mut img = ManagedImage::new(image(0.0));
        assert!(!img.undo());
        assert!(!img.redo());
    }

    #[test]
    fn test_histogram_appears_after_poll() {
        let mut img = ManagedImage::new(image(0.5));
        assert!(img.histograms().is_none());
        img.recompute_histograms(0.0);
        assert!(img.histograms_pending());

        poll_until(&mut img, |i| i.histograms().is_some());
        let snap = img.histograms().unwrap();
        assert_eq!(snap.exposure, 0.0);
        assert!((snap.average[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_histogram_request_supersedes() {
        let mut img = ManagedImage::new(ImageBuffer::filled(64, 64, &[0.25]));
        img.recompute_histograms(0.0);
        img.recompute_histograms(1.0);

        poll_until(&mut img, |i| i.histograms().is_some());
        // Only the latest exposure is ever exposed.
        assert_eq!(img.histograms().unwrap().exposure, 1.0);
    }

    #[test]
    fn test_histogram_completes_under_per_frame_requests() {
        // Re-requesting the in-flight exposure every frame must not
        // cancel and respawn the computation; it has to converge even
        // when it outlasts a frame.
        // Large enough that the computation spans many frames.
        let mut img = ManagedImage::new(ImageBuffer::filled(2048, 2048, &[0.5, 0.5, 0.5]));
        img.recompute_histograms(0.0);

        let mut done = false;
        for _ in 0..2000 {
            img.poll();
            img.recompute_histograms(0.0);
            if img.histograms().is_some() {
                done = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(done, "per-frame requests starved the histogram task");
        assert_eq!(img.histograms().unwrap().exposure, 0.0);
    }

    #[test]
    fn test_histogram_noop_when_current() {
        let mut img = ManagedImage::new(image(0.5));
        img.recompute_histograms(0.0);
        poll_until(&mut img, |i| i.histograms().is_some());
        let before = Arc::as_ptr(img.histograms().unwrap());

        img.recompute_histograms(0.0);
        assert!(!img.histograms_pending());
        assert_eq!(Arc::as_ptr(img.histograms().unwrap()), before);
    }

    #[test]
    fn test_edit_invalidates_histograms() {
        let mut img = ManagedImage::new(image(0.5));
        img.recompute_histograms(0.0);
        poll_until(&mut img, |i| i.histograms().is_some());

        img.async_modify(EditCommand::new("fill", |src| {
            let mut out = src.clone();
            out.fill(&[1.0]);
            Ok(out)
        }))
        .unwrap();
        img.wait_for_pending();
        assert!(img.histograms().is_none());
    }

    #[test]
    fn test_edit_marks_texture_dirty() {
        let mut img = ManagedImage::new(image(0.0));
        // Fresh image starts dirty; mimic a completed upload.
        struct NullGpu;
        impl GpuContext for NullGpu {
            fn create_texture(&mut self, _: u32, _: u32, _: u8) -> TextureId {
                1
            }
            fn delete_texture(&mut self, _: TextureId) {}
            fn upload_scanlines(&mut self, _: TextureId, _: u32, _: u32, _: u32, _: &[f32]) {}
        }
        let mut gpu = NullGpu;
        assert!(img.upload_to_gpu(&mut gpu));
        assert!(!img.texture_dirty());

        img.async_modify(EditCommand::new("fill", |src| Ok(src.clone())))
            .unwrap();
        img.wait_for_pending();
        assert!(img.texture_dirty());
        assert!(img.upload_to_gpu(&mut gpu));
    }
}
