//! Undoable image-editing commands.
//!
//! An [`EditCommand`] is a named, single-use description of a transform
//! over an [`ImageBuffer`]. Given an input buffer it deterministically
//! produces an output buffer; the history keeps the prior buffer state
//! for undo, so commands themselves carry no inverse.
//!
//! Two variants mirror how much a transform can cooperate with the task
//! engine:
//!
//! - [`EditCommand::new`] - a plain closure; cancellation is only
//!   observed before it starts.
//! - [`EditCommand::with_progress`] - the closure receives a
//!   [`TaskContext`] and is expected to report fractions and hit
//!   cancellation checkpoints at iteration boundaries.
//!
//! Concrete filters live with the application; this crate only supplies
//! the plumbing. Example:
//!
//! ```rust
//! use lumin_core::ImageBuffer;
//! use lumin_image::EditCommand;
//!
//! let cmd = EditCommand::with_progress("double", |src, ctx| {
//!     let mut out = src.clone();
//!     let height = out.height().max(1);
//!     for y in 0..out.height() {
//!         ctx.checkpoint()?;
//!         for v in out.row_mut(y) {
//!             *v *= 2.0;
//!         }
//!         ctx.report((y + 1) as f32 / height as f32);
//!     }
//!     Ok(out)
//! });
//! assert_eq!(cmd.name(), "double");
//! ```

use lumin_core::{ImageBuffer, Result};
use lumin_sched::{TaskContext, TaskError, TaskOutcome};

type SimpleFn = Box<dyn FnOnce(&ImageBuffer) -> Result<ImageBuffer> + Send + 'static>;
type ProgressiveFn =
    Box<dyn FnOnce(&ImageBuffer, &TaskContext) -> TaskOutcome<ImageBuffer> + Send + 'static>;

enum CommandKind {
    Simple(SimpleFn),
    Progressive(ProgressiveFn),
}

/// A named, single-use image transform.
///
/// Consumed when applied; the name survives into the history entry and
/// is what an undo menu would display.
pub struct EditCommand {
    name: String,
    kind: CommandKind,
}

impl EditCommand {
    /// Creates a simple command from a plain closure.
    ///
    /// The closure runs on a worker thread against a private snapshot of
    /// the live buffer. Failures are surfaced at retrieval time; they
    /// never touch the live image.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&ImageBuffer) -> Result<ImageBuffer> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: CommandKind::Simple(Box::new(f)),
        }
    }

    /// Creates a command that reports progress and observes cancellation.
    pub fn with_progress<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&ImageBuffer, &TaskContext) -> TaskOutcome<ImageBuffer> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: CommandKind::Progressive(Box::new(f)),
        }
    }

    /// The command's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this command reports intermediate progress.
    pub fn reports_progress(&self) -> bool {
        matches!(self.kind, CommandKind::Progressive(_))
    }

    /// Runs the command against `src` inside a task.
    ///
    /// Simple commands get a single cancellation check up front; their
    /// progress stays at 0 until the task completes. Progressive
    /// commands manage both through the context.
    pub(crate) fn apply(self, src: &ImageBuffer, ctx: &TaskContext) -> TaskOutcome<ImageBuffer> {
        match self.kind {
            CommandKind::Simple(f) => {
                ctx.checkpoint()?;
                f(src).map_err(TaskError::failed)
            }
            CommandKind::Progressive(f) => f(src, ctx),
        }
    }
}

impl std::fmt::Debug for EditCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditCommand")
            .field("name", &self.name)
            .field("progress", &self.reports_progress())
            .finish()
    }
}
