//! # lumin-sched
//!
//! Background task engine for the lumin viewer.
//!
//! This crate provides:
//!
//! - [`WorkerPool`] - A small fixed pool of background worker threads
//! - [`AsyncTask`] - A cancellable, progress-reporting unit of deferred
//!   computation, pollable from the render thread
//! - [`TaskContext`] - The view of a task handed to the running closure
//!   (progress reporting + cooperative cancellation checkpoints)
//! - [`TaskError`] - Terminal failure outcomes
//!
//! ## Execution model
//!
//! Work closures run on the pool; the render thread polls handles once
//! per frame with [`AsyncTask::ready`] / [`AsyncTask::progress`] and
//! retrieves outcomes with [`AsyncTask::take`]. `take` consumes the
//! handle, so "retrieved exactly once" is enforced by the type system
//! rather than by convention.
//!
//! Cancellation is cooperative: [`AsyncTask::cancel`] raises a flag that
//! the closure observes at its next [`TaskContext::checkpoint`]. Nothing
//! is ever terminated preemptively.
//!
//! Panics inside a work closure are caught and surfaced as
//! [`TaskError::Panicked`] at retrieval time; they never cross thread
//! boundaries as unwinds.
//!
//! ## Quick Start
//!
//! ```rust
//! use lumin_sched::AsyncTask;
//!
//! let task = AsyncTask::spawn(|ctx| {
//!     for i in 0..100 {
//!         ctx.checkpoint()?; // observe cancellation
//!         ctx.report(i as f32 / 100.0);
//!     }
//!     Ok(42)
//! });
//!
//! assert_eq!(task.take(), Ok(42));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod pool;
pub mod progress;
pub mod task;

pub use error::TaskError;
pub use pool::WorkerPool;
pub use progress::{ProgressState, TaskContext};
pub use task::{AsyncTask, TaskOutcome};
