//! # lumin-image
//!
//! The editing core of an interactive HDR viewer: one image, its undo
//! history, its background edit slot, its histogram statistics, and its
//! incrementally uploaded GPU texture.
//!
//! # Architecture
//!
//! [`ManagedImage`] is the entry point; everything else is a part it
//! coordinates:
//!
//! - [`EditCommand`] - a named, single-use buffer transform
//! - [`CommandHistory`] - bounded linear undo/redo over buffer snapshots
//! - [`HistogramSnapshot`] - exposure-keyed pixel statistics
//! - [`LazyTextureUploader`] - time-budgeted scanline upload behind the
//!   [`GpuContext`] trait
//! - [`ImageCodec`] - application-supplied file decode/encode
//!
//! The render thread owns the `ManagedImage` and drives it with
//! [`poll`](ManagedImage::poll) once per frame; heavy work runs on
//! `lumin-sched` workers and is only ever absorbed inside `poll` (or the
//! blocking paths that call it).
//!
//! # Quick Start
//!
//! ```rust
//! use lumin_core::ImageBuffer;
//! use lumin_image::{EditCommand, ManagedImage};
//!
//! let mut image = ManagedImage::new(ImageBuffer::filled(64, 64, &[0.5, 0.5, 0.5]));
//!
//! image.async_modify(EditCommand::new("brighten", |src| {
//!     let mut out = src.clone();
//!     for v in out.data_mut() {
//!         *v *= 2.0;
//!     }
//!     Ok(out)
//! }))?;
//!
//! // Per frame: absorb finished work, then draw.
//! image.poll();
//!
//! // Blocking retrieval (tests, shutdown); frames just keep polling.
//! image.wait_for_pending();
//! assert_eq!(image.buffer().pixel(0, 0)[0], 1.0);
//! assert!(image.has_undo());
//! # Ok::<(), lumin_core::Error>(())
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod command;
pub mod history;
pub mod managed;
pub mod options;
pub mod stats;
pub mod texture;

pub use codec::{ImageCodec, SaveOptions};
pub use command::EditCommand;
pub use history::{CommandHistory, HistoryEntry};
pub use managed::ManagedImage;
pub use options::ImageOptions;
pub use stats::{AxisTicks, HistogramSnapshot, NUM_BINS};
pub use texture::{GpuContext, LazyTextureUploader, TextureId};
