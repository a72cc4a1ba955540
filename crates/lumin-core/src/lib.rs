//! # lumin-core
//!
//! Core types for the lumin HDR viewer/editor.
//!
//! This crate provides the foundational types used by the rest of the
//! workspace:
//!
//! - [`ImageBuffer`] - Owned, channel-interleaved f32 pixel buffer
//! - [`Error`] / [`Result`] - Shared error taxonomy
//!
//! ## Design Philosophy
//!
//! The buffer is deliberately plain: width, height, and channel count are
//! fixed at creation, pixel data is row-major f32, and "resizing" means
//! replacing the buffer wholesale. All editing happens by producing a new
//! buffer from an old one, which is what makes the single-writer handoff
//! in `lumin-image` possible without locks.
//!
//! A 0x0 buffer (see [`ImageBuffer::null`]) is a valid terminal state,
//! e.g. after a failed load.
//!
//! ## Crate Structure
//!
//! This crate is the foundation of the workspace and has no internal
//! dependencies:
//!
//! ```text
//! lumin-core (this crate)
//!    ^
//!    |
//!    +-- lumin-sched (background task engine)
//!    +-- lumin-image (history, histograms, texture upload, orchestration)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;

pub use buffer::ImageBuffer;
pub use error::{Error, Result};
