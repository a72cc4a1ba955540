//! Shared progress and cancellation state.
//!
//! One [`ProgressState`] is shared between a task handle (render thread)
//! and the running work closure (worker thread). The fraction is stored
//! as the bit pattern of an `f32` in an `AtomicU32`; updates are
//! monotone, so a caller polling [`ProgressState::fraction`] every frame
//! never sees progress move backwards.
//!
//! Cancellation is a plain flag. The work closure is expected to call
//! [`TaskContext::checkpoint`] at natural iteration boundaries (per
//! scanline band, per tile, ...) and bail out with
//! [`TaskError::Cancelled`] when the flag is up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::TaskError;

/// Progress fraction plus cooperative cancellation flag.
///
/// Lock-free; safe to poll from the render thread every frame while the
/// worker updates it.
#[derive(Debug, Default)]
pub struct ProgressState {
    /// Bit pattern of the current fraction in [0, 1].
    fraction_bits: AtomicU32,
    cancelled: AtomicBool,
}

impl ProgressState {
    /// Creates a fresh state: fraction 0, not cancelled.
    pub fn new() -> Self {
        Self {
            fraction_bits: AtomicU32::new(0.0_f32.to_bits()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the last reported fraction, in [0, 1].
    #[inline]
    pub fn fraction(&self) -> f32 {
        f32::from_bits(self.fraction_bits.load(Ordering::Acquire))
    }

    /// Reports a new fraction.
    ///
    /// The value is clamped to [0, 1] and applied only if it advances the
    /// stored fraction; progress never decreases.
    pub fn report(&self, fraction: f32) {
        let new = fraction.clamp(0.0, 1.0);
        let mut current = self.fraction_bits.load(Ordering::Acquire);
        loop {
            if f32::from_bits(current) >= new {
                return;
            }
            match self.fraction_bits.compare_exchange_weak(
                current,
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Forces the fraction to 1.0. Called when the task reaches any
    /// terminal state, including failure and cancellation.
    pub fn set_done(&self) {
        self.fraction_bits
            .store(1.0_f32.to_bits(), Ordering::Release);
    }

    /// Raises the cancellation flag.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// The running closure's view of its own task.
///
/// Handed by reference into the work closure; wraps the shared
/// [`ProgressState`] with the two operations a computation needs:
/// reporting progress and observing cancellation.
#[derive(Debug, Clone)]
pub struct TaskContext {
    state: Arc<ProgressState>,
}

impl TaskContext {
    /// Wraps a shared progress state.
    pub fn new(state: Arc<ProgressState>) -> Self {
        Self { state }
    }

    /// Reports fractional progress in [0, 1]. Monotone; see
    /// [`ProgressState::report`].
    #[inline]
    pub fn report(&self, fraction: f32) {
        self.state.report(fraction);
    }

    /// Returns `true` if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Cancellation checkpoint for use with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Cancelled`] if cancellation has been
    /// requested.
    #[inline]
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_starts_at_zero() {
        let p = ProgressState::new();
        assert_eq!(p.fraction(), 0.0);
    }

    #[test]
    fn test_report_is_monotone_and_clamped() {
        let p = ProgressState::new();
        p.report(0.5);
        assert_eq!(p.fraction(), 0.5);
        p.report(0.25); // regression ignored
        assert_eq!(p.fraction(), 0.5);
        p.report(7.0); // clamped
        assert_eq!(p.fraction(), 1.0);
        p.report(-1.0);
        assert_eq!(p.fraction(), 1.0);
    }

    #[test]
    fn test_set_done() {
        let p = ProgressState::new();
        p.report(0.3);
        p.set_done();
        assert_eq!(p.fraction(), 1.0);
    }

    #[test]
    fn test_checkpoint_observes_cancel() {
        let state = Arc::new(ProgressState::new());
        let ctx = TaskContext::new(state.clone());
        assert!(ctx.checkpoint().is_ok());
        state.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.checkpoint(), Err(TaskError::Cancelled));
    }
}
