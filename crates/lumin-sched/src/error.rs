//! Terminal failure outcomes for background tasks.

use thiserror::Error;

/// Why a background task did not produce a value.
///
/// Exactly one of these (or a success value) is stored in the task's
/// result slot when it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task observed its cancellation flag and stopped early.
    ///
    /// Treated as a no-op by callers: the live image state is never
    /// touched by a cancelled task.
    #[error("task was cancelled")]
    Cancelled,

    /// The work closure returned an error.
    #[error("task failed: {0}")]
    Failed(String),

    /// The work closure panicked.
    ///
    /// The panic was caught on the worker thread; the payload message is
    /// preserved where it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Creates a [`TaskError::Failed`] from any displayable error.
    #[inline]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }

    /// Returns `true` if this is a cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_from_display() {
        let err = TaskError::failed("out of range");
        assert_eq!(err, TaskError::Failed("out of range".into()));
        assert!(!err.is_cancelled());
        assert!(TaskError::Cancelled.is_cancelled());
    }
}
