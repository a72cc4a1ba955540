//! Cancellable, progress-reporting deferred computations.
//!
//! [`AsyncTask`] pairs a work closure running on a [`WorkerPool`] with a
//! shared result slot. The render thread polls the handle once per frame
//! ([`ready`](AsyncTask::ready) / [`progress`](AsyncTask::progress)) and
//! absorbs the outcome with [`take`](AsyncTask::take) exactly once;
//! `take` consumes the handle, so double retrieval cannot compile.
//!
//! The closure receives a [`TaskContext`] for progress reporting and
//! cooperative cancellation. Work that never checkpoints still runs to
//! completion after a cancel; cancellation here is advisory, never
//! preemptive.
//!
//! Panics in the closure are caught with `catch_unwind` and stored as
//! [`TaskError::Panicked`]; a background failure never escapes its
//! worker thread as an unwind.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::trace;

use crate::{ProgressState, TaskContext, TaskError, WorkerPool};

/// Outcome of a finished task.
pub type TaskOutcome<T> = Result<T, TaskError>;

struct Shared<T> {
    outcome: Mutex<Option<TaskOutcome<T>>>,
    ready: Condvar,
    done: AtomicBool,
    progress: Arc<ProgressState>,
}

/// Handle to a computation running on a [`WorkerPool`].
///
/// The handle is the render thread's side: poll it, cancel it, and
/// eventually consume it with [`take`](AsyncTask::take). Dropping the
/// handle detaches the computation; the worker holds its own reference
/// to the shared state and finishes (or cancels) safely on its own.
pub struct AsyncTask<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> AsyncTask<T> {
    /// Spawns `work` on the process-wide shared pool.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&TaskContext) -> TaskOutcome<T> + Send + 'static,
    {
        Self::spawn_on(WorkerPool::shared(), work)
    }

    /// Spawns `work` on a specific pool.
    pub fn spawn_on<F>(pool: &WorkerPool, work: F) -> Self
    where
        F: FnOnce(&TaskContext) -> TaskOutcome<T> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
            done: AtomicBool::new(false),
            progress: Arc::new(ProgressState::new()),
        });

        let worker = Arc::clone(&shared);
        pool.spawn(move || {
            let ctx = TaskContext::new(Arc::clone(&worker.progress));
            let outcome = match catch_unwind(AssertUnwindSafe(|| work(&ctx))) {
                Ok(result) => result,
                Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
            };
            trace!(failed = outcome.is_err(), "task reached terminal state");

            let mut slot = worker.outcome.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(outcome);
            worker.done.store(true, Ordering::Release);
            worker.progress.set_done();
            worker.ready.notify_all();
        });

        Self { shared }
    }
}

impl<T> AsyncTask<T> {
    /// Returns `true` once the task has reached a terminal state
    /// (completed, failed, or cancelled). Never blocks.
    #[inline]
    pub fn ready(&self) -> bool {
        self.shared.done.load(Ordering::Acquire)
    }

    /// Returns the progress fraction in [0, 1].
    ///
    /// 0 before the closure reports anything, the last reported value
    /// while running, and 1 once terminal regardless of outcome.
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.ready() {
            1.0
        } else {
            self.shared.progress.fraction()
        }
    }

    /// Requests cooperative cancellation.
    ///
    /// The running closure observes the flag at its next checkpoint and
    /// terminates with [`TaskError::Cancelled`]. Already-finished tasks
    /// are unaffected.
    #[inline]
    pub fn cancel(&self) {
        self.shared.progress.cancel();
    }

    /// Returns `true` if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.progress.is_cancelled()
    }

    /// Blocks the calling thread until the task is terminal.
    ///
    /// Render-thread callers should prefer polling [`ready`](Self::ready)
    /// once per frame; `wait` is for callers that genuinely need the
    /// result now (undo/redo catching up, shutdown).
    pub fn wait(&self) {
        let mut slot = self
            .shared
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while slot.is_none() {
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until terminal, then returns the outcome.
    ///
    /// Consumes the handle: the outcome of a task can be retrieved
    /// exactly once, and that is enforced at compile time.
    pub fn take(self) -> TaskOutcome<T> {
        self.wait();
        let mut slot = self
            .shared
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // wait() returned, so the slot is filled.
        slot.take()
            .unwrap_or_else(|| Err(TaskError::Failed("task outcome missing".into())))
    }
}

impl<T> std::fmt::Debug for AsyncTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTask")
            .field("ready", &self.ready())
            .field("progress", &self.progress())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
