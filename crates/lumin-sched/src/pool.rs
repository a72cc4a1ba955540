//! Fixed-size background worker pool.
//!
//! A handful of worker threads pull jobs off a shared mpsc channel.
//! Image edits and histogram computations are coarse units of work, so a
//! small pool with a simple FIFO queue is all the scheduling this needs.
//!
//! [`WorkerPool::shared`] returns the process-wide pool used by
//! [`AsyncTask::spawn`](crate::AsyncTask::spawn); tests and embedders
//! can create private pools with [`WorkerPool::new`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;

use tracing::{debug, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed pool of background worker threads.
///
/// Jobs are executed FIFO. Dropping the pool closes the queue and joins
/// the workers after they drain any jobs already submitted.
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Creates a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        debug!(threads, "starting worker pool");

        let workers = (0..threads)
            .map(|i| {
                let rx = Arc::clone(&rx);
                std::thread::Builder::new()
                    .name(format!("lumin-worker-{i}"))
                    .spawn(move || worker_loop(&rx))
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
            })
            .collect();

        Self { tx: Some(tx), workers }
    }

    /// Returns the process-wide shared pool.
    ///
    /// Sized to the available parallelism minus one (the render thread
    /// keeps a core), with at least one worker.
    pub fn shared() -> &'static WorkerPool {
        static POOL: OnceLock<WorkerPool> = OnceLock::new();
        POOL.get_or_init(|| {
            let threads = std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1);
            WorkerPool::new(threads)
        })
    }

    /// Submits a job for background execution.
    ///
    /// Never blocks; the job is queued if all workers are busy.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.tx {
            // The receiver outlives all senders except during drop.
            let _ = tx.send(Box::new(job));
        }
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(rx: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let Ok(guard) = rx.lock() else { return };
            guard.recv()
        };
        match job {
            Ok(job) => {
                trace!("worker picked up job");
                job();
            }
            // Channel closed: pool is shutting down.
            Err(_) => return,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain and exit.
        self.tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.workers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_jobs_run() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        // Dropping joins after the queue drains.
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_at_least_one_worker() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.threads(), 1);
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        pool.spawn(move || {
            d.store(1, Ordering::SeqCst);
        });
        drop(pool);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_pool_is_singleton() {
        let a = WorkerPool::shared();
        let b = WorkerPool::shared();
        assert!(std::ptr::eq(a, b));
        assert!(a.threads() >= 1);
    }

    #[test]
    fn test_parallel_execution() {
        // Two long jobs on two workers should overlap.
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.spawn(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
