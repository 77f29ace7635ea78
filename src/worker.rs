//! Background Worker
//!
//! One dedicated thread that runs disk-heavy cache operations off the
//! caller's thread. Scheduling returns a [`TaskHandle`] that resolves when
//! the job has finished; dropping the handle does not cancel the job.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single background thread consuming scheduled jobs in order.
///
/// Jobs are executed strictly in scheduling order, so a `flush` scheduled
/// before a `clear_all` observes the state from before the clear. Dropping
/// the worker closes the queue and joins the thread, letting already
/// scheduled jobs finish.
pub(crate) struct Worker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn new() -> Worker {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("rcache-worker".into())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .expect("failed to spawn cache worker thread");
        Worker {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Schedules `f` on the worker and returns a handle to its result.
    pub(crate) fn schedule<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            // The receiver may have been dropped; the job still ran.
            let _ = tx.send(f());
        });
        if let Some(queue) = &self.tx {
            if queue.send(job).is_err() {
                warn!("cache worker is gone, dropping scheduled job");
            }
        }
        TaskHandle { rx }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the sender ends the worker's receive loop after the
        // remaining jobs drain.
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("cache worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("alive", &self.handle.is_some())
            .finish()
    }
}

/// Completion handle for a background cache operation.
///
/// Obtain one from [`TieredCache::flush`](crate::TieredCache::flush),
/// [`TieredCache::file_size`](crate::TieredCache::file_size) or
/// [`TieredCache::clear_all`](crate::TieredCache::clear_all); it resolves
/// once the scheduled work has run. Dropping the handle does not cancel the
/// work.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Returns the result if the job has already finished, without blocking.
    pub fn try_wait(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T: Default> TaskHandle<T> {
    /// Blocks until the job finishes and returns its result.
    ///
    /// If the worker was torn down before the job could run, the default
    /// value (`false` / `0`) is returned, reporting the work as not done.
    pub fn wait(self) -> T {
        self.rx.recv().unwrap_or_else(|_| {
            warn!("background job result lost, reporting as not done");
            T::default()
        })
    }
}
