//! Fixed-size pool of worker threads.
//!
//! Workers either consume a shared work queue ([`WorkerPool::spawn_consumers`])
//! or run a self-driven loop such as a query client
//! ([`WorkerPool::spawn_tasks`]). [`WorkerPool::join`] waits for every
//! thread and returns the first failure.

use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use crate::error::{BenchError, Result};

/// Handle to a set of running worker threads
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    handles: Vec<JoinHandle<Result<u64>>>,
}

impl WorkerPool {
    /// Spawn `workers` threads, each running the task built by `make_task(i)`.
    ///
    /// Each task returns the number of work units it completed.
    pub fn spawn_tasks<F, T>(name: &str, workers: usize, mut make_task: F) -> Result<Self>
    where
        F: FnMut(usize) -> T,
        T: FnOnce() -> Result<u64> + Send + 'static,
    {
        if workers == 0 {
            return Err(BenchError::config(
                "workers",
                format!("pool '{}' needs at least one worker", name),
            ));
        }

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let task = make_task(i);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn(task)?;
            handles.push(handle);
        }

        debug!("Started {} '{}' workers", workers, name);
        Ok(Self {
            name: name.to_string(),
            handles,
        })
    }

    /// Spawn `workers` threads that drain `receiver`.
    ///
    /// `make_handler(i)` builds the per-worker handler on the calling thread,
    /// so each worker may own mutable state. The first handler error stops
    /// every worker before its next item; items still queued are dropped.
    pub fn spawn_consumers<T, F, H>(
        name: &str,
        workers: usize,
        receiver: Receiver<T>,
        mut make_handler: F,
    ) -> Result<Self>
    where
        T: Send + 'static,
        F: FnMut(usize) -> H,
        H: FnMut(T) -> Result<()> + Send + 'static,
    {
        let failed = Arc::new(AtomicBool::new(false));

        Self::spawn_tasks(name, workers, |i| {
            let receiver = receiver.clone();
            let failed = Arc::clone(&failed);
            let mut handler = make_handler(i);
            move || {
                let mut handled = 0u64;
                for item in receiver.iter() {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(e) = handler(item) {
                        failed.store(true, Ordering::Release);
                        return Err(e);
                    }
                    handled += 1;
                }
                Ok(handled)
            }
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker; total units completed, or the first error
    pub fn join(self) -> Result<u64> {
        let Self { name, handles } = self;
        let mut total = 0u64;
        let mut first_error = None;

        for (i, handle) in handles.into_iter().enumerate() {
            let worker = format!("{}-{}", name, i);
            match handle.join() {
                Ok(Ok(handled)) => total += handled,
                Ok(Err(e)) => {
                    error!("Worker {} failed: {}", worker, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(_) => {
                    error!("Worker {} panicked", worker);
                    if first_error.is_none() {
                        first_error = Some(BenchError::WorkerPanicked(worker));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}
