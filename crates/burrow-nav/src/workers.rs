//! Threads servicing async path requests.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::error::NavError;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed set of named threads draining a shared job queue.
///
/// Dropping the pool closes the queue; jobs already queued still run before
/// the threads exit and are joined.
pub(crate) struct WorkerPool {
    tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers. `on_exit` runs on each worker as it stops.
    pub(crate) fn spawn(
        threads: usize,
        capacity: Option<usize>,
        on_exit: Arc<dyn Fn() + Send + Sync>,
    ) -> Result<Self, NavError> {
        let (tx, rx) = match capacity {
            Some(cap) => bounded::<Job>(cap),
            None => unbounded::<Job>(),
        };

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let rx: Receiver<Job> = rx.clone();
            let on_exit = Arc::clone(&on_exit);
            let handle = thread::Builder::new()
                .name(format!("pathing-{i}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                    on_exit();
                })
                .map_err(|e| NavError::WorkerSpawn(e.to_string()))?;
            handles.push(handle);
        }
        log::debug!("spawned {threads} pathing workers");

        Ok(Self {
            tx: Some(tx),
            handles,
        })
    }

    /// Queue a job, blocking while a bounded queue is full.
    ///
    /// Hands the job back if the queue is closed.
    pub(crate) fn execute(&self, job: Job) -> Result<(), Job> {
        match &self.tx {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    /// Jobs waiting for a worker.
    pub(crate) fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.len())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("pathing worker panicked");
            }
        }
    }
}
