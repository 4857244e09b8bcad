//! Path query results and the shared, write-once [`PathRequest`].

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use burrow_core::Vector;
use burrow_paths::SolveStatus;
use parking_lot::{Condvar, Mutex};

/// Outcome of a path query. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathStatus {
    Solved,
    NoSolution,
    StartEndSame,
}

impl From<SolveStatus> for PathStatus {
    fn from(s: SolveStatus) -> Self {
        match s {
            SolveStatus::Solved => PathStatus::Solved,
            SolveStatus::NoSolution => PathStatus::NoSolution,
            SolveStatus::StartEndSame => PathStatus::StartEndSame,
        }
    }
}

/// A finished path query.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult {
    pub status: PathStatus,
    /// World-space points from start to goal; empty unless solved.
    pub waypoints: Vec<Vector>,
    /// Sum of the distances between consecutive waypoints, in pixels.
    pub total_length: f32,
    /// Sum of the traversed edge costs.
    pub total_cost: f32,
}

impl PathResult {
    pub(crate) fn unsolved(status: PathStatus) -> Self {
        Self {
            status,
            waypoints: Vec::new(),
            total_length: 0.0,
            total_cost: 0.0,
        }
    }

    #[inline]
    pub fn is_solved(&self) -> bool {
        self.status == PathStatus::Solved
    }
}

/// Invoked once, on the completing thread, when an async request finishes.
pub type PathCallback = Box<dyn FnOnce(Arc<PathRequest>) + Send + 'static>;

/// One path query, shared between the caller and the thread solving it.
///
/// The result is published exactly once; observers either poll
/// [`is_complete`](Self::is_complete) / [`result`](Self::result) or block
/// in [`wait`](Self::wait). Anything that sees the request complete also
/// sees the whole result.
#[derive(Debug)]
pub struct PathRequest {
    start: Vector,
    end: Vector,
    dig_strength: f32,
    result: OnceLock<PathResult>,
    lock: Mutex<()>,
    done: Condvar,
}

impl PathRequest {
    pub(crate) fn new(start: Vector, end: Vector, dig_strength: f32) -> Self {
        Self {
            start,
            end,
            dig_strength,
            result: OnceLock::new(),
            lock: Mutex::new(()),
            done: Condvar::new(),
        }
    }

    #[inline]
    pub fn start(&self) -> Vector {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Vector {
        self.end
    }

    #[inline]
    pub fn dig_strength(&self) -> f32 {
        self.dig_strength
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.result.get().is_some()
    }

    /// The result, once complete.
    #[inline]
    pub fn result(&self) -> Option<&PathResult> {
        self.result.get()
    }

    /// Block until the result is published.
    pub fn wait(&self) -> &PathResult {
        let mut guard = self.lock.lock();
        loop {
            if let Some(r) = self.result.get() {
                return r;
            }
            self.done.wait(&mut guard);
        }
    }

    /// Block up to `timeout` for the result.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<&PathResult> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        loop {
            if let Some(r) = self.result.get() {
                return Some(r);
            }
            if self.done.wait_until(&mut guard, deadline).timed_out() {
                return self.result.get();
            }
        }
    }

    /// Publish the result. Returns `false`, leaving the first result in
    /// place, if one was already published.
    pub(crate) fn complete(&self, result: PathResult) -> bool {
        if self.result.set(result).is_err() {
            log::error!("path request {:?} -> {:?} completed twice", self.start, self.end);
            return false;
        }
        let _guard = self.lock.lock();
        self.done.notify_all();
        true
    }
}
