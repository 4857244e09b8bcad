//! Bridges the [`CostGrid`] to the generic [`Solver`], and keeps one solver
//! per calling thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use burrow_paths::{Edge, Graph, Solver, StateId};
use parking_lot::Mutex;

use crate::grid::{CostGrid, Direction, NodeId};

/// Cheapest possible cost per node width: open air.
pub const MIN_COST_PER_NODE: f32 = 1.0;

/// Read-only graph view of a cost grid.
///
/// Non-navigable nodes have no edges at all: none leave them and none lead
/// into them.
pub struct GridGraph<'a> {
    grid: &'a CostGrid,
}

impl<'a> GridGraph<'a> {
    pub fn new(grid: &'a CostGrid) -> Self {
        Self { grid }
    }
}

impl Graph for GridGraph<'_> {
    fn state_count(&self) -> usize {
        self.grid.len()
    }

    /// Straight-line distance as if everything were air.
    fn least_cost_estimate(&self, from: StateId, to: StateId) -> f32 {
        self.grid.node_distance(from, to) * MIN_COST_PER_NODE
    }

    fn adjacent_cost(&self, state: StateId, out: &mut Vec<Edge>) {
        let node = self.grid.node(state);
        if !node.navigable {
            return;
        }
        for dir in Direction::ALL {
            let i = dir.index();
            let Some(n) = node.neighbors[i] else {
                continue;
            };
            if !self.grid.node(n).navigable || !node.costs[i].is_finite() {
                continue;
            }
            out.push(Edge {
                to: n,
                cost: node.costs[i],
                barrier: node.barriers[i],
            });
        }
    }
}

// ---------------------------------------------------------------------------
// SolverPool
// ---------------------------------------------------------------------------

/// Lifecycle of one thread's solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// The thread has not searched yet.
    Uninitialized,
    /// In step with the current grid.
    Ready,
    /// Costs changed since the solver last reset; it resets on next use.
    Stale,
}

struct ThreadSolver {
    solver: Solver,
    /// Grid generation the solver was last reset against.
    generation: u64,
}

type SolverMap = Mutex<HashMap<ThreadId, Arc<Mutex<ThreadSolver>>>>;

thread_local! {
    static EXIT_GUARD: RefCell<ExitGuard> = RefCell::new(ExitGuard::default());
}

/// Removes the owning thread's solvers from every live pool when the thread
/// exits.
#[derive(Default)]
struct ExitGuard {
    thread: Option<ThreadId>,
    pools: Vec<Weak<SolverMap>>,
}

impl ExitGuard {
    fn register(&mut self, thread: ThreadId, pool: &Arc<SolverMap>) {
        self.thread = Some(thread);
        self.pools.retain(|p| p.strong_count() > 0);
        let pool = Arc::downgrade(pool);
        if !self.pools.iter().any(|p| p.ptr_eq(&pool)) {
            self.pools.push(pool);
        }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let Some(thread) = self.thread else {
            return;
        };
        for pool in self.pools.drain(..).filter_map(|p| p.upgrade()) {
            pool.lock().remove(&thread);
        }
    }
}

/// One [`Solver`] per thread, created lazily and reset lazily.
///
/// A thread's solver is dropped when the thread exits. The map lock is only
/// held to look a solver up. Each solver sits behind its own mutex, taken by
/// its owning thread for searches and briefly by
/// [`solver_state`](Self::solver_state).
pub struct SolverPool {
    solvers: Arc<SolverMap>,
    generation: AtomicU64,
}

impl Default for SolverPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverPool {
    pub fn new() -> Self {
        Self {
            solvers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Current grid generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Mark every existing solver stale. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Run `f` with the calling thread's solver, creating it on first use
    /// and resetting it first if it is stale.
    pub fn with_pather<R>(&self, state_count: usize, f: impl FnOnce(&mut Solver) -> R) -> R {
        let me = thread::current().id();
        let slot = {
            let mut solvers = self.solvers.lock();
            let generation = self.generation();
            Arc::clone(solvers.entry(me).or_insert_with(|| {
                log::debug!("creating pathing solver for {me:?}");
                let registered = EXIT_GUARD.try_with(|guard| guard.borrow_mut().register(me, &self.solvers));
                if registered.is_err() {
                    log::warn!("{me:?} is exiting; its pathing solver will outlive it");
                }
                Arc::new(Mutex::new(ThreadSolver {
                    solver: Solver::new(state_count),
                    generation,
                }))
            }))
        };

        let mut ts = slot.lock();
        let current = self.generation();
        if ts.generation != current {
            log::debug!(
                "resetting stale solver on {me:?} (generation {} -> {current})",
                ts.generation
            );
            if ts.solver.state_count() == state_count {
                ts.solver.reset();
            } else {
                ts.solver.resize(state_count);
            }
            ts.generation = current;
        }
        f(&mut ts.solver)
    }

    /// Lifecycle state of `thread`'s solver.
    pub fn solver_state(&self, thread: ThreadId) -> SolverState {
        let slot = match self.solvers.lock().get(&thread) {
            Some(slot) => Arc::clone(slot),
            None => return SolverState::Uninitialized,
        };
        if slot.lock().generation == self.generation() {
            SolverState::Ready
        } else {
            SolverState::Stale
        }
    }

    /// Drop the calling thread's solver, e.g. before the thread exits.
    pub fn release_current_thread(&self) {
        self.solvers.lock().remove(&thread::current().id());
    }

    /// Number of threads holding a solver.
    pub fn thread_count(&self) -> usize {
        self.solvers.lock().len()
    }
}
