//! Graph search for the burrow pathfinding engine.
//!
//! The search knows nothing about grids or terrain: a caller exposes its
//! world through the [`Graph`] trait (an admissible heuristic plus an
//! adjacency callback over opaque integer states) and drives a [`Solver`].
//!
//! A [`Solver`] owns all of its bookkeeping: generation-stamped node records
//! and a cache of every state's adjacency list. The adjacency cache is what
//! makes repeated queries cheap, and it is also why a solver must be
//! [`reset`](Solver::reset) whenever the graph's edge costs change.
//!
//! Solvers are `Send` but deliberately not shared: one solver per thread.

mod solver;
mod traits;

pub use solver::{Solution, SolveStatus, Solver, SolverStats};
pub use traits::{Edge, Graph, StateId};
