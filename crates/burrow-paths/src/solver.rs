use std::collections::BinaryHeap;

use crate::traits::{Edge, Graph, StateId};

const NO_PARENT: usize = usize::MAX;

/// Outcome of a [`Solver::solve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    Solved,
    NoSolution,
    StartEndSame,
}

/// Result of a search: the state sequence from start to goal and its cost.
///
/// `path` is empty unless `status` is [`SolveStatus::Solved`].
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    pub path: Vec<StateId>,
    pub cost: f32,
}

impl Solution {
    fn unsolved(status: SolveStatus) -> Self {
        Self {
            status,
            path: Vec::new(),
            cost: 0.0,
        }
    }
}

/// Counters kept by a solver across its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub solves: u64,
    pub resets: u64,
    /// States whose adjacency is currently cached.
    pub cached_states: usize,
}

// ---------------------------------------------------------------------------
// Internal search records
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Node {
    g: f32,
    parent: usize,
    generation: u32,
    open: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            g: 0.0,
            parent: NO_PARENT,
            generation: 0,
            open: false,
        }
    }
}

/// Open-list entry, ordered so `BinaryHeap` pops the smallest `f` first.
/// Equal `f` falls back to the smaller state id, keeping searches
/// deterministic.
#[derive(Clone, Copy)]
struct NodeRef {
    idx: usize,
    f: f32,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for NodeRef {}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// A reusable A* solver.
///
/// Node records are invalidated lazily by bumping a generation counter, so a
/// solve never clears the whole array. Adjacency lists fetched from the graph
/// are cached per state and reused by every later solve until [`reset`].
///
/// [`reset`]: Solver::reset
pub struct Solver {
    nodes: Vec<Node>,
    generation: u32,
    adjacency: Vec<Option<Box<[Edge]>>>,
    open: BinaryHeap<NodeRef>,
    ebuf: Vec<Edge>,
    stats: SolverStats,
}

impl Solver {
    /// Create a solver sized for `state_count` states.
    pub fn new(state_count: usize) -> Self {
        Self {
            nodes: vec![Node::default(); state_count],
            generation: 0,
            adjacency: vec![None; state_count],
            open: BinaryHeap::new(),
            ebuf: Vec::with_capacity(8),
            stats: SolverStats::default(),
        }
    }

    /// Number of states this solver is sized for.
    #[inline]
    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Drop every cached adjacency list and node record.
    ///
    /// Required after the graph's edges change; a solver that kept its cache
    /// would keep searching the old graph.
    pub fn reset(&mut self) {
        for slot in self.adjacency.iter_mut() {
            *slot = None;
        }
        for n in self.nodes.iter_mut() {
            *n = Node::default();
        }
        self.generation = 0;
        self.open.clear();
        self.stats.cached_states = 0;
        self.stats.resets += 1;
    }

    /// Resize to `state_count` states, dropping all cached state.
    pub fn resize(&mut self, state_count: usize) {
        self.nodes.clear();
        self.nodes.resize(state_count, Node::default());
        self.adjacency.clear();
        self.adjacency.resize(state_count, None);
        self.generation = 0;
        self.open.clear();
        self.stats.cached_states = 0;
        self.stats.resets += 1;
    }

    /// Find the cheapest path from `start` to `goal`.
    ///
    /// Edges whose `barrier` exceeds `clearance` are skipped for this query
    /// only. Pass `f32::INFINITY` to allow every finite edge.
    ///
    /// # Panics
    ///
    /// If `start` or `goal` is not a state of `graph`.
    pub fn solve<G: Graph>(
        &mut self,
        graph: &G,
        start: StateId,
        goal: StateId,
        clearance: f32,
    ) -> Solution {
        if graph.state_count() != self.nodes.len() {
            self.resize(graph.state_count());
        }
        assert!(
            start < self.nodes.len() && goal < self.nodes.len(),
            "state handle out of range"
        );
        self.stats.solves += 1;

        if start == goal {
            return Solution::unsolved(SolveStatus::StartEndSame);
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Wrapped: old stamps could collide with the new generation.
            for n in self.nodes.iter_mut() {
                n.generation = 0;
            }
            self.generation = 1;
        }
        let cur_gen = self.generation;

        {
            let node = &mut self.nodes[start];
            node.g = 0.0;
            node.parent = NO_PARENT;
            node.generation = cur_gen;
            node.open = true;
        }

        self.open.clear();
        self.open.push(NodeRef {
            idx: start,
            f: graph.least_cost_estimate(start, goal),
        });

        let found = 'search: loop {
            let Some(current) = self.open.pop() else {
                break 'search false;
            };
            let ci = current.idx;

            // Skip stale entries.
            if self.nodes[ci].generation != cur_gen || !self.nodes[ci].open {
                continue;
            }
            if ci == goal {
                break 'search true;
            }

            self.nodes[ci].open = false;
            let current_g = self.nodes[ci].g;

            if self.adjacency[ci].is_none() {
                self.ebuf.clear();
                graph.adjacent_cost(ci, &mut self.ebuf);
                self.adjacency[ci] = Some(self.ebuf.as_slice().into());
                self.stats.cached_states += 1;
            }
            let Some(edges) = self.adjacency[ci].as_deref() else {
                continue;
            };

            for edge in edges {
                if edge.barrier > clearance || !edge.cost.is_finite() {
                    continue;
                }
                let ni = edge.to;
                let tentative_g = current_g + edge.cost;

                let n = &mut self.nodes[ni];
                if n.generation == cur_gen {
                    if tentative_g >= n.g {
                        continue;
                    }
                } else {
                    n.generation = cur_gen;
                }

                n.g = tentative_g;
                n.parent = ci;
                n.open = true;
                self.open.push(NodeRef {
                    idx: ni,
                    f: tentative_g + graph.least_cost_estimate(ni, goal),
                });
            }
        };

        if !found {
            return Solution::unsolved(SolveStatus::NoSolution);
        }

        let mut path = Vec::new();
        let mut ci = goal;
        while ci != NO_PARENT {
            path.push(ci);
            ci = self.nodes[ci].parent;
        }
        path.reverse();
        Solution {
            status: SolveStatus::Solved,
            path,
            cost: self.nodes[goal].g,
        }
    }
}
