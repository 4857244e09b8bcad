/// Opaque state handle. The graph decides what it means.
pub type StateId = usize;

/// One outgoing edge reported by [`Graph::adjacent_cost`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// Destination state.
    pub to: StateId,
    /// Cost of taking the edge. Must be >= 0; infinite edges are never taken.
    pub cost: f32,
    /// Clearance a query needs to take this edge at all.
    ///
    /// Queries with a lower clearance skip the edge without the solver's
    /// cached adjacency being touched.
    pub barrier: f32,
}

/// A graph the [`Solver`](crate::Solver) can search.
pub trait Graph {
    /// Number of states. Valid handles are `0..state_count()`.
    fn state_count(&self) -> usize;

    /// Estimate of the cost from `from` to `to`.
    /// Must never overestimate the true cost (admissible).
    fn least_cost_estimate(&self, from: StateId, to: StateId) -> f32;

    /// Append every edge leaving `state` into `out`. The caller clears `out`
    /// before calling.
    fn adjacent_cost(&self, state: StateId, out: &mut Vec<Edge>);
}
