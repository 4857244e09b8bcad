//! Engine configuration: [`NavConfig`] and the material cost policy.

use crate::error::NavError;

/// Maps a material's structural strength to a transition cost.
///
/// Moving one node width through a material of strength `s` costs
/// `1 + s * cost_per_strength`. Materials stronger than
/// `unpathable_strength` cannot be crossed by any query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MaterialCostTable {
    pub cost_per_strength: f32,
    pub unpathable_strength: f32,
}

impl Default for MaterialCostTable {
    fn default() -> Self {
        Self {
            cost_per_strength: 0.05,
            unpathable_strength: 1000.0,
        }
    }
}

impl MaterialCostTable {
    /// Extra cost per node width for moving through a material of the given
    /// strength. Infinite above the unpathable threshold.
    #[inline]
    pub fn transition_cost(&self, strength: f32) -> f32 {
        if strength > self.unpathable_strength {
            f32::INFINITY
        } else {
            strength.max(0.0) * self.cost_per_strength
        }
    }
}

/// Tunables for a [`PathEngine`](crate::PathEngine).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Pixels per grid cell edge. Coarser grids are faster but less precise.
    pub node_dimension: i32,
    /// Soft budget of nodes recosted per [`update_pathing`] call.
    ///
    /// [`update_pathing`]: crate::PathEngine::update_pathing
    pub node_update_limit: usize,
    /// Smallest per-edge cost delta that counts as a change.
    pub cost_epsilon: f32,
    pub material_costs: MaterialCostTable,
    /// Threads servicing async requests.
    pub worker_threads: usize,
    /// Bound on queued async requests; submitting blocks while full.
    /// `None` queues without limit.
    pub queue_capacity: Option<usize>,
    /// How many rings around a blocked endpoint are searched for a
    /// navigable replacement node.
    pub navigable_search_radius: i32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            node_dimension: 20,
            node_update_limit: 256,
            cost_epsilon: 0.01,
            material_costs: MaterialCostTable::default(),
            worker_threads: 2,
            queue_capacity: None,
            navigable_search_radius: 3,
        }
    }
}

impl NavConfig {
    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.node_dimension <= 0 {
            return Err(NavError::InvalidNodeDimension(self.node_dimension));
        }
        if !self.cost_epsilon.is_finite() || self.cost_epsilon < 0.0 {
            return Err(invalid("cost_epsilon", "must be finite and >= 0"));
        }
        let costs = &self.material_costs;
        if !costs.cost_per_strength.is_finite() || costs.cost_per_strength <= 0.0 {
            return Err(invalid(
                "material_costs.cost_per_strength",
                "must be finite and > 0",
            ));
        }
        if costs.unpathable_strength.is_nan() {
            return Err(invalid("material_costs.unpathable_strength", "is NaN"));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "must be at least 1"));
        }
        if self.queue_capacity == Some(0) {
            return Err(invalid("queue_capacity", "must be at least 1 when set"));
        }
        if self.navigable_search_radius < 0 {
            return Err(invalid("navigable_search_radius", "must be >= 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> NavError {
    NavError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}
