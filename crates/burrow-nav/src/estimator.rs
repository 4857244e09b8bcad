//! Turns terrain materials into edge costs.

use burrow_core::wrap::wrap_index;
use burrow_core::{Point, Vector};

use crate::config::MaterialCostTable;
use crate::grid::{CostGrid, Direction, GridNode, NodeId};
use crate::terrain::{AIR, MaterialId, Terrain};

/// The most obstructive material found along a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrongestMaterial {
    pub id: MaterialId,
    pub strength: f32,
}

/// Computes node edge costs from the terrain.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    costs: MaterialCostTable,
    epsilon: f32,
}

impl CostEstimator {
    pub fn new(costs: MaterialCostTable, epsilon: f32) -> Self {
        Self { costs, epsilon }
    }

    #[inline]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Walk the pixels from `start` to `end` and return the strongest
    /// non-air material, or `None` when the segment is clear.
    ///
    /// Pixels off a non-wrapping border are skipped.
    pub fn strongest_material_along_line(
        &self,
        terrain: &dyn Terrain,
        start: Vector,
        end: Vector,
    ) -> Option<StrongestMaterial> {
        let size = terrain.size()?;
        let (wrap_x, wrap_y) = (terrain.wraps_x(), terrain.wraps_y());

        let d = end - start;
        let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0) as i32;
        let mut pixels = Vec::with_capacity(steps as usize + 1);
        let mut last: Option<Point> = None;

        for i in 0..=steps {
            let p = (start + d * (i as f32 / steps as f32)).floor();
            if last == Some(p) {
                continue;
            }
            last = Some(p);

            let x = if wrap_x { wrap_index(p.x, size.x) } else { p.x };
            let y = if wrap_y { wrap_index(p.y, size.y) } else { p.y };
            if x < 0 || x >= size.x || y < 0 || y >= size.y {
                continue;
            }
            pixels.push(Point::new(x, y));
        }

        let mut materials = Vec::with_capacity(pixels.len());
        terrain.materials_at(&pixels, &mut materials);

        let mut best: Option<StrongestMaterial> = None;
        for id in materials {
            if id == AIR || best.is_some_and(|b| b.id == id) {
                continue;
            }
            let strength = terrain.strength(id);
            if best.is_none_or(|b| strength > b.strength) {
                best = Some(StrongestMaterial { id, strength });
            }
        }
        best
    }

    /// Extra cost per node width for crossing `material`. Zero for clear
    /// passage, infinite for materials past the unpathable threshold.
    #[inline]
    pub fn material_transition_cost(&self, material: Option<StrongestMaterial>) -> f32 {
        material.map_or(0.0, |m| self.costs.transition_cost(m.strength))
    }

    /// Recompute all outgoing edges of node `id` from the terrain.
    ///
    /// Returns whether any edge's cost or barrier moved by at least the
    /// configured epsilon. The new values are stored either way.
    pub fn update_node_costs(&self, grid: &mut CostGrid, terrain: &dyn Terrain, id: NodeId) -> bool {
        let node = grid.node(id);
        let start = node.pos;

        let mut costs = [f32::INFINITY; 8];
        let mut barriers = [f32::INFINITY; 8];
        let mut materials = [AIR; 8];
        for dir in Direction::ALL {
            let Some(neighbor) = node.neighbor(dir) else {
                continue;
            };
            // Toward the neighbor's center; across a wrap seam that can be
            // nearer than a full node width.
            let end = start + grid.world_delta(start, grid.node(neighbor).pos);
            let strongest = self.strongest_material_along_line(terrain, start, end);

            let i = dir.index();
            costs[i] = dir.step_length() * (1.0 + self.material_transition_cost(strongest));
            barriers[i] = strongest.map_or(0.0, |m| m.strength);
            materials[i] = strongest.map_or(AIR, |m| m.id);
        }

        let node = grid.node_mut(id);
        let changed = (0..8).any(|i| {
            differs(node.costs[i], costs[i], self.epsilon)
                || differs(node.barriers[i], barriers[i], self.epsilon)
        });
        node.costs = costs;
        node.barriers = barriers;
        node.materials = materials;
        changed
    }

    /// Mean of the node's finite outgoing costs; infinite if it has none.
    pub fn node_average_transition_cost(&self, node: &GridNode) -> f32 {
        let (sum, count) = node
            .costs
            .iter()
            .filter(|c| c.is_finite())
            .fold((0.0, 0u32), |(s, n), c| (s + c, n + 1));
        if count == 0 {
            f32::INFINITY
        } else {
            sum / count as f32
        }
    }
}

fn differs(old: f32, new: f32, epsilon: f32) -> bool {
    if old.is_finite() && new.is_finite() {
        old != new && (old - new).abs() >= epsilon
    } else {
        old.is_finite() != new.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainMap;
    use burrow_core::Range;
    use std::f32::consts::SQRT_2;

    fn estimator() -> CostEstimator {
        CostEstimator::new(
            MaterialCostTable {
                cost_per_strength: 0.1,
                unpathable_strength: 500.0,
            },
            0.01,
        )
    }

    #[test]
    fn clear_line_has_no_material() {
        let map = TerrainMap::new(50, 50);
        let est = estimator();
        assert_eq!(
            est.strongest_material_along_line(&map, Vector::new(5.0, 5.0), Vector::new(45.0, 45.0)),
            None
        );
    }

    #[test]
    fn picks_strongest_on_line() {
        let mut map = TerrainMap::new(50, 10);
        let dirt = map.add_material("Dirt", 10.0);
        let rock = map.add_material("Rock", 90.0);
        map.fill(Range::new(10, 0, 12, 10), dirt);
        map.fill(Range::new(30, 0, 31, 10), rock);
        let est = estimator();

        let m = est.strongest_material_along_line(&map, Vector::new(0.5, 5.0), Vector::new(49.5, 5.0));
        assert_eq!(m, Some(StrongestMaterial { id: rock, strength: 90.0 }));

        let m = est.strongest_material_along_line(&map, Vector::new(0.5, 5.0), Vector::new(20.5, 5.0));
        assert_eq!(m.map(|m| m.id), Some(dirt));
    }

    #[test]
    fn line_wraps_across_seam() {
        let mut map = TerrainMap::new(50, 10).with_wrap(true, false);
        let rock = map.add_material("Rock", 90.0);
        map.fill(Range::new(1, 0, 2, 10), rock);
        let est = estimator();
        // From x=45 going right by 10 passes x=1 after wrapping.
        let m = est.strongest_material_along_line(&map, Vector::new(45.5, 5.0), Vector::new(55.5, 5.0));
        assert_eq!(m.map(|m| m.id), Some(rock));
    }

    #[test]
    fn transition_cost_policy() {
        let est = estimator();
        assert_eq!(est.material_transition_cost(None), 0.0);
        let weak = StrongestMaterial { id: 1, strength: 10.0 };
        let strong = StrongestMaterial { id: 2, strength: 100.0 };
        let solid = StrongestMaterial { id: 3, strength: 900.0 };
        assert!(est.material_transition_cost(Some(strong)) > est.material_transition_cost(Some(weak)));
        assert!(est.material_transition_cost(Some(solid)).is_infinite());
    }

    #[test]
    fn node_costs_follow_material() {
        let mut map = TerrainMap::new(30, 30);
        let rock = map.add_material("Rock", 50.0);
        // Wall between node (1,1) and node (2,1).
        map.fill(Range::new(20, 10, 21, 20), rock);
        let mut grid = CostGrid::new(10, map.size(), false, false).unwrap();
        let est = estimator();

        let center = grid.convert_coords_to_node_id(1, 1);
        assert!(est.update_node_costs(&mut grid, &map, center));
        let node = grid.node(center);
        assert!((node.cost(Direction::Right) - 6.0).abs() < 1e-5);
        assert_eq!(node.barriers[Direction::Right.index()], 50.0);
        assert_eq!(node.materials[Direction::Right.index()], rock);
        assert!((node.cost(Direction::Left) - 1.0).abs() < 1e-6);
        assert!((node.cost(Direction::UpLeft) - SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn seam_edge_stops_at_neighbor_center() {
        // 105 pixels wrap onto 11 columns; the last column's center sits at
        // x=105, five pixels from the first column's center at x=5.
        let mut map = TerrainMap::new(105, 30).with_wrap(true, false);
        let rock = map.add_material("Rock", 50.0);
        map.fill(Range::new(6, 0, 10, 30), rock);
        let mut grid = CostGrid::new(10, map.size(), true, false).unwrap();
        let est = estimator();

        let last = grid.convert_coords_to_node_id(10, 1);
        est.update_node_costs(&mut grid, &map, last);
        let node = grid.node(last);
        assert!((node.cost(Direction::Right) - 1.0).abs() < 1e-6);
        assert_eq!(node.barriers[Direction::Right.index()], 0.0);
        assert!((node.cost(Direction::Left) - 1.0).abs() < 1e-6);

        // The rock is on the first column's own rightward edge.
        let first = grid.convert_coords_to_node_id(0, 1);
        est.update_node_costs(&mut grid, &map, first);
        assert_eq!(grid.node(first).materials[Direction::Right.index()], rock);
    }

    #[test]
    fn segments_read_terrain_in_one_batch() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting {
            map: TerrainMap,
            single: AtomicUsize,
            batches: AtomicUsize,
        }

        impl Terrain for Counting {
            fn size(&self) -> Option<Point> {
                self.map.size()
            }
            fn wraps_x(&self) -> bool {
                self.map.wraps_x()
            }
            fn wraps_y(&self) -> bool {
                self.map.wraps_y()
            }
            fn material_at(&self, p: Point) -> MaterialId {
                self.single.fetch_add(1, Ordering::Relaxed);
                self.map.material_at(p)
            }
            fn materials_at(&self, pixels: &[Point], out: &mut Vec<MaterialId>) {
                self.batches.fetch_add(1, Ordering::Relaxed);
                self.map.materials_at(pixels, out);
            }
            fn strength(&self, id: MaterialId) -> f32 {
                self.map.strength(id)
            }
        }

        let mut map = TerrainMap::new(50, 30);
        let rock = map.add_material("Rock", 90.0);
        map.fill(Range::new(30, 0, 31, 10), rock);
        let terrain = Counting {
            map,
            single: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        };
        let est = estimator();

        let m = est.strongest_material_along_line(&terrain, Vector::new(0.5, 5.0), Vector::new(49.5, 5.0));
        assert_eq!(m.map(|m| m.id), Some(rock));
        assert_eq!(terrain.batches.load(Ordering::Relaxed), 1);
        assert_eq!(terrain.single.load(Ordering::Relaxed), 0);

        let mut grid = CostGrid::new(10, terrain.size(), false, false).unwrap();
        let id = grid.convert_coords_to_node_id(2, 0);
        est.update_node_costs(&mut grid, &terrain, id);
        // One batch per existing neighbor: five on the top row.
        assert_eq!(terrain.batches.load(Ordering::Relaxed), 6);
        assert_eq!(terrain.single.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn epsilon_gates_change_detection() {
        let mut map = TerrainMap::new(30, 30);
        let grit = map.add_material("Grit", 0.05);
        let rock = map.add_material("Rock", 1.0);
        let mut grid = CostGrid::new(10, map.size(), false, false).unwrap();
        let est = CostEstimator::new(
            MaterialCostTable {
                cost_per_strength: 0.1,
                unpathable_strength: 500.0,
            },
            0.1,
        );
        let id = grid.convert_coords_to_node_id(1, 1);
        // Fresh grid already holds air costs.
        assert!(!est.update_node_costs(&mut grid, &map, id));

        // Grit moves costs by 0.005 and the barrier by 0.05: below epsilon.
        map.set(Point::new(25, 15), grit);
        assert!(!est.update_node_costs(&mut grid, &map, id));
        assert_eq!(grid.node(id).materials[Direction::Right.index()], grit);

        // Rock moves the barrier by a full unit.
        map.set(Point::new(25, 15), rock);
        assert!(est.update_node_costs(&mut grid, &map, id));
        assert!(!est.update_node_costs(&mut grid, &map, id));
    }

    #[test]
    fn average_skips_infinite_edges() {
        let map = TerrainMap::new(30, 30);
        let mut grid = CostGrid::new(10, map.size(), false, false).unwrap();
        let est = estimator();
        let corner = grid.convert_coords_to_node_id(0, 0);
        est.update_node_costs(&mut grid, &map, corner);
        // Right, Down = 1, DownRight = sqrt(2); the rest have no neighbor.
        let avg = est.node_average_transition_cost(grid.node(corner));
        assert!((avg - (2.0 + SQRT_2) / 3.0).abs() < 1e-6);

        let mut isolated = grid.node(corner).clone();
        isolated.costs = [f32::INFINITY; 8];
        assert!(est.node_average_transition_cost(&isolated).is_infinite());
    }
}
