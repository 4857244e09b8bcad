//! Incremental recosting after terrain changes.
//!
//! These functions only compute. Invalidating solvers is left to the caller
//! so that a whole frame of small changes costs at most one reset.

use std::collections::{BTreeSet, VecDeque};

use burrow_core::WorldBox;

use crate::estimator::CostEstimator;
use crate::grid::{CostGrid, NodeId};
use crate::terrain::Terrain;

/// What one [`recalculate_area_costs`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaRecost {
    /// Every node that was recosted.
    pub touched: BTreeSet<NodeId>,
    /// Whether any recosted node changed meaningfully.
    pub changed: bool,
    /// Boxes consumed from the queue.
    pub boxes_processed: usize,
}

/// Recost the nodes around queued changed boxes.
///
/// Each box is widened by one ring of nodes so that edges crossing into it
/// are covered. Boxes are taken from the front of `boxes` until at least
/// `node_update_limit` nodes were touched; the first box is always processed
/// in full, and unprocessed boxes stay queued for the next call.
pub fn recalculate_area_costs(
    grid: &mut CostGrid,
    estimator: &CostEstimator,
    terrain: &dyn Terrain,
    boxes: &mut VecDeque<WorldBox>,
    node_update_limit: usize,
) -> AreaRecost {
    let mut recost = AreaRecost::default();
    while let Some(area) = boxes.pop_front() {
        let fresh: Vec<NodeId> = grid
            .node_ids_in_box(&area, 1)
            .into_iter()
            .filter(|id| !recost.touched.contains(id))
            .collect();
        recost.changed |= update_node_list(grid, estimator, terrain, &fresh);
        recost.touched.extend(fresh);
        recost.boxes_processed += 1;

        if recost.touched.len() >= node_update_limit {
            break;
        }
    }
    recost
}

/// Recost exactly `ids`. Returns whether any of them changed meaningfully.
pub fn update_node_list(
    grid: &mut CostGrid,
    estimator: &CostEstimator,
    terrain: &dyn Terrain,
    ids: &[NodeId],
) -> bool {
    let mut changed = false;
    for &id in ids {
        changed |= estimator.update_node_costs(grid, terrain, id);
    }
    changed
}

/// Recost every node. Returns whether any changed meaningfully.
pub fn recalculate_all_costs(grid: &mut CostGrid, estimator: &CostEstimator, terrain: &dyn Terrain) -> bool {
    let mut changed = false;
    for id in 0..grid.len() {
        changed |= estimator.update_node_costs(grid, terrain, id);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaterialCostTable;
    use crate::terrain::TerrainMap;
    use burrow_core::{Range, Vector};

    fn setup() -> (TerrainMap, CostGrid, CostEstimator) {
        let map = TerrainMap::new(200, 200);
        let grid = CostGrid::new(10, map.size(), false, false).unwrap();
        let est = CostEstimator::new(MaterialCostTable::default(), 0.01);
        (map, grid, est)
    }

    fn pixel_box(x: f32, y: f32) -> WorldBox {
        WorldBox::from_corner(Vector::new(x, y), 4.0, 4.0)
    }

    #[test]
    fn box_touches_one_ring() {
        let (map, mut grid, est) = setup();
        let mut queue = VecDeque::from([pixel_box(52.0, 52.0)]);
        let recost = recalculate_area_costs(&mut grid, &est, &map, &mut queue, 100);
        assert_eq!(recost.touched.len(), 9);
        assert!(recost.touched.contains(&grid.convert_coords_to_node_id(4, 4)));
        assert!(recost.touched.contains(&grid.convert_coords_to_node_id(6, 6)));
        assert!(!recost.changed);
        assert!(queue.is_empty());
    }

    #[test]
    fn limit_stops_pulling_boxes() {
        let (map, mut grid, est) = setup();
        let mut queue: VecDeque<_> = (0..5).map(|i| pixel_box(25.0 + 40.0 * i as f32, 100.0)).collect();
        let recost = recalculate_area_costs(&mut grid, &est, &map, &mut queue, 12);
        // 9 nodes after the first box, 18 after the second.
        assert_eq!(recost.boxes_processed, 2);
        assert_eq!(recost.touched.len(), 18);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn first_box_processed_even_over_limit() {
        let (map, mut grid, est) = setup();
        let big = WorldBox::from_corner(Vector::new(0.0, 0.0), 100.0, 100.0);
        let mut queue = VecDeque::from([big, pixel_box(150.0, 150.0)]);
        let recost = recalculate_area_costs(&mut grid, &est, &map, &mut queue, 1);
        assert_eq!(recost.boxes_processed, 1);
        // Columns and rows 0..=11: the box's own ten, the cell at its far
        // edge, and one ring.
        assert_eq!(recost.touched.len(), 12 * 12);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn overlapping_boxes_touch_nodes_once() {
        let (map, mut grid, est) = setup();
        let mut queue = VecDeque::from([pixel_box(52.0, 52.0), pixel_box(53.0, 53.0)]);
        let recost = recalculate_area_costs(&mut grid, &est, &map, &mut queue, 100);
        assert_eq!(recost.boxes_processed, 2);
        assert_eq!(recost.touched.len(), 9);
    }

    #[test]
    fn dig_reports_change() {
        let (mut map, mut grid, est) = setup();
        let rock = map.add_material("Rock", 100.0);
        map.fill(Range::new(0, 0, 200, 200), rock);
        assert!(recalculate_all_costs(&mut grid, &est, &map));

        map.fill(Range::new(40, 40, 70, 70), crate::terrain::AIR);
        let ids = grid.node_ids_in_box(&WorldBox::from_corner(Vector::new(40.0, 40.0), 30.0, 30.0), 1);
        assert!(update_node_list(&mut grid, &est, &map, &ids));
        assert!(!update_node_list(&mut grid, &est, &map, &ids));
    }

    #[test]
    fn full_recost_is_idempotent() {
        let (mut map, mut grid, est) = setup();
        let rock = map.add_material("Rock", 40.0);
        map.fill(Range::new(30, 0, 35, 200), rock);
        recalculate_all_costs(&mut grid, &est, &map);
        let first: Vec<_> = grid.nodes().iter().map(|n| n.costs).collect();
        assert!(!recalculate_all_costs(&mut grid, &est, &map));
        let second: Vec<_> = grid.nodes().iter().map(|n| n.costs).collect();
        assert_eq!(first, second);
    }
}
