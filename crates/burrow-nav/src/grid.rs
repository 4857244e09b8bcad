//! The cost grid: a fixed-size overlay of pathing nodes on the world.
//!
//! Nodes live in one row-major arena. A node's id is its index, and
//! adjacency is stored as ids, so wrap-around worlds are plain modular
//! arithmetic rather than cyclic references.

use std::f32::consts::SQRT_2;

use burrow_core::wrap::{shortest_delta, wrap_index};
use burrow_core::{Point, Range, Vector, WorldBox};

use crate::error::NavError;
use crate::terrain::{AIR, MaterialId};

/// Stable node handle, `y * width + x`.
pub type NodeId = usize;

/// The eight compass directions, clockwise from up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    /// Slot of this direction in a node's per-direction arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Grid offset of the neighbor in this direction.
    #[inline]
    pub fn offset(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::UpRight => Point::new(1, -1),
            Direction::Right => Point::new(1, 0),
            Direction::DownRight => Point::new(1, 1),
            Direction::Down => Point::new(0, 1),
            Direction::DownLeft => Point::new(-1, 1),
            Direction::Left => Point::new(-1, 0),
            Direction::UpLeft => Point::new(-1, -1),
        }
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Distance to the neighbor, in node widths.
    #[inline]
    pub fn step_length(self) -> f32 {
        if self.is_diagonal() { SQRT_2 } else { 1.0 }
    }

    /// The direction pointing back.
    #[inline]
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self.index() + 4) % 8]
    }
}

/// One cell of the pathing overlay.
///
/// The per-direction arrays are indexed by [`Direction::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridNode {
    pub id: NodeId,
    pub grid_pos: Point,
    /// World-space center.
    pub pos: Vector,
    /// Whether any path may pass through this node at all.
    pub navigable: bool,
    pub neighbors: [Option<NodeId>; 8],
    /// Transition cost to each neighbor; infinite when there is none or it
    /// cannot be crossed.
    pub costs: [f32; 8],
    /// Strength of the strongest material on each edge.
    pub barriers: [f32; 8],
    /// The strongest material on each edge, [`AIR`] when clear.
    pub materials: [MaterialId; 8],
}

impl GridNode {
    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Option<NodeId> {
        self.neighbors[dir.index()]
    }

    #[inline]
    pub fn cost(&self, dir: Direction) -> f32 {
        self.costs[dir.index()]
    }
}

// ---------------------------------------------------------------------------
// CostGrid
// ---------------------------------------------------------------------------

/// The node arena plus its dimensions and wrap settings.
///
/// An empty grid (the [`Default`]) stands for "no usable world"; every path
/// query against it fails with `NoSolution`.
#[derive(Debug, Clone, Default)]
pub struct CostGrid {
    nodes: Vec<GridNode>,
    width: i32,
    height: i32,
    node_dimension: i32,
    world_size: Point,
    wrap_x: bool,
    wrap_y: bool,
}

impl CostGrid {
    /// Allocate a grid covering a world of `world_size` pixels.
    ///
    /// Nodes start with air costs (the step length) until recosted.
    pub fn new(
        node_dimension: i32,
        world_size: Option<Point>,
        wrap_x: bool,
        wrap_y: bool,
    ) -> Result<Self, NavError> {
        if node_dimension <= 0 {
            return Err(NavError::InvalidNodeDimension(node_dimension));
        }
        let world_size = match world_size {
            Some(s) if s.x > 0 && s.y > 0 => s,
            _ => return Err(NavError::WorldSizeUnset),
        };

        let width = (world_size.x + node_dimension - 1) / node_dimension;
        let height = (world_size.y + node_dimension - 1) / node_dimension;
        let half = node_dimension as f32 / 2.0;

        let mut grid = Self {
            nodes: Vec::with_capacity((width * height) as usize),
            width,
            height,
            node_dimension,
            world_size,
            wrap_x,
            wrap_y,
        };

        for gp in Range::new(0, 0, width, height) {
            let mut neighbors = [None; 8];
            let mut costs = [f32::INFINITY; 8];
            let mut barriers = [f32::INFINITY; 8];
            for dir in Direction::ALL {
                if let Some(n) = grid.resolve(gp + dir.offset()) {
                    neighbors[dir.index()] = Some(grid.id_of(n));
                    costs[dir.index()] = dir.step_length();
                    barriers[dir.index()] = 0.0;
                }
            }
            let id = grid.id_of(gp);
            let pos = Vector::new(
                (gp.x * node_dimension) as f32 + half,
                (gp.y * node_dimension) as f32 + half,
            );
            grid.nodes.push(GridNode {
                id,
                grid_pos: gp,
                pos,
                navigable: true,
                neighbors,
                costs,
                barriers,
                materials: [AIR; 8],
            });
        }

        Ok(grid)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn node_dimension(&self) -> i32 {
        self.node_dimension
    }

    #[inline]
    pub fn world_size(&self) -> Point {
        self.world_size
    }

    #[inline]
    pub fn wraps_x(&self) -> bool {
        self.wrap_x
    }

    #[inline]
    pub fn wraps_y(&self) -> bool {
        self.wrap_y
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    /// # Panics
    ///
    /// If `id` was not produced by this grid.
    #[inline]
    pub fn node(&self, id: NodeId) -> &GridNode {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut GridNode {
        &mut self.nodes[id]
    }

    /// Node at grid coordinates, wrapping on wrapping axes.
    ///
    /// # Panics
    ///
    /// If a coordinate is out of bounds on a non-wrapping axis.
    pub fn node_at_grid_coords(&self, x: i32, y: i32) -> &GridNode {
        &self.nodes[self.convert_coords_to_node_id(x, y)]
    }

    /// Linearize grid coordinates into a node id, wrapping on wrapping axes.
    ///
    /// # Panics
    ///
    /// If a coordinate is out of bounds on a non-wrapping axis.
    pub fn convert_coords_to_node_id(&self, x: i32, y: i32) -> NodeId {
        match self.resolve(Point::new(x, y)) {
            Some(p) => self.id_of(p),
            None => panic!(
                "grid coordinates ({x}, {y}) outside {}x{} grid",
                self.width, self.height
            ),
        }
    }

    /// Like [`convert_coords_to_node_id`](Self::convert_coords_to_node_id),
    /// but `None` off a non-wrapping border.
    pub fn try_convert_coords_to_node_id(&self, x: i32, y: i32) -> Option<NodeId> {
        self.resolve(Point::new(x, y)).map(|p| self.id_of(p))
    }

    /// Grid coordinates of the cell holding a world position.
    ///
    /// Positions outside a non-wrapping world are clamped to the border
    /// cells. Returns `None` for an empty grid.
    pub fn grid_coords_of(&self, pos: Vector) -> Option<Point> {
        if self.is_empty() || !pos.is_finite() {
            return None;
        }
        let px = pos.floor();
        let x = self.fold_axis(px.x, self.world_size.x, self.wrap_x) / self.node_dimension;
        let y = self.fold_axis(px.y, self.world_size.y, self.wrap_y) / self.node_dimension;
        Some(Point::new(x.min(self.width - 1), y.min(self.height - 1)))
    }

    /// Node holding a world position (see [`grid_coords_of`](Self::grid_coords_of)).
    pub fn node_id_at(&self, pos: Vector) -> Option<NodeId> {
        self.grid_coords_of(pos).map(|p| self.id_of(p))
    }

    /// Whether both positions fall in the same cell.
    pub fn positions_are_the_same_node(&self, a: Vector, b: Vector) -> bool {
        match (self.node_id_at(a), self.node_id_at(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Set navigability of every node whose center lies in `area`.
    /// Returns how many nodes actually flipped.
    pub fn mark_box_navigable(&mut self, area: &WorldBox, navigable: bool) -> usize {
        let mut flipped = 0;
        for id in self.node_ids_in_box(area, 0) {
            let center = self.nodes[id].pos;
            if !self.box_contains_wrapped(area, center) {
                continue;
            }
            let node = &mut self.nodes[id];
            if node.navigable != navigable {
                node.navigable = navigable;
                flipped += 1;
            }
        }
        flipped
    }

    /// Set navigability of every node. Returns how many flipped.
    pub fn mark_all_nodes_navigable(&mut self, navigable: bool) -> usize {
        let mut flipped = 0;
        for node in self.nodes.iter_mut() {
            if node.navigable != navigable {
                node.navigable = navigable;
                flipped += 1;
            }
        }
        flipped
    }

    /// Ids of nodes whose cells overlap `area`, grown by `ring` cells on
    /// each side. Sorted and deduplicated.
    pub fn node_ids_in_box(&self, area: &WorldBox, ring: i32) -> Vec<NodeId> {
        if self.is_empty() || !area.min.is_finite() || !area.max.is_finite() {
            return Vec::new();
        }
        let d = self.node_dimension as f32;
        // Clamped to just past the grid so far-away corners cannot overflow.
        let cell = |v: f32, size: i32| (v / d).floor().clamp(-1.0 - size as f32, 2.0 * size as f32) as i32;
        let ring = ring.clamp(0, self.width.max(self.height));
        let cells = Range::new(
            cell(area.min.x, self.width),
            cell(area.min.y, self.height),
            cell(area.max.x, self.width) + 1,
            cell(area.max.y, self.height) + 1,
        )
        .expand(ring);
        let xs = axis_span(cells.min.x, cells.max.x - 1, self.width, self.wrap_x);
        let ys = axis_span(cells.min.y, cells.max.y - 1, self.height, self.wrap_y);

        let mut ids = Vec::with_capacity(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                ids.push(self.id_of(Point::new(x, y)));
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Shortest displacement from `from` to `to`, honoring world wrap.
    pub fn world_delta(&self, from: Vector, to: Vector) -> Vector {
        let d = to - from;
        Vector::new(
            shortest_delta(d.x, self.world_size.x as f32, self.wrap_x),
            shortest_delta(d.y, self.world_size.y as f32, self.wrap_y),
        )
    }

    /// Wrap-aware straight-line distance in pixels.
    pub fn world_distance(&self, from: Vector, to: Vector) -> f32 {
        self.world_delta(from, to).length()
    }

    /// Wrap-aware straight-line distance between node centers, in node
    /// widths.
    pub fn node_distance(&self, a: NodeId, b: NodeId) -> f32 {
        let pa = self.nodes[a].grid_pos;
        let pb = self.nodes[b].grid_pos;
        let dx = shortest_delta((pb.x - pa.x) as f32, self.width as f32, self.wrap_x);
        let dy = shortest_delta((pb.y - pa.y) as f32, self.height as f32, self.wrap_y);
        dx.hypot(dy)
    }

    // -----------------------------------------------------------------------
    // Coordinate helpers
    // -----------------------------------------------------------------------

    #[inline]
    fn id_of(&self, p: Point) -> NodeId {
        (p.y * self.width + p.x) as usize
    }

    /// Wrap `p` onto the grid, or `None` when it falls off a non-wrapping
    /// border.
    fn resolve(&self, p: Point) -> Option<Point> {
        let x = if self.wrap_x { wrap_index(p.x, self.width) } else { p.x };
        let y = if self.wrap_y { wrap_index(p.y, self.height) } else { p.y };
        Range::new(0, 0, self.width, self.height)
            .contains(Point::new(x, y))
            .then_some(Point::new(x, y))
    }

    fn fold_axis(&self, v: i32, size: i32, wraps: bool) -> i32 {
        if wraps { wrap_index(v, size) } else { v.clamp(0, size - 1) }
    }

    fn box_contains_wrapped(&self, area: &WorldBox, p: Vector) -> bool {
        let sx = if self.wrap_x { [-1, 0, 1] } else { [0, 0, 0] };
        let sy = if self.wrap_y { [-1, 0, 1] } else { [0, 0, 0] };
        sx.iter().any(|&kx| {
            sy.iter().any(|&ky| {
                let shifted = Vector::new(
                    p.x + (kx * self.world_size.x) as f32,
                    p.y + (ky * self.world_size.y) as f32,
                );
                area.contains(shifted)
            })
        })
    }
}

/// Grid coordinates covered by `lo..=hi` on one axis.
fn axis_span(lo: i32, hi: i32, size: i32, wraps: bool) -> Vec<i32> {
    if wraps {
        if hi - lo + 1 >= size {
            return (0..size).collect();
        }
        (lo..=hi).map(|v| wrap_index(v, size)).collect()
    } else {
        let lo = lo.max(0);
        let hi = hi.min(size - 1);
        (lo..=hi).collect()
    }
}
