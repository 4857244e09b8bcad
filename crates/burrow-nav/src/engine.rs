//! The public pathing API: [`PathEngine`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use burrow_core::{Vector, WorldBox};
use burrow_paths::SolveStatus;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::adapter::{GridGraph, SolverPool};
use crate::config::NavConfig;
use crate::error::NavError;
use crate::estimator::CostEstimator;
use crate::grid::{CostGrid, NodeId};
use crate::request::{PathCallback, PathRequest, PathResult, PathStatus};
use crate::terrain::Terrain;
use crate::updater::{self, AreaRecost};
use crate::workers::{Job, WorkerPool};

/// A pathfinder over one world.
///
/// Any number of threads may call [`calculate_path`] at once; each gets its
/// own solver. Terrain changes are reported with [`notify_area_changed`] and
/// folded into the grid by [`update_pathing`], which is meant to be called
/// once per frame, before that frame's path requests.
///
/// [`calculate_path`]: PathEngine::calculate_path
/// [`notify_area_changed`]: PathEngine::notify_area_changed
/// [`update_pathing`]: PathEngine::update_pathing
pub struct PathEngine {
    workers: WorkerPool,
    shared: Arc<Shared>,
}

struct Shared {
    config: NavConfig,
    terrain: Arc<dyn Terrain>,
    grid: RwLock<CostGrid>,
    estimator: CostEstimator,
    solvers: SolverPool,
    dirty: Mutex<VecDeque<WorldBox>>,
    in_flight: AtomicUsize,
}

impl PathEngine {
    /// Validate `config`, build and cost the grid for `terrain`, and start
    /// the async workers.
    pub fn new(config: NavConfig, terrain: Arc<dyn Terrain>) -> Result<Self, NavError> {
        config.validate()?;
        let estimator = CostEstimator::new(config.material_costs, config.cost_epsilon);
        let mut grid = build_grid(&config, terrain.as_ref())?;
        updater::recalculate_all_costs(&mut grid, &estimator, terrain.as_ref());
        log::info!(
            "pathing grid {}x{} at {}px per node",
            grid.width(),
            grid.height(),
            grid.node_dimension()
        );

        let shared = Arc::new(Shared {
            terrain,
            grid: RwLock::new(grid),
            estimator,
            solvers: SolverPool::new(),
            dirty: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            config,
        });

        let on_exit: Arc<dyn Fn() + Send + Sync> = {
            let weak = Arc::downgrade(&shared);
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.solvers.release_current_thread();
                }
            })
        };
        let workers = WorkerPool::spawn(
            shared.config.worker_threads,
            shared.config.queue_capacity,
            on_exit,
        )?;

        Ok(Self { workers, shared })
    }

    #[inline]
    pub fn config(&self) -> &NavConfig {
        &self.shared.config
    }

    #[inline]
    pub fn terrain(&self) -> &Arc<dyn Terrain> {
        &self.shared.terrain
    }

    /// Read access to the grid.
    ///
    /// Do not hold the guard while calling a method that updates costs on
    /// the same thread; it would deadlock.
    pub fn grid(&self) -> RwLockReadGuard<'_, CostGrid> {
        self.shared.grid.read()
    }

    #[inline]
    pub fn solvers(&self) -> &SolverPool {
        &self.shared.solvers
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Find a path, blocking the calling thread until the search finishes.
    ///
    /// Edges through materials stronger than `dig_strength` are impassable
    /// for this query only.
    pub fn calculate_path(&self, start: Vector, end: Vector, dig_strength: f32) -> PathResult {
        self.shared.calculate_path(start, end, dig_strength)
    }

    /// Queue a path query and return its request immediately.
    ///
    /// A worker fills the request in, marks it complete, then calls
    /// `callback` (if any) exactly once on the worker thread. Requests
    /// complete in no particular order and cannot be cancelled; drop the
    /// handle to lose interest. With a bounded queue this blocks while the
    /// queue is full.
    pub fn calculate_path_async(
        &self,
        start: Vector,
        end: Vector,
        dig_strength: f32,
        callback: Option<PathCallback>,
    ) -> Arc<PathRequest> {
        let request = Arc::new(PathRequest::new(start, end, dig_strength));
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);

        let job: Job = {
            let shared = Arc::clone(&self.shared);
            let request = Arc::clone(&request);
            Box::new(move || shared.service(request, callback))
        };
        if let Err(job) = self.workers.execute(job) {
            log::warn!("pathing queue closed, solving {start} -> {end} inline");
            job();
        }
        request
    }

    /// Async requests not yet complete.
    #[inline]
    pub fn current_pathing_requests(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Async requests still waiting for a worker.
    #[inline]
    pub fn queued_requests(&self) -> usize {
        self.workers.queued()
    }

    // -----------------------------------------------------------------------
    // Cost maintenance
    // -----------------------------------------------------------------------

    /// Record that terrain inside `area` changed.
    pub fn notify_area_changed(&self, area: WorldBox) {
        if area.is_empty() {
            return;
        }
        self.shared.dirty.lock().push_back(area);
    }

    /// Changed boxes not yet folded into the grid.
    pub fn pending_area_updates(&self) -> usize {
        self.shared.dirty.lock().len()
    }

    /// Per-frame update: recost the nodes around queued changed boxes, up to
    /// the configured node budget, and reset every solver once if anything
    /// changed. Boxes over budget wait for the next call.
    pub fn update_pathing(&self) -> AreaRecost {
        let mut dirty = self.shared.dirty.lock();
        if dirty.is_empty() {
            return AreaRecost::default();
        }
        let mut grid = self.shared.grid.write();
        let recost = updater::recalculate_area_costs(
            &mut grid,
            &self.shared.estimator,
            self.shared.terrain.as_ref(),
            &mut dirty,
            self.shared.config.node_update_limit,
        );
        if recost.changed {
            self.shared.solvers.invalidate();
        }
        log::debug!(
            "recosted {} nodes from {} boxes (changed: {}, {} boxes pending)",
            recost.touched.len(),
            recost.boxes_processed,
            recost.changed,
            dirty.len()
        );
        recost
    }

    /// Recost the nodes around `boxes` without resetting solvers.
    ///
    /// Call [`reset_pathers`](Self::reset_pathers) afterwards if the result
    /// reports a change.
    pub fn recalculate_area_costs(
        &self,
        boxes: &mut VecDeque<WorldBox>,
        node_update_limit: usize,
    ) -> AreaRecost {
        let mut grid = self.shared.grid.write();
        updater::recalculate_area_costs(
            &mut grid,
            &self.shared.estimator,
            self.shared.terrain.as_ref(),
            boxes,
            node_update_limit,
        )
    }

    /// Recost exactly `ids` without resetting solvers. Returns whether any
    /// changed meaningfully.
    pub fn update_node_list(&self, ids: &[NodeId]) -> bool {
        let mut grid = self.shared.grid.write();
        updater::update_node_list(&mut grid, &self.shared.estimator, self.shared.terrain.as_ref(), ids)
    }

    /// Mark every thread's solver stale.
    pub fn reset_pathers(&self) {
        let generation = self.shared.solvers.invalidate();
        log::debug!("pathing solvers invalidated (generation {generation})");
    }

    /// Recost the whole grid and reset every solver.
    pub fn recalculate_all_costs(&self) -> bool {
        let mut grid = self.shared.grid.write();
        let changed = updater::recalculate_all_costs(
            &mut grid,
            &self.shared.estimator,
            self.shared.terrain.as_ref(),
        );
        self.shared.solvers.invalidate();
        log::info!("recalculated all {} pathing nodes (changed: {changed})", grid.len());
        changed
    }

    /// Set navigability of nodes whose centers lie in `area`.
    pub fn mark_box_navigable(&self, area: &WorldBox, navigable: bool) -> usize {
        let mut grid = self.shared.grid.write();
        let flipped = grid.mark_box_navigable(area, navigable);
        if flipped > 0 {
            self.shared.solvers.invalidate();
        }
        flipped
    }

    /// Set navigability of every node.
    pub fn mark_all_nodes_navigable(&self, navigable: bool) -> usize {
        let mut grid = self.shared.grid.write();
        let flipped = grid.mark_all_nodes_navigable(navigable);
        if flipped > 0 {
            self.shared.solvers.invalidate();
        }
        flipped
    }

    /// Reallocate the grid after the world was resized or reloaded.
    ///
    /// On failure the grid is left empty, and every query answers
    /// `NoSolution` until a later rebuild succeeds.
    pub fn rebuild(&self) -> Result<(), NavError> {
        let mut dirty = self.shared.dirty.lock();
        let mut grid = self.shared.grid.write();
        dirty.clear();
        let built = build_grid(&self.shared.config, self.shared.terrain.as_ref());
        let outcome = match built {
            Ok(mut fresh) => {
                updater::recalculate_all_costs(
                    &mut fresh,
                    &self.shared.estimator,
                    self.shared.terrain.as_ref(),
                );
                log::info!("rebuilt pathing grid {}x{}", fresh.width(), fresh.height());
                *grid = fresh;
                Ok(())
            }
            Err(e) => {
                log::error!("pathing grid rebuild failed: {e}");
                *grid = CostGrid::default();
                Err(e)
            }
        };
        self.shared.solvers.invalidate();
        outcome
    }

    /// Average finite edge cost of the node at `pos`.
    pub fn node_average_transition_cost(&self, pos: Vector) -> Option<f32> {
        let grid = self.shared.grid.read();
        let id = grid.node_id_at(pos)?;
        Some(self.shared.estimator.node_average_transition_cost(grid.node(id)))
    }
}

impl Shared {
    fn calculate_path(&self, start: Vector, end: Vector, dig_strength: f32) -> PathResult {
        let grid = self.grid.read();
        let (Some(raw_start), Some(raw_end)) = (grid.node_id_at(start), grid.node_id_at(end)) else {
            return PathResult::unsolved(PathStatus::NoSolution);
        };
        if raw_start == raw_end {
            return PathResult::unsolved(PathStatus::StartEndSame);
        }

        let radius = self.config.navigable_search_radius;
        let (Some(from), Some(to)) = (
            nearest_navigable(&grid, raw_start, radius),
            nearest_navigable(&grid, raw_end, radius),
        ) else {
            log::warn!("no navigable node within {radius} of {start} or {end}");
            return PathResult::unsolved(PathStatus::NoSolution);
        };
        if from == to {
            return PathResult::unsolved(PathStatus::StartEndSame);
        }

        let clearance = if dig_strength.is_nan() { 0.0 } else { dig_strength };
        let graph = GridGraph::new(&grid);
        let solution = self
            .solvers
            .with_pather(grid.len(), |solver| solver.solve(&graph, from, to, clearance));
        log::trace!(
            "path {start} -> {end} (dig {dig_strength}): {:?}, {} nodes, cost {}",
            solution.status,
            solution.path.len(),
            solution.cost
        );
        if solution.status != SolveStatus::Solved {
            return PathResult::unsolved(solution.status.into());
        }

        let mut waypoints: Vec<Vector> = solution.path.iter().map(|&id| grid.node(id).pos).collect();
        // Exact endpoints, unless one was moved off a blocked node.
        if from == raw_start {
            if let Some(first) = waypoints.first_mut() {
                *first = start;
            }
        }
        if to == raw_end {
            if let Some(last) = waypoints.last_mut() {
                *last = end;
            }
        }
        let total_length = waypoints
            .windows(2)
            .map(|w| grid.world_distance(w[0], w[1]))
            .sum::<f32>();

        PathResult {
            status: PathStatus::Solved,
            waypoints,
            total_length,
            total_cost: solution.cost,
        }
    }

    fn service(&self, request: Arc<PathRequest>, callback: Option<PathCallback>) {
        let result = self.calculate_path(request.start(), request.end(), request.dig_strength());
        request.complete(result);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(callback) = callback {
            callback(request);
        }
    }
}

fn build_grid(config: &NavConfig, terrain: &dyn Terrain) -> Result<CostGrid, NavError> {
    CostGrid::new(
        config.node_dimension,
        terrain.size(),
        terrain.wraps_x(),
        terrain.wraps_y(),
    )
}

/// `id` itself if navigable, else the closest navigable node within
/// `radius` rings (ties go to the lower id).
fn nearest_navigable(grid: &CostGrid, id: NodeId, radius: i32) -> Option<NodeId> {
    if grid.node(id).navigable {
        return Some(id);
    }
    let origin = grid.node(id).grid_pos;
    let mut best: Option<(f32, NodeId)> = None;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let p = origin.shift(dx, dy);
            let Some(cand) = grid.try_convert_coords_to_node_id(p.x, p.y) else {
                continue;
            };
            if !grid.node(cand).navigable {
                continue;
            }
            let d = grid.node_distance(id, cand);
            if best.is_none_or(|(bd, bid)| d < bd || (d == bd && cand < bid)) {
                best = Some((d, cand));
            }
        }
    }
    best.map(|(_, cand)| cand)
}
