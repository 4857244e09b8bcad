//! Pathfinding over deformable, wrapping 2D terrain.
//!
//! A coarse grid of nodes, one per `node_dimension` square of pixels, is laid
//! over the world raster. Each node keeps the cost of stepping to each of its
//! eight neighbours, derived from the strongest material the step would cross.
//! Paths are found with A* over that grid.
//!
//! | Type | Role |
//! |---|---|
//! | [`PathEngine`] | Owns the grid, answers sync and async queries |
//! | [`CostGrid`] | The node arena and its coordinate math |
//! | [`CostEstimator`] | Samples terrain into edge costs |
//! | [`SolverPool`] | One A* solver per calling thread |
//! | [`PathRequest`] | A shared, write-once async result |
//!
//! # Terrain changes
//!
//! Report dug or built regions with [`PathEngine::notify_area_changed`] and
//! call [`PathEngine::update_pathing`] once per frame. Changes are batched
//! and budgeted; every solver is reset at most once per update, and only if
//! some cost actually moved.
//!
//! # Digging
//!
//! Each query carries a dig strength. Steps through materials stronger than
//! it are skipped for that query only, so agents with different tools share
//! one grid.

mod adapter;
mod config;
mod engine;
mod error;
mod estimator;
mod grid;
mod request;
mod terrain;
mod updater;
mod workers;

pub use adapter::{GridGraph, MIN_COST_PER_NODE, SolverPool, SolverState};
pub use config::{MaterialCostTable, NavConfig};
pub use engine::PathEngine;
pub use error::NavError;
pub use estimator::{CostEstimator, StrongestMaterial};
pub use grid::{CostGrid, Direction, GridNode, NodeId};
pub use request::{PathCallback, PathRequest, PathResult, PathStatus};
pub use terrain::{AIR, Material, MaterialId, Terrain, TerrainMap};
pub use updater::AreaRecost;

pub use burrow_core::{Point, Range, Vector, WorldBox};

#[cfg(test)]
mod test_support;
