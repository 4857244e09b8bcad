//! Worlds and engines shared by the cross-module tests.

use std::sync::Arc;

use burrow_core::{Range, Vector};

use crate::config::NavConfig;
use crate::engine::PathEngine;
use crate::terrain::{MaterialId, Terrain, TerrainMap};

pub(crate) const ROCK_STRENGTH: f32 = 100.0;
pub(crate) const BEDROCK_STRENGTH: f32 = 5000.0;

pub(crate) fn config(node_dimension: i32) -> NavConfig {
    NavConfig {
        node_dimension,
        ..NavConfig::default()
    }
}

/// An air map with `Rock` and `Bedrock` registered. Bedrock is past the
/// default unpathable threshold.
pub(crate) fn map_with_materials(width: i32, height: i32) -> (TerrainMap, MaterialId, MaterialId) {
    let mut map = TerrainMap::new(width, height);
    let rock = map.add_material("Rock", ROCK_STRENGTH);
    let bedrock = map.add_material("Bedrock", BEDROCK_STRENGTH);
    (map, rock, bedrock)
}

/// A vertical band of `material`, `thickness` pixels wide and centered on
/// `x`, spanning the whole map height.
pub(crate) fn wall(map: &TerrainMap, x: i32, thickness: i32, material: MaterialId) {
    let height = map.size().map_or(0, |s| s.y);
    map.fill(Range::new(x - thickness / 2, 0, x + thickness / 2, height), material);
}

pub(crate) fn engine_for(map: &Arc<TerrainMap>, config: NavConfig) -> PathEngine {
    let terrain: Arc<dyn Terrain> = Arc::clone(map) as Arc<dyn Terrain>;
    PathEngine::new(config, terrain).unwrap()
}

/// An engine over an all-air, non-wrapping world.
pub(crate) fn open_engine(width: i32, height: i32, node_dimension: i32) -> (Arc<TerrainMap>, PathEngine) {
    let map = Arc::new(TerrainMap::new(width, height));
    let engine = engine_for(&map, config(node_dimension));
    (map, engine)
}

/// World-space center of the node at grid coordinates `(x, y)`.
pub(crate) fn center(node_dimension: i32, x: i32, y: i32) -> Vector {
    let half = node_dimension as f32 / 2.0;
    Vector::new(
        (x * node_dimension) as f32 + half,
        (y * node_dimension) as f32 + half,
    )
}

pub(crate) fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-3, "{a} != {b}");
}
