//! The terrain boundary: what the pathfinder reads from the world raster.

use burrow_core::wrap::wrap_index;
use burrow_core::{Point, Range};
use parking_lot::RwLock;

/// Index into a terrain's material palette. [`AIR`] is free passage.
pub type MaterialId = u8;

/// The empty material.
pub const AIR: MaterialId = 0;

/// A palette entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub name: String,
    /// Structural strength; how hard the material is to dig through.
    pub strength: f32,
}

/// Read-only view of the world raster.
///
/// Called concurrently from every pathing thread, hence `Send + Sync`.
pub trait Terrain: Send + Sync {
    /// World size in pixels, or `None` while no world is loaded.
    fn size(&self) -> Option<Point>;

    fn wraps_x(&self) -> bool;

    fn wraps_y(&self) -> bool;

    /// Material at an in-world pixel.
    fn material_at(&self, p: Point) -> MaterialId;

    /// Materials at a run of in-world pixels, appended to `out` in order.
    ///
    /// Sampling a whole segment goes through here, so implementations
    /// backed by a lock should take it once for the batch.
    fn materials_at(&self, pixels: &[Point], out: &mut Vec<MaterialId>) {
        out.extend(pixels.iter().map(|&p| self.material_at(p)));
    }

    /// Strength of a palette entry. Air and unknown ids are 0.
    fn strength(&self, id: MaterialId) -> f32;
}

// ---------------------------------------------------------------------------
// TerrainMap
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Raster {
    size: Point,
    cells: Vec<MaterialId>,
}

impl Raster {
    fn blank(size: Point) -> Self {
        let len = (size.x.max(0) as usize) * (size.y.max(0) as usize);
        Self {
            size,
            cells: vec![AIR; len],
        }
    }
}

/// An in-memory material raster.
///
/// The raster sits behind a lock so it can be dug into while a
/// [`PathEngine`](crate::PathEngine) holds a shared reference to it. After
/// mutating a region, report it with
/// [`notify_area_changed`](crate::PathEngine::notify_area_changed).
#[derive(Debug)]
pub struct TerrainMap {
    raster: RwLock<Raster>,
    palette: Vec<Material>,
    wrap_x: bool,
    wrap_y: bool,
}

impl TerrainMap {
    /// An all-air map of the given pixel size, not wrapping.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            raster: RwLock::new(Raster::blank(Point::new(width, height))),
            palette: vec![Material {
                name: "Air".to_string(),
                strength: 0.0,
            }],
            wrap_x: false,
            wrap_y: false,
        }
    }

    /// Enable wrap-around per axis.
    pub fn with_wrap(mut self, wrap_x: bool, wrap_y: bool) -> Self {
        self.wrap_x = wrap_x;
        self.wrap_y = wrap_y;
        self
    }

    /// Register a material, returning its id.
    ///
    /// # Panics
    ///
    /// If the palette is full.
    pub fn add_material(&mut self, name: &str, strength: f32) -> MaterialId {
        let id = MaterialId::try_from(self.palette.len()).expect("material palette is full");
        self.palette.push(Material {
            name: name.to_string(),
            strength,
        });
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.palette.get(id as usize)
    }

    /// Set one pixel. Out-of-world pixels wrap or are ignored.
    pub fn set(&self, p: Point, id: MaterialId) {
        let mut raster = self.raster.write();
        if let Some(i) = self.index(&raster, p) {
            raster.cells[i] = id;
        }
    }

    /// Fill a pixel rectangle, e.g. to dig (fill with [`AIR`]) or build.
    pub fn fill(&self, area: Range, id: MaterialId) {
        let mut raster = self.raster.write();
        for p in area {
            if let Some(i) = self.index(&raster, p) {
                raster.cells[i] = id;
            }
        }
    }

    /// Replace the raster with an all-air one of a new size.
    /// A zero dimension leaves the world undefined.
    pub fn resize(&self, width: i32, height: i32) {
        *self.raster.write() = Raster::blank(Point::new(width, height));
    }

    fn index(&self, raster: &Raster, p: Point) -> Option<usize> {
        let size = raster.size;
        if size.x <= 0 || size.y <= 0 {
            return None;
        }
        let x = if self.wrap_x { wrap_index(p.x, size.x) } else { p.x };
        let y = if self.wrap_y { wrap_index(p.y, size.y) } else { p.y };
        if !Range::from_size(size).contains(Point::new(x, y)) {
            return None;
        }
        Some((y * size.x + x) as usize)
    }
}

impl Terrain for TerrainMap {
    fn size(&self) -> Option<Point> {
        let size = self.raster.read().size;
        (size.x > 0 && size.y > 0).then_some(size)
    }

    fn wraps_x(&self) -> bool {
        self.wrap_x
    }

    fn wraps_y(&self) -> bool {
        self.wrap_y
    }

    fn material_at(&self, p: Point) -> MaterialId {
        let raster = self.raster.read();
        match self.index(&raster, p) {
            Some(i) => raster.cells[i],
            None => AIR,
        }
    }

    fn materials_at(&self, pixels: &[Point], out: &mut Vec<MaterialId>) {
        let raster = self.raster.read();
        out.extend(pixels.iter().map(|&p| match self.index(&raster, p) {
            Some(i) => raster.cells[i],
            None => AIR,
        }));
    }

    fn strength(&self, id: MaterialId) -> f32 {
        if id == AIR {
            return 0.0;
        }
        self.material(id).map_or(0.0, |m| m.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_read_back() {
        let mut map = TerrainMap::new(10, 10);
        let rock = map.add_material("Rock", 80.0);
        map.fill(Range::new(2, 2, 4, 4), rock);
        assert_eq!(map.material_at(Point::new(3, 3)), rock);
        assert_eq!(map.material_at(Point::new(4, 4)), AIR);
        assert_eq!(map.strength(rock), 80.0);
        assert_eq!(map.strength(AIR), 0.0);
        assert_eq!(map.material(rock).map(|m| m.name.as_str()), Some("Rock"));
    }

    #[test]
    fn wrapping_axis_folds_writes() {
        let mut map = TerrainMap::new(10, 10).with_wrap(true, false);
        let dirt = map.add_material("Dirt", 10.0);
        map.set(Point::new(-1, 5), dirt);
        assert_eq!(map.material_at(Point::new(9, 5)), dirt);
        // Non-wrapping axis ignores out-of-world writes.
        map.set(Point::new(5, -1), dirt);
        assert_eq!(map.material_at(Point::new(5, 9)), AIR);
    }

    #[test]
    fn batch_read_matches_single_reads() {
        let mut map = TerrainMap::new(10, 10).with_wrap(true, false);
        let rock = map.add_material("Rock", 80.0);
        map.fill(Range::new(0, 0, 3, 10), rock);
        let pixels: Vec<Point> = (-2..12).map(|x| Point::new(x, 4)).chain([Point::new(1, 20)]).collect();

        let mut batch = vec![rock];
        map.materials_at(&pixels, &mut batch);
        let single: Vec<MaterialId> = pixels.iter().map(|&p| map.material_at(p)).collect();
        assert_eq!(batch[0], rock);
        assert_eq!(&batch[1..], single.as_slice());
        assert_eq!(batch.last(), Some(&AIR));
    }

    #[test]
    fn resize_to_zero_undefines_world() {
        let map = TerrainMap::new(10, 10);
        assert_eq!(map.size(), Some(Point::new(10, 10)));
        map.resize(0, 10);
        assert_eq!(map.size(), None);
        assert_eq!(map.material_at(Point::new(0, 0)), AIR);
    }
}
