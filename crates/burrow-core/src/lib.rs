//! Geometry primitives shared by the *burrow* crates.
//!
//! Grid cells are addressed with integer [`Point`]s and [`Range`]s, world
//! positions with float [`Vector`]s and [`WorldBox`]es. Worlds may wrap on
//! either axis; the [`wrap`] helpers implement the modular arithmetic.

pub mod geom;
pub mod vector;
pub mod wrap;

pub use geom::{Point, Range};
pub use vector::{Vector, WorldBox};
