//! World coordinates, chunk footprints, and the persisted location key codec.
#![forbid(unsafe_code)]

mod key;

pub use key::{KeyError, LocationKey};

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Horizontal footprint of a chunk column, in blocks.
pub const CHUNK_WIDTH: i32 = 16;
const CHUNK_SHIFT: u32 = 4;

/// A block location in a named world.
///
/// Components are whole block coordinates so equality and hashing are exact.
/// The world name is shared (`Arc<str>`) because scans mint one coordinate per
/// cell and only ever clone the handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub world: Arc<str>,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    #[inline]
    pub fn new(world: impl Into<Arc<str>>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Block containing a point given in world space; components are floored.
    pub fn from_f64(world: impl Into<Arc<str>>, x: f64, y: f64, z: f64) -> Self {
        Self::new(world, x.floor() as i32, y.floor() as i32, z.floor() as i32)
    }

    #[inline]
    pub fn chunk(&self) -> ChunkKey {
        ChunkKey {
            world: Arc::clone(&self.world),
            cx: self.x >> CHUNK_SHIFT,
            cz: self.z >> CHUNK_SHIFT,
        }
    }

    #[inline]
    pub fn to_key(&self) -> LocationKey {
        LocationKey::encode(self)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// Identity of a loaded chunk column: world plus chunk-grid position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub world: Arc<str>,
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    #[inline]
    pub fn new(world: impl Into<Arc<str>>, cx: i32, cz: i32) -> Self {
        Self {
            world: world.into(),
            cx,
            cz,
        }
    }

    #[inline]
    pub fn min_x(&self) -> i32 {
        self.cx << CHUNK_SHIFT
    }

    #[inline]
    pub fn min_z(&self) -> i32 {
        self.cz << CHUNK_SHIFT
    }

    /// Inclusive upper X bound of the footprint.
    #[inline]
    pub fn max_x(&self) -> i32 {
        self.min_x() | (CHUNK_WIDTH - 1)
    }

    #[inline]
    pub fn max_z(&self) -> i32 {
        self.min_z() | (CHUNK_WIDTH - 1)
    }

    #[inline]
    pub fn contains(&self, c: &Coordinate) -> bool {
        *c.world == *self.world
            && c.x >= self.min_x()
            && c.x <= self.max_x()
            && c.z >= self.min_z()
            && c.z <= self.max_z()
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.world, self.cx, self.cz)
    }
}

/// Axis-aligned block box with inclusive corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Cuboid {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Cuboid {
    /// Builds a box from two arbitrary corners.
    pub fn from_corners(a: [i32; 3], b: [i32; 3]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.min[0]
            && x <= self.max[0]
            && y >= self.min[1]
            && y <= self.max[1]
            && z >= self.min[2]
            && z <= self.max[2]
    }
}
