//! Chunk columns, the host world seams, and the material scanner.
#![forbid(unsafe_code)]

mod host;
mod memory;
mod scan;

pub use host::{BlockSink, ChunkView, HostError, WorldSource};
pub use memory::MemoryWorld;
pub use scan::{Cell, scan_chunk};

use reaper_blocks::Material;
use reaper_geom::{CHUNK_WIDTH, ChunkKey, Coordinate};

const SX: usize = CHUNK_WIDTH as usize;
const SZ: usize = CHUNK_WIDTH as usize;

/// Dense 16 x height x 16 column of materials.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub key: ChunkKey,
    pub sy: usize,
    pub blocks: Vec<Material>,
}

impl ChunkBuf {
    pub fn new(key: ChunkKey, sy: usize) -> Self {
        Self {
            key,
            sy,
            blocks: vec![Material::AIR; SX * sy * SZ],
        }
    }

    pub fn from_blocks_local(key: ChunkKey, sy: usize, blocks: Vec<Material>) -> Self {
        let mut b = blocks;
        let expect = SX * sy * SZ;
        if b.len() != expect {
            b.resize(expect, Material::AIR);
        }
        ChunkBuf { key, sy, blocks: b }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * SZ + z) * SX + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Material {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, m: Material) {
        let i = self.idx(x, y, z);
        self.blocks[i] = m;
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        if wy < 0 || wy >= self.sy as i32 {
            return false;
        }
        wx >= self.key.min_x()
            && wx <= self.key.max_x()
            && wz >= self.key.min_z()
            && wz <= self.key.max_z()
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Material> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let lx = (wx - self.key.min_x()) as usize;
        let lz = (wz - self.key.min_z()) as usize;
        Some(self.get_local(lx, wy as usize, lz))
    }

    pub fn set_world(&mut self, at: &Coordinate, m: Material) -> Result<(), HostError> {
        if *at.world != *self.key.world || !self.contains_world(at.x, at.y, at.z) {
            return Err(HostError::OutOfBounds(at.clone()));
        }
        let lx = (at.x - self.key.min_x()) as usize;
        let lz = (at.z - self.key.min_z()) as usize;
        self.set_local(lx, at.y as usize, lz, m);
        Ok(())
    }

    pub fn count(&self, m: Material) -> usize {
        self.blocks.iter().filter(|b| **b == m).count()
    }
}
