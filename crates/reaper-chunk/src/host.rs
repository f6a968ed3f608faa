use std::fmt;
use std::sync::Arc;

use reaper_blocks::Material;
use reaper_geom::{ChunkKey, Coordinate};

use crate::ChunkBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    OutOfBounds(Coordinate),
    ChunkUnloaded(ChunkKey),
    UnknownWorld(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::OutOfBounds(c) => write!(f, "cell {} is outside the world", c),
            HostError::ChunkUnloaded(k) => write!(f, "chunk {} is not loaded", k),
            HostError::UnknownWorld(w) => write!(f, "unknown world {:?}", w),
        }
    }
}

impl std::error::Error for HostError {}

/// Read-only view of one loaded chunk column, as supplied by the host.
pub trait ChunkView {
    fn key(&self) -> &ChunkKey;

    /// Highest Y the host reports for this chunk's world.
    fn max_height(&self) -> i32;

    /// Material at a world position inside this chunk's footprint.
    fn material_at(&self, x: i32, y: i32, z: i32) -> Result<Material, HostError>;
}

impl ChunkView for ChunkBuf {
    #[inline]
    fn key(&self) -> &ChunkKey {
        &self.key
    }

    #[inline]
    fn max_height(&self) -> i32 {
        self.sy as i32
    }

    #[inline]
    fn material_at(&self, x: i32, y: i32, z: i32) -> Result<Material, HostError> {
        self.get_world(x, y, z)
            .ok_or_else(|| HostError::OutOfBounds(Coordinate::new(Arc::clone(&self.key.world), x, y, z)))
    }
}

/// Worlds and their currently loaded chunks.
pub trait WorldSource {
    fn worlds(&self) -> Vec<Arc<str>>;

    fn has_world(&self, name: &str) -> bool;

    fn loaded_chunks(&self, world: &str) -> Vec<ChunkKey>;

    fn chunk(&self, key: &ChunkKey) -> Option<&dyn ChunkView>;
}

/// Write side of the host: applies a single cell mutation.
pub trait BlockSink {
    fn set_material(&mut self, at: &Coordinate, m: Material) -> Result<(), HostError>;
}
