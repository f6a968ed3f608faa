use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::HashMap;
use reaper_blocks::Material;
use reaper_geom::{ChunkKey, Coordinate};

use crate::ChunkBuf;
use crate::host::{BlockSink, ChunkView, HostError, WorldSource};

struct WorldEntry {
    name: Arc<str>,
    height: usize,
    chunks: HashMap<(i32, i32), ChunkBuf>,
}

/// In-process host: named worlds made of loaded [`ChunkBuf`] columns.
#[derive(Default)]
pub struct MemoryWorld {
    worlds: BTreeMap<String, WorldEntry>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a world whose chunks are `height` cells tall. Re-adding is a no-op.
    pub fn add_world(&mut self, name: &str, height: usize) -> Arc<str> {
        let entry = self
            .worlds
            .entry(name.to_string())
            .or_insert_with(|| WorldEntry {
                name: Arc::from(name),
                height,
                chunks: HashMap::new(),
            });
        Arc::clone(&entry.name)
    }

    /// Loads an all-air chunk if it is not loaded yet. Returns true if it was newly loaded.
    pub fn load_chunk(&mut self, world: &str, cx: i32, cz: i32) -> Result<bool, HostError> {
        let entry = self
            .worlds
            .get_mut(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        if entry.chunks.contains_key(&(cx, cz)) {
            return Ok(false);
        }
        let key = ChunkKey {
            world: Arc::clone(&entry.name),
            cx,
            cz,
        };
        entry.chunks.insert((cx, cz), ChunkBuf::new(key, entry.height));
        Ok(true)
    }

    pub fn unload_chunk(&mut self, key: &ChunkKey) -> bool {
        self.worlds
            .get_mut(key.world.as_ref())
            .is_some_and(|w| w.chunks.remove(&(key.cx, key.cz)).is_some())
    }

    pub fn chunk_buf(&self, key: &ChunkKey) -> Option<&ChunkBuf> {
        self.worlds
            .get(key.world.as_ref())
            .and_then(|w| w.chunks.get(&(key.cx, key.cz)))
    }

    pub fn chunk_buf_mut(&mut self, key: &ChunkKey) -> Option<&mut ChunkBuf> {
        self.worlds
            .get_mut(key.world.as_ref())
            .and_then(|w| w.chunks.get_mut(&(key.cx, key.cz)))
    }

    pub fn get_block(&self, at: &Coordinate) -> Option<Material> {
        self.chunk_buf(&at.chunk())
            .and_then(|c| c.get_world(at.x, at.y, at.z))
    }

    /// Fills one horizontal layer of a loaded chunk.
    pub fn fill_layer(&mut self, key: &ChunkKey, y: usize, m: Material) -> Result<(), HostError> {
        let buf = self
            .chunk_buf_mut(key)
            .ok_or_else(|| HostError::ChunkUnloaded(key.clone()))?;
        if y >= buf.sy {
            return Err(HostError::OutOfBounds(Coordinate::new(
                Arc::clone(&key.world),
                key.min_x(),
                y as i32,
                key.min_z(),
            )));
        }
        for z in 0..16 {
            for x in 0..16 {
                buf.set_local(x, y, z, m);
            }
        }
        Ok(())
    }

    /// Number of loaded cells in `world` holding `m`.
    pub fn count(&self, world: &str, m: Material) -> usize {
        self.worlds
            .get(world)
            .map(|w| w.chunks.values().map(|c| c.count(m)).sum())
            .unwrap_or(0)
    }
}

impl WorldSource for MemoryWorld {
    fn worlds(&self) -> Vec<Arc<str>> {
        self.worlds.values().map(|w| Arc::clone(&w.name)).collect()
    }

    fn has_world(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    fn loaded_chunks(&self, world: &str) -> Vec<ChunkKey> {
        let Some(entry) = self.worlds.get(world) else {
            return Vec::new();
        };
        let mut keys: Vec<ChunkKey> = entry.chunks.values().map(|c| c.key.clone()).collect();
        keys.sort();
        keys
    }

    fn chunk(&self, key: &ChunkKey) -> Option<&dyn ChunkView> {
        self.chunk_buf(key).map(|c| c as &dyn ChunkView)
    }
}

impl BlockSink for MemoryWorld {
    fn set_material(&mut self, at: &Coordinate, m: Material) -> Result<(), HostError> {
        if !self.worlds.contains_key(at.world.as_ref()) {
            return Err(HostError::UnknownWorld(at.world.to_string()));
        }
        let key = at.chunk();
        let buf = self
            .chunk_buf_mut(&key)
            .ok_or(HostError::ChunkUnloaded(key))?;
        buf.set_world(at, m)
    }
}
