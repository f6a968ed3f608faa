use std::path::Path;

use hashbrown::HashMap;
use reaper_geom::{Coordinate, Cuboid};
use serde::Deserialize;

use crate::RegionManager;

#[derive(Clone, Debug, Deserialize)]
pub struct RegionDef {
    pub id: String,
    pub world: String,
    /// Corners as written; either order is accepted.
    #[serde(flatten)]
    pub bounds: Cuboid,
}

#[derive(Deserialize)]
struct RegionsFile {
    #[serde(default)]
    region: Vec<RegionDef>,
}

#[derive(Clone, Debug)]
struct Region {
    id: String,
    bounds: Cuboid,
}

/// Box-shaped regions grouped by world.
#[derive(Clone, Debug, Default)]
pub struct CuboidRegions {
    by_world: HashMap<String, Vec<Region>>,
}

impl CuboidRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: &str, world: &str, bounds: Cuboid) {
        self.by_world
            .entry(world.to_string())
            .or_default()
            .push(Region {
                id: id.to_string(),
                bounds,
            });
    }

    pub fn len(&self) -> usize {
        self.by_world.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        let file: RegionsFile = toml::from_str(s).map_err(|e| format!("parse error: {}", e))?;
        let mut out = CuboidRegions::new();
        for def in file.region {
            out.add(&def.id, &def.world, Cuboid::from_corners(def.bounds.min, def.bounds.max));
        }
        log::debug!("loaded {} regions", out.len());
        Ok(out)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let s = std::fs::read_to_string(path).map_err(|e| format!("read error: {}", e))?;
        Self::from_toml_str(&s)
    }
}

impl RegionManager for CuboidRegions {
    fn applicable_regions(&self, at: &Coordinate) -> Vec<&str> {
        self.by_world
            .get(at.world.as_ref())
            .map(|regions| {
                regions
                    .iter()
                    .filter(|r| r.bounds.contains(at.x, at.y, at.z))
                    .map(|r| r.id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn any_region_at(&self, at: &Coordinate) -> bool {
        self.by_world
            .get(at.world.as_ref())
            .is_some_and(|regions| regions.iter().any(|r| r.bounds.contains(at.x, at.y, at.z)))
    }
}
