use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Interned block-type identifier. Index into a [`MaterialCatalog`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Material(pub u16);

impl Material {
    /// Empty cell. Always id 0 in every catalog.
    pub const AIR: Material = Material(0);

    #[inline]
    pub fn is_air(self) -> bool {
        self == Material::AIR
    }
}

const BUILTIN: &[&str] = &[
    "AIR",
    "STONE",
    "GRANITE",
    "DIORITE",
    "ANDESITE",
    "GRASS_BLOCK",
    "DIRT",
    "COBBLESTONE",
    "OAK_PLANKS",
    "BEDROCK",
    "WATER",
    "LAVA",
    "SAND",
    "GRAVEL",
    "GOLD_ORE",
    "IRON_ORE",
    "COAL_ORE",
    "DIAMOND_ORE",
    "OAK_LOG",
    "OAK_LEAVES",
    "GLASS",
    "TNT",
    "OBSIDIAN",
    "SPAWNER",
    "CHEST",
    "NETHERRACK",
    "END_STONE",
];

/// No id left for a new material name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogFull(pub String);

impl fmt::Display for CatalogFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no material id left for {}", self.0)
    }
}

impl Error for CatalogFull {}

#[derive(Clone, Debug)]
pub struct MaterialCatalog {
    names: Vec<String>,
    by_name: HashMap<String, Material>,
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MaterialCatalog {
    /// Catalog holding the built-in block names, `AIR` first.
    pub fn builtin() -> Self {
        let mut catalog = MaterialCatalog {
            names: Vec::with_capacity(BUILTIN.len()),
            by_name: HashMap::with_capacity(BUILTIN.len()),
        };
        for (id, name) in BUILTIN.iter().enumerate() {
            let m = Material(id as u16);
            catalog.names.push(name.to_string());
            catalog.by_name.insert(name.to_string(), m);
        }
        catalog
    }

    /// Adds a name if missing and returns its id either way.
    ///
    /// Fails once every `u16` id is taken.
    pub fn register(&mut self, name: &str) -> Result<Material, CatalogFull> {
        if let Some(m) = self.by_name.get(name) {
            return Ok(*m);
        }
        let id = u16::try_from(self.names.len())
            .map(Material)
            .map_err(|_| CatalogFull(name.to_string()))?;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Exact, case-sensitive lookup.
    #[inline]
    pub fn get(&self, name: &str) -> Option<Material> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn name(&self, m: Material) -> Option<&str> {
        self.names.get(m.0 as usize).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Built-in catalog extended with the `materials` list of a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: MaterialsConfig = toml::from_str(toml_str)?;
        let mut catalog = MaterialCatalog::builtin();
        // Keep ids stable across runs regardless of file order.
        let mut extra = cfg.materials;
        extra.sort();
        extra.dedup();
        for name in extra {
            if name.trim().is_empty() {
                return Err("empty material name in catalog".into());
            }
            catalog.register(&name)?;
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

#[derive(Deserialize)]
struct MaterialsConfig {
    #[serde(default)]
    materials: Vec<String>,
}
