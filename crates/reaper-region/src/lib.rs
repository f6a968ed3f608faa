//! Region protection: "is this block inside somebody's claimed area?"
#![forbid(unsafe_code)]

mod cuboid;

pub use cuboid::{CuboidRegions, RegionDef};

use std::sync::Arc;

use reaper_geom::Coordinate;

/// A companion system that owns protected regions.
pub trait RegionManager {
    /// Ids of every region that applies at `at`.
    fn applicable_regions(&self, at: &Coordinate) -> Vec<&str>;

    fn any_region_at(&self, at: &Coordinate) -> bool {
        !self.applicable_regions(at).is_empty()
    }
}

/// What the host has installed alongside us.
pub trait Companions {
    fn region_manager(&self) -> Option<Arc<dyn RegionManager>>;

    /// The region manager is only trusted when its editing companion is present too.
    fn has_region_editor(&self) -> bool;
}

/// Host with no companion systems at all.
pub struct NoCompanions;

impl Companions for NoCompanions {
    fn region_manager(&self) -> Option<Arc<dyn RegionManager>> {
        None
    }

    fn has_region_editor(&self) -> bool {
        false
    }
}

/// Fixed set of companions, for embedding hosts and tests.
#[derive(Clone, Default)]
pub struct StaticCompanions {
    pub manager: Option<Arc<dyn RegionManager>>,
    pub editor: bool,
}

impl Companions for StaticCompanions {
    fn region_manager(&self) -> Option<Arc<dyn RegionManager>> {
        self.manager.clone()
    }

    fn has_region_editor(&self) -> bool {
        self.editor
    }
}

/// Protection check with its availability decided up front.
///
/// Built once per reload. When unavailable every query answers `false`.
#[derive(Clone, Default)]
pub struct ProtectionOracle {
    manager: Option<Arc<dyn RegionManager>>,
}

impl ProtectionOracle {
    pub fn unavailable() -> Self {
        Self { manager: None }
    }

    pub fn resolve(companions: &dyn Companions, enabled: bool) -> Self {
        if !enabled || !companions.has_region_editor() {
            return Self::unavailable();
        }
        Self {
            manager: companions.region_manager(),
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.manager.is_some()
    }

    #[inline]
    pub fn is_protected(&self, at: &Coordinate) -> bool {
        self.manager.as_ref().is_some_and(|m| m.any_region_at(at))
    }
}

impl std::fmt::Debug for ProtectionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionOracle")
            .field("available", &self.is_available())
            .finish()
    }
}
