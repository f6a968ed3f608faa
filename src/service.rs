//! The removal service: published state plus the operations that read it.

use std::fmt;
use std::path::PathBuf;

use reaper_blocks::{Material, MaterialCatalog};
use reaper_chunk::{Cell, ChunkView, WorldSource, scan_chunk};
use reaper_geom::{ChunkKey, Coordinate};
use reaper_region::{Companions, ProtectionOracle};
use reaper_runtime::{ScheduledRemoval, TaskScheduler};
use reaper_store::{DataDocument, ExclusionStore, StoreError};

use crate::config::PurgeConfig;
use crate::events::{Action, EventState, HostEvent, StateDelta, react};
use crate::messages::Messages;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unloaded,
    Loading,
    Ready,
}

#[derive(Debug)]
pub enum ServiceError {
    NotReady(Lifecycle),
    UnknownWorld(String),
    Store(StoreError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotReady(state) => write!(f, "service is not ready ({:?})", state),
            ServiceError::UnknownWorld(w) => write!(f, "unknown world {:?}", w),
            ServiceError::Store(e) => write!(f, "exclusion store: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

/// Where configuration comes from on each reload.
#[derive(Clone, Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Fixed(PurgeConfig),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub chunks: usize,
    pub scheduled: usize,
}

impl RemovalReport {
    fn merge(&mut self, other: RemovalReport) {
        self.chunks += other.chunks;
        self.scheduled += other.scheduled;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub excluded: usize,
    pub watched: usize,
    pub skipped_materials: usize,
    pub protection: bool,
}

/// Owns everything a reload rebuilds: config snapshot, watched materials,
/// the exclusion store and its live set, and the protection oracle.
///
/// Scans read whatever the last successful reload published.
pub struct PurgeService {
    source: ConfigSource,
    config: PurgeConfig,
    messages: Messages,
    catalog: MaterialCatalog,
    store: ExclusionStore,
    watched: Vec<Material>,
    oracle: ProtectionOracle,
    lifecycle: Lifecycle,
}

impl PurgeService {
    pub fn new(source: ConfigSource, catalog: MaterialCatalog, doc: DataDocument) -> Self {
        let config = match &source {
            ConfigSource::Fixed(cfg) => cfg.clone(),
            ConfigSource::File(_) => PurgeConfig::default(),
        };
        Self {
            source,
            messages: Messages::from_config(&config),
            config,
            catalog,
            store: ExclusionStore::new(doc),
            watched: Vec::new(),
            oracle: ProtectionOracle::unavailable(),
            lifecycle: Lifecycle::Unloaded,
        }
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    /// Materials removed on chunk load, in configured order.
    pub fn watched(&self) -> &[Material] {
        &self.watched
    }

    pub fn oracle(&self) -> &ProtectionOracle {
        &self.oracle
    }

    pub fn store(&self) -> &ExclusionStore {
        &self.store
    }

    /// Replaces the source used by the next reload.
    pub fn set_config_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Rebuilds all published state from the data file and configuration.
    ///
    /// On a store failure nothing is replaced and the previous lifecycle state
    /// is restored.
    pub fn reload(&mut self, companions: &dyn Companions) -> Result<ReloadSummary, ServiceError> {
        let prev = self.lifecycle;
        self.lifecycle = Lifecycle::Loading;

        let config = match &self.source {
            ConfigSource::Fixed(cfg) => cfg.clone(),
            ConfigSource::File(path) => match PurgeConfig::load_from_path(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("keeping previous configuration: {}", e);
                    self.config.clone()
                }
            },
        };

        if let Err(e) = self.store.create().and_then(|()| self.store.rebuild()) {
            self.lifecycle = prev;
            return Err(e.into());
        }

        let mut watched = Vec::with_capacity(config.watched_materials.len());
        let mut skipped = 0;
        for name in &config.watched_materials {
            match self.catalog.get(name) {
                Some(m) => watched.push(m),
                None => {
                    log::warn!("{} is a wrong material name!", name);
                    skipped += 1;
                }
            }
        }

        let oracle = ProtectionOracle::resolve(companions, config.region_protection);
        if oracle.is_available() {
            log::info!("region protection hooked");
        }

        self.watched = watched;
        self.oracle = oracle;
        self.messages = Messages::from_config(&config);
        self.config = config;
        self.lifecycle = Lifecycle::Ready;

        let summary = ReloadSummary {
            excluded: self.store.len(),
            watched: self.watched.len(),
            skipped_materials: skipped,
            protection: self.oracle.is_available(),
        };
        log::info!(
            "reloaded: {} excluded blocks, {} watched materials, protection {}",
            summary.excluded,
            summary.watched,
            if summary.protection { "on" } else { "off" }
        );
        Ok(summary)
    }

    fn ensure_ready(&self) -> Result<(), ServiceError> {
        match self.lifecycle {
            Lifecycle::Ready => Ok(()),
            other => Err(ServiceError::NotReady(other)),
        }
    }

    /// True if a scan must leave `at` alone.
    #[inline]
    pub fn is_excluded(&self, at: &Coordinate) -> bool {
        self.store.contains(at) || self.oracle.is_protected(at)
    }

    /// Cells of `chunk` holding `material` that are neither player-placed nor protected.
    pub fn scan(&self, chunk: &dyn ChunkView, material: Material) -> Result<Vec<Cell>, ServiceError> {
        self.ensure_ready()?;
        Ok(scan_chunk(chunk, material, |at| self.is_excluded(at)))
    }

    pub fn schedule_removal(&self, cell: Cell, scheduler: &mut dyn TaskScheduler) -> u64 {
        scheduler.run_later(ScheduledRemoval {
            cell,
            delay_ticks: self.config.removal_delay_ticks,
        })
    }

    /// Scans one loaded chunk and schedules a removal per qualifying cell.
    pub fn remove_in_chunk(
        &self,
        worlds: &dyn WorldSource,
        key: &ChunkKey,
        material: Material,
        scheduler: &mut dyn TaskScheduler,
    ) -> Result<RemovalReport, ServiceError> {
        self.ensure_ready()?;
        let Some(chunk) = worlds.chunk(key) else {
            log::debug!("chunk {} vanished before its scan", key);
            return Ok(RemovalReport::default());
        };
        let cells = self.scan(chunk, material)?;
        let scheduled = cells.len();
        for cell in cells {
            self.schedule_removal(cell, scheduler);
        }
        Ok(RemovalReport {
            chunks: 1,
            scheduled,
        })
    }

    pub fn remove_in_world(
        &self,
        worlds: &dyn WorldSource,
        world: &str,
        material: Material,
        scheduler: &mut dyn TaskScheduler,
    ) -> Result<RemovalReport, ServiceError> {
        self.ensure_ready()?;
        if !worlds.has_world(world) {
            return Err(ServiceError::UnknownWorld(world.to_string()));
        }
        let mut report = RemovalReport::default();
        for key in worlds.loaded_chunks(world) {
            report.merge(self.remove_in_chunk(worlds, &key, material, scheduler)?);
        }
        Ok(report)
    }

    pub fn remove_everywhere(
        &self,
        worlds: &dyn WorldSource,
        material: Material,
        scheduler: &mut dyn TaskScheduler,
    ) -> Result<RemovalReport, ServiceError> {
        self.ensure_ready()?;
        let mut report = RemovalReport::default();
        for world in worlds.worlds() {
            report.merge(self.remove_in_world(worlds, &world, material, scheduler)?);
        }
        Ok(report)
    }

    /// Writes an event's delta through the store; persisted and live views move together.
    pub fn apply_delta(&mut self, delta: &StateDelta) -> Result<(), ServiceError> {
        match delta {
            StateDelta::MarkPlaced { at, owner } => self.store.mark_placed(at, owner)?,
            StateDelta::MarkCleared { at } => {
                self.store.mark_cleared(at)?;
            }
        }
        Ok(())
    }

    pub fn handle_event(
        &mut self,
        event: &HostEvent,
        worlds: &dyn WorldSource,
        scheduler: &mut dyn TaskScheduler,
    ) -> Result<RemovalReport, ServiceError> {
        self.ensure_ready()?;
        let reaction = react(
            event,
            &EventState {
                track_placed_blocks: self.config.track_placed_blocks,
                remove_on_chunk_load: self.config.remove_on_chunk_load,
                watched: &self.watched,
            },
        );
        log::debug!(target: "events", "{:?} -> {:?}", event, reaction);
        if let Some(delta) = &reaction.delta {
            self.apply_delta(delta)?;
        }
        let mut report = RemovalReport::default();
        for action in &reaction.actions {
            match action {
                Action::RemoveInChunk { chunk, material } => {
                    report.merge(self.remove_in_chunk(worlds, chunk, *material, scheduler)?);
                }
            }
        }
        Ok(report)
    }
}
