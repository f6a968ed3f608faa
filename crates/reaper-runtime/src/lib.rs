//! Deferred cell removal on a cooperative tick loop.
#![forbid(unsafe_code)]

use std::collections::{BTreeMap, VecDeque};

use reaper_blocks::Material;
use reaper_chunk::{BlockSink, Cell};
use reaper_geom::ChunkKey;

/// Ticks between a scan deciding a cell and the cell being cleared.
pub const DEFAULT_REMOVAL_DELAY: u64 = 2;

/// Intent to clear one cell after `delay_ticks`. Fire-and-forget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledRemoval {
    pub cell: Cell,
    pub delay_ticks: u64,
}

/// The host's "run this later" facility.
pub trait TaskScheduler {
    /// Queues one removal; returns an id for tracing only.
    fn run_later(&mut self, removal: ScheduledRemoval) -> u64;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub applied: usize,
    pub dropped: usize,
}

impl TickStats {
    fn merge(&mut self, other: TickStats) {
        self.applied += other.applied;
        self.dropped += other.dropped;
    }
}

struct Task {
    id: u64,
    removal: ScheduledRemoval,
}

/// Tick-bucketed FIFO of pending removals.
///
/// Each task runs on its own; a task whose cell the host can no longer
/// resolve is dropped without affecting its neighbours.
pub struct TickQueue {
    by_tick: BTreeMap<u64, VecDeque<Task>>,
    now: u64,
    next_id: u64,
}

impl Default for TickQueue {
    fn default() -> Self {
        Self {
            by_tick: BTreeMap::new(),
            now: 0,
            next_id: 1,
        }
    }
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.by_tick.values().map(VecDeque::len).sum()
    }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Runs every task due on the current tick, then moves to the next one.
    pub fn advance_tick(&mut self, sink: &mut dyn BlockSink) -> TickStats {
        let mut stats = TickStats::default();
        if let Some(tasks) = self.by_tick.remove(&self.now) {
            for task in tasks {
                let at = &task.removal.cell.at;
                match sink.set_material(at, Material::AIR) {
                    Ok(()) => stats.applied += 1,
                    Err(e) => {
                        stats.dropped += 1;
                        log::debug!("removal #{} at {} dropped: {}", task.id, at, e);
                    }
                }
            }
        }
        self.now = self.now.wrapping_add(1);
        stats
    }

    pub fn run_ticks(&mut self, ticks: u64, sink: &mut dyn BlockSink) -> TickStats {
        let mut total = TickStats::default();
        for _ in 0..ticks {
            total.merge(self.advance_tick(sink));
        }
        total
    }

    /// Forgets pending tasks inside `chunk`, as a host does when it unloads one.
    pub fn discard_chunk(&mut self, chunk: &ChunkKey) -> usize {
        let mut discarded = 0;
        for tasks in self.by_tick.values_mut() {
            let before = tasks.len();
            tasks.retain(|t| !chunk.contains(&t.removal.cell.at));
            discarded += before - tasks.len();
        }
        self.by_tick.retain(|_, q| !q.is_empty());
        discarded
    }
}

impl TaskScheduler for TickQueue {
    fn run_later(&mut self, removal: ScheduledRemoval) -> u64 {
        let id = self.alloc_id();
        let due = self.now.wrapping_add(removal.delay_ticks);
        self.by_tick
            .entry(due)
            .or_default()
            .push_back(Task { id, removal });
        id
    }
}
