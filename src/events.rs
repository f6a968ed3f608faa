//! Host events and the pure reactions they trigger.

use reaper_blocks::Material;
use reaper_geom::{ChunkKey, Coordinate};

/// Inputs the host delivers to us. We never emit events ourselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    BlockPlaced { at: Coordinate, owner: String },
    BlockBroken { at: Coordinate },
    ChunkLoaded { chunk: ChunkKey },
}

/// Change to the exclusion store an event asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateDelta {
    MarkPlaced { at: Coordinate, owner: String },
    MarkCleared { at: Coordinate },
}

/// Work an event asks for once the delta is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    RemoveInChunk { chunk: ChunkKey, material: Material },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    pub delta: Option<StateDelta>,
    pub actions: Vec<Action>,
}

/// The slice of published state that event handling reads.
#[derive(Clone, Copy, Debug)]
pub struct EventState<'a> {
    pub track_placed_blocks: bool,
    pub remove_on_chunk_load: bool,
    pub watched: &'a [Material],
}

pub fn react(event: &HostEvent, state: &EventState<'_>) -> Reaction {
    match event {
        HostEvent::BlockPlaced { at, owner } if state.track_placed_blocks => Reaction {
            delta: Some(StateDelta::MarkPlaced {
                at: at.clone(),
                owner: owner.clone(),
            }),
            actions: Vec::new(),
        },
        HostEvent::BlockBroken { at } if state.track_placed_blocks => Reaction {
            delta: Some(StateDelta::MarkCleared { at: at.clone() }),
            actions: Vec::new(),
        },
        HostEvent::ChunkLoaded { chunk } if state.remove_on_chunk_load => Reaction {
            delta: None,
            actions: state
                .watched
                .iter()
                .map(|&material| Action::RemoveInChunk {
                    chunk: chunk.clone(),
                    material,
                })
                .collect(),
        },
        _ => Reaction::default(),
    }
}
