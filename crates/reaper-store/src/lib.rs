//! Persisted record of player-placed blocks that scans must leave alone.
#![forbid(unsafe_code)]

mod document;
mod exclusion;

pub use document::{DataDocument, SectionState, StoreError};
pub use exclusion::{BLOCKS_SECTION, ExclusionStore};
