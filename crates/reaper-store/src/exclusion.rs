use hashbrown::HashSet;
use reaper_geom::{Coordinate, LocationKey};
use toml::Value;

use crate::document::{DataDocument, SectionState, StoreError};

/// Top-level section holding `LocationKey -> owner id` records.
pub const BLOCKS_SECTION: &str = "blocks";

/// Player-placed locations, persisted in a [`DataDocument`] with a live set
/// cached beside it.
///
/// `mark_placed` and `mark_cleared` write the document first and only touch the
/// set once the write succeeded, so both views agree after every call.
pub struct ExclusionStore {
    doc: DataDocument,
    live: HashSet<Coordinate>,
}

impl ExclusionStore {
    pub fn new(doc: DataDocument) -> Self {
        Self {
            doc,
            live: HashSet::new(),
        }
    }

    pub fn document(&self) -> &DataDocument {
        &self.doc
    }

    /// Ensures the backing file and the `blocks` section exist.
    pub fn create(&mut self) -> Result<(), StoreError> {
        self.doc.create()?;
        match self.doc.section(BLOCKS_SECTION) {
            Ok(SectionState::Absent) => self.doc.create_section(BLOCKS_SECTION),
            Ok(SectionState::Empty | SectionState::Populated(_)) => Ok(()),
            Err(StoreError::NotATable(name)) => {
                log::warn!("data section `{}` is not a table; starting it over", name);
                self.doc.create_section(BLOCKS_SECTION)
            }
            Err(e) => Err(e),
        }
    }

    /// Decodes every record into a coordinate set.
    ///
    /// A key that does not decode is logged and skipped so one bad record
    /// cannot block the rest; that location loses its protection.
    pub fn load(&self) -> Result<HashSet<Coordinate>, StoreError> {
        let table = match self.doc.section(BLOCKS_SECTION)? {
            SectionState::Absent | SectionState::Empty => return Ok(HashSet::new()),
            SectionState::Populated(t) => t,
        };
        let mut out = HashSet::with_capacity(table.len());
        for key in table.keys() {
            match LocationKey::parse(key) {
                Ok(c) => {
                    out.insert(c);
                }
                Err(e) => log::warn!("skipping stored block {:?}: {}", key, e),
            }
        }
        Ok(out)
    }

    /// Replaces the live set with what [`load`](Self::load) returns.
    pub fn rebuild(&mut self) -> Result<usize, StoreError> {
        self.live = self.load()?;
        Ok(self.live.len())
    }

    /// Records `at` as placed by `owner`. Re-marking overwrites the owner.
    pub fn mark_placed(&mut self, at: &Coordinate, owner: &str) -> Result<(), StoreError> {
        let key = at.to_key();
        self.doc
            .set(BLOCKS_SECTION, key.as_str(), Some(owner.to_string()))?;
        self.live.insert(at.clone());
        Ok(())
    }

    /// Forgets `at`. Returns whether it was tracked.
    pub fn mark_cleared(&mut self, at: &Coordinate) -> Result<bool, StoreError> {
        let key = at.to_key();
        self.doc.set(BLOCKS_SECTION, key.as_str(), None)?;
        Ok(self.live.remove(at))
    }

    #[inline]
    pub fn contains(&self, at: &Coordinate) -> bool {
        self.live.contains(at)
    }

    pub fn owner_of(&self, at: &Coordinate) -> Option<&str> {
        self.doc
            .get(BLOCKS_SECTION, at.to_key().as_str())
            .and_then(Value::as_str)
    }

    pub fn live(&self) -> &HashSet<Coordinate> {
        &self.live
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
