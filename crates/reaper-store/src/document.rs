use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Serialize(toml::ser::Error),
    NotATable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            StoreError::Parse { path, source } => {
                write!(f, "{}: parse error: {}", path.display(), source)
            }
            StoreError::Serialize(e) => write!(f, "serialize error: {}", e),
            StoreError::NotATable(name) => write!(f, "section `{}` is not a table", name),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Parse { source, .. } => Some(source),
            StoreError::Serialize(e) => Some(e),
            StoreError::NotATable(_) => None,
        }
    }
}

/// What a named top-level section currently looks like.
#[derive(Debug, PartialEq)]
pub enum SectionState<'a> {
    Absent,
    Empty,
    Populated(&'a Table),
}

/// A TOML key/value document, optionally backed by a file.
///
/// Every mutation is written through before the call returns. A failed write
/// restores the previous in-memory value, so the document never runs ahead
/// of the file.
#[derive(Debug, Default)]
pub struct DataDocument {
    path: Option<PathBuf>,
    root: Table,
}

impl DataDocument {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            root: Table::new(),
        }
    }

    /// Document with no file behind it; writes only touch memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Makes sure the backing file exists, then reads it. Safe to call repeatedly.
    pub fn create(&mut self) -> Result<(), StoreError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&path, "").map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            log::info!("created data file {}", path.display());
        }
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        self.root = text
            .parse::<Table>()
            .map_err(|source| StoreError::Parse { path, source })?;
        Ok(())
    }

    pub fn section(&self, name: &str) -> Result<SectionState<'_>, StoreError> {
        match self.root.get(name) {
            None => Ok(SectionState::Absent),
            Some(Value::Table(t)) if t.is_empty() => Ok(SectionState::Empty),
            Some(Value::Table(t)) => Ok(SectionState::Populated(t)),
            Some(_) => Err(StoreError::NotATable(name.to_string())),
        }
    }

    /// Replaces whatever is at `name` with an empty table and persists it.
    pub fn create_section(&mut self, name: &str) -> Result<(), StoreError> {
        let prev = self.root.insert(name.to_string(), Value::Table(Table::new()));
        self.save().inspect_err(|_| {
            match prev {
                Some(v) => self.root.insert(name.to_string(), v),
                None => self.root.remove(name),
            };
        })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.root
            .get(section)
            .and_then(Value::as_table)
            .and_then(|t| t.get(key))
    }

    /// Sets `section.key` to `value`, or removes it when `value` is `None`.
    pub fn set(&mut self, section: &str, key: &str, value: Option<String>) -> Result<(), StoreError> {
        if value.is_none() && !self.root.contains_key(section) {
            return Ok(());
        }
        let table = match self
            .root
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()))
        {
            Value::Table(t) => t,
            _ => return Err(StoreError::NotATable(section.to_string())),
        };
        let prev = match value {
            Some(v) => table.insert(key.to_string(), Value::String(v)),
            None => {
                let Some(prev) = table.remove(key) else {
                    // Nothing to clear; the file already agrees.
                    return Ok(());
                };
                Some(prev)
            }
        };
        self.save().inspect_err(|_| {
            if let Some(Value::Table(t)) = self.root.get_mut(section) {
                match prev {
                    Some(v) => {
                        t.insert(key.to_string(), v);
                    }
                    None => {
                        t.remove(key);
                    }
                }
            }
            log::debug!("write failed, rolled back {}.{}", section, key);
        })
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = toml::to_string(&self.root).map_err(StoreError::Serialize)?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_is_tri_state() {
        let mut doc = DataDocument::in_memory();
        assert_eq!(doc.section("blocks").unwrap(), SectionState::Absent);
        doc.create_section("blocks").unwrap();
        assert_eq!(doc.section("blocks").unwrap(), SectionState::Empty);
        doc.set("blocks", "k", Some("v".into())).unwrap();
        assert!(matches!(doc.section("blocks").unwrap(), SectionState::Populated(t) if t.len() == 1));
    }

    #[test]
    fn clearing_a_missing_key_is_a_no_op() {
        let mut doc = DataDocument::in_memory();
        doc.set("blocks", "k", None).unwrap();
        doc.set("blocks", "k", None).unwrap();
        assert!(doc.get("blocks", "k").is_none());
        assert_eq!(doc.section("blocks").unwrap(), SectionState::Absent);
    }

    #[test]
    fn clearing_in_a_missing_section_leaves_memory_matching_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.toml");
        let mut doc = DataDocument::open(&path);
        doc.create().unwrap();
        doc.set("blocks", "world:1:2:3", None).unwrap();
        assert_eq!(doc.section("blocks").unwrap(), SectionState::Absent);

        let mut reread = DataDocument::open(&path);
        reread.create().unwrap();
        assert_eq!(reread.root, doc.root);
    }

    #[test]
    fn scalar_section_is_reported() {
        let mut doc = DataDocument::in_memory();
        doc.root.insert("blocks".into(), Value::Integer(3));
        assert!(matches!(doc.section("blocks"), Err(StoreError::NotATable(_))));
        assert!(doc.set("blocks", "k", Some("v".into())).is_err());
        doc.create_section("blocks").unwrap();
        assert_eq!(doc.section("blocks").unwrap(), SectionState::Empty);
    }

    #[test]
    fn create_writes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.toml");
        let mut doc = DataDocument::open(&path);
        doc.create().unwrap();
        assert!(path.exists());
        doc.set("blocks", "w:1:2:3", Some("alice".into())).unwrap();
        doc.create().unwrap();
        assert_eq!(
            doc.get("blocks", "w:1:2:3").and_then(Value::as_str),
            Some("alice")
        );
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.toml");
        let mut doc = DataDocument::open(&path);
        doc.create().unwrap();
        doc.set("blocks", "a", Some("x".into())).unwrap();
        // A directory where the temp file should go makes the write fail.
        fs::create_dir(path.with_extension("toml.tmp")).unwrap();
        assert!(doc.set("blocks", "b", Some("y".into())).is_err());
        assert!(doc.get("blocks", "b").is_none());
        assert!(doc.set("blocks", "a", None).is_err());
        assert!(doc.get("blocks", "a").is_some());
    }
}
