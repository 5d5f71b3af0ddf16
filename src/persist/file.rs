//! File-system persistence engine.
//!
//! Entities are files under a root directory; a collection is a
//! sub-directory whose files are assembled into a JSON array. Sequences and
//! scalar values live under dot-prefixed sub-directories of the same root so
//! they never collide with collection names.

use super::{PersistEngine, PersistError};
use crate::json;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const SEQUENCES_DIR: &str = ".sequences";
const VALUES_DIR: &str = ".values";

/// Engine persisting under a root directory.
pub struct FileEngine {
    name: String,
    root: PathBuf,
    // Serializes sequence read-modify-write cycles
    sequence_lock: Mutex<()>,
}

impl FileEngine {
    /// Create an engine rooted at `root`, creating the directory if needed.
    pub fn new(name: &str, root: &Path) -> Result<Self, PersistError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            sequence_lock: Mutex::new(()),
        })
    }

    /// Resolve a stored name to a path, refusing names that would escape
    /// the root.
    fn entry_path(&self, name: &str) -> Result<PathBuf, PersistError> {
        if name.is_empty() {
            return Err(PersistError::InvalidName(name.to_string()));
        }
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(PersistError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn map_not_found(err: std::io::Error, name: &str) -> PersistError {
        if err.kind() == ErrorKind::NotFound {
            PersistError::NotFound(name.to_string())
        } else {
            PersistError::Io(err)
        }
    }
}

impl PersistEngine for FileEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, name: &str) -> Result<String, PersistError> {
        let path = self.entry_path(name)?;
        fs::read_to_string(path).map_err(|e| Self::map_not_found(e, name))
    }

    fn write(&self, name: &str, content: &str) -> Result<(), PersistError> {
        let path = self.entry_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), PersistError> {
        let path = self.entry_path(name)?;
        fs::remove_file(path).map_err(|e| Self::map_not_found(e, name))
    }

    fn read_collection(&self, name: &str) -> Result<String, PersistError> {
        let dir = self.entry_path(name)?;
        let entries = fs::read_dir(&dir).map_err(|e| Self::map_not_found(e, name))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)?;
            items.push(json::wrap_non_json(&content));
        }

        if items.is_empty() {
            return Err(PersistError::NotFound(name.to_string()));
        }
        Ok(format!("[{}]", items.join(",")))
    }

    fn delete_collection(&self, name: &str) -> Result<(), PersistError> {
        let dir = self.entry_path(name)?;
        fs::remove_dir_all(dir).map_err(|e| Self::map_not_found(e, name))
    }

    fn get_sequence(&self, name: &str, increment: i64) -> Result<i64, PersistError> {
        let path = self.entry_path(&format!("{SEQUENCES_DIR}/{name}"))?;
        let _guard = self
            .sequence_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = match fs::read_to_string(&path) {
            Ok(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| PersistError::InvalidName(name.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => 1,
            Err(e) => return Err(PersistError::Io(e)),
        };

        if increment != 0 {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, (current + increment).to_string())?;
        }
        Ok(current)
    }

    fn get_value(&self, key: &str) -> Result<String, PersistError> {
        let path = self.entry_path(&format!("{VALUES_DIR}/{key}"))?;
        fs::read_to_string(path).map_err(|e| Self::map_not_found(e, key))
    }

    fn set_value(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let path = self.entry_path(&format!("{VALUES_DIR}/{key}"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, value)?;
        Ok(())
    }
}
