//! Persistence for the experiment completion record.
//!
//! The session keeps the set of completed experiment ids in memory; a
//! [`CompletionStore`] carries it across runs. Stores are deliberately
//! dumb: load the whole set, save the whole set.

use labsim_core::id::ExperimentId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Errors raised by a completion store.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion record parse error: {detail}")]
    Parse { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Load/save interface for the completion record.
pub trait CompletionStore {
    /// Load the persisted set. A store with no record yet returns an empty set.
    fn load(&self) -> Result<BTreeSet<ExperimentId>, CompletionError>;

    /// Replace the persisted set.
    fn save(&mut self, completed: &BTreeSet<ExperimentId>) -> Result<(), CompletionError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A store that forgets everything on drop. Used in tests and by clients
/// that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    completed: BTreeSet<ExperimentId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionStore for MemoryStore {
    fn load(&self) -> Result<BTreeSet<ExperimentId>, CompletionError> {
        Ok(self.completed.clone())
    }

    fn save(&mut self, completed: &BTreeSet<ExperimentId>) -> Result<(), CompletionError> {
        self.completed = completed.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// A store backed by a single RON file. A missing file reads as an empty
/// record; saving writes the whole set.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CompletionStore for FileStore {
    fn load(&self) -> Result<BTreeSet<ExperimentId>, CompletionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };
        ron::from_str(&content).map_err(|e| CompletionError::Parse {
            detail: e.to_string(),
        })
    }

    fn save(&mut self, completed: &BTreeSet<ExperimentId>) -> Result<(), CompletionError> {
        let content = ron::to_string(completed).map_err(|e| CompletionError::Parse {
            detail: e.to_string(),
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "labsim_completion_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn sample() -> BTreeSet<ExperimentId> {
        [ExperimentId(0), ExperimentId(2)].into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // MemoryStore
    // -----------------------------------------------------------------------

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn memory_store_save_replaces() {
        let mut store = MemoryStore::new();
        store.save(&sample()).unwrap();
        store.save(&BTreeSet::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // FileStore
    // -----------------------------------------------------------------------

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = make_test_dir("missing");
        let store = FileStore::new(dir.join("completed.ron"));
        assert!(store.load().unwrap().is_empty());
        cleanup(&dir);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = make_test_dir("roundtrip");
        let mut store = FileStore::new(dir.join("completed.ron"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());

        // A second store on the same path sees the same record.
        let other = FileStore::new(dir.join("completed.ron"));
        assert_eq!(other.load().unwrap(), sample());

        cleanup(&dir);
    }

    #[test]
    fn file_store_corrupt_record_is_a_parse_error() {
        let dir = make_test_dir("corrupt");
        let path = dir.join("completed.ron");
        fs::write(&path, "not a record {{{").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(CompletionError::Parse { .. })
        ));

        cleanup(&dir);
    }
}
