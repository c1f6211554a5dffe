//! Durable storage for the operation queue.
//!
//! The whole queue is rewritten as one pretty-printed JSON file on every
//! mutation and read back on startup. Coarse, but the queue is small and the
//! single-file write keeps crash recovery trivial.

use std::path::PathBuf;

use crate::queue::QueuedOperation;
use crate::storage::data_dir;

pub struct QueueStore {
    queue_file: PathBuf,
}

impl QueueStore {
    /// Store at the default location under the app data directory.
    pub fn new() -> Self {
        let dir = data_dir().unwrap_or_else(|_| PathBuf::from("."));
        QueueStore {
            queue_file: dir.join("queue.json"),
        }
    }

    /// Store at a specific path (for testing).
    pub fn at_path(path: PathBuf) -> Self {
        QueueStore { queue_file: path }
    }

    pub fn persist(&self, ops: &[QueuedOperation]) -> Result<(), std::io::Error> {
        let data = serde_json::to_string_pretty(ops)?;
        std::fs::write(&self.queue_file, data)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<QueuedOperation>, std::io::Error> {
        if !self.queue_file.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.queue_file)?;
        let ops: Vec<QueuedOperation> = serde_json::from_str(&content)?;
        Ok(ops)
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Operation;
    use tempfile::TempDir;

    #[test]
    fn persist_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = QueueStore::at_path(temp_dir.path().join("queue.json"));

        let ops = vec![
            QueuedOperation::new(Operation::DeleteEntry {
                id: "entry-1".to_string(),
            }),
            QueuedOperation::new(Operation::DeleteProject {
                id: "project-1".to_string(),
            }),
        ];
        store.persist(&ops).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, ops[0].id);
        assert_eq!(loaded[1].op, ops[1].op);
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = QueueStore::at_path(temp_dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = QueueStore::at_path(path);
        assert!(store.load().is_err());
    }
}
