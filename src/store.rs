//! Local key-value persistence for vote markers and countdown anchors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::models::session::{QuestionId, SessionId};

pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

pub fn marker_key(session_id: SessionId, question_id: QuestionId) -> String {
    format!("voted/{session_id}/{question_id}")
}

pub fn anchor_key(session_id: SessionId) -> String {
    format!("anchor/{session_id}")
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// JSON object on disk, mirrored in memory. A value is visible to `get` as soon
/// as `set` is called, even if writing the file then fails.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Corrupt store file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush().map_err(|e| {
            warn!("Store entry {key} kept in memory only: {e}");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_by_session() {
        assert_eq!(marker_key(SessionId(4), QuestionId(7)), "voted/4/7");
        assert_ne!(
            marker_key(SessionId(4), QuestionId(7)),
            marker_key(SessionId(47), QuestionId(7))
        );
        assert_eq!(anchor_key(SessionId(4)), "anchor/4");
    }

    #[test]
    fn file_store_survives_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("terminal.json");

        let mut store = FileStore::open(&path)?;
        assert_eq!(store.get("anchor/1"), None);
        store.set("anchor/1", "1700000000000")?;
        store.set("voted/1/2", "true")?;

        let reopened = FileStore::open(&path)?;
        assert_eq!(reopened.get("anchor/1").as_deref(), Some("1700000000000"));
        assert_eq!(reopened.get("voted/1/2").as_deref(), Some("true"));
        Ok(())
    }

    #[test]
    fn file_store_rejects_corrupt_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("terminal.json");
        fs::write(&path, "{ not json")?;

        assert!(FileStore::open(&path).is_err());
        assert_eq!(fs::read_to_string(&path)?, "{ not json");
        Ok(())
    }

    #[test]
    fn file_store_keeps_value_when_flush_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing-dir").join("terminal.json");

        let mut store = FileStore::open(&path)?;
        assert!(store.set("voted/1/1", "true").is_err());
        assert_eq!(store.get("voted/1/1").as_deref(), Some("true"));
        Ok(())
    }
}
