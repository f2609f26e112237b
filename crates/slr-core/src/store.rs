//! Local key-value storage shared by every front end on this machine.
//!
//! The store is a single JSON object on disk. Each operation reads the file,
//! modifies one key and writes it back; there is no cross-process locking,
//! so concurrent writers can lose updates (last write wins).

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::Paper;

/// Key holding the language-model API key.
pub const API_KEY: &str = "geminiApiKey";
/// Key holding the buffered papers.
pub const SAVED_PAPERS: &str = "savedPapers";
/// Key holding the selected project id.
pub const CURRENT_PROJECT: &str = "currentProject";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed storage file: {0}")]
    Json(#[from] serde_json::Error),
}

enum Backing {
    File(PathBuf),
    Memory(Mutex<Map<String, Value>>),
}

/// Extension-local storage.
pub struct LocalStore {
    backing: Backing,
    writes: AtomicU64,
}

/// Platform default location: `<data_dir>/slr-partner/storage.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("slr-partner").join("storage.json"))
}

impl LocalStore {
    /// A store backed by the JSON file at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File(path.into()),
            writes: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Mutex::new(Map::new())),
            writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(p) => Some(p),
            Backing::Memory(_) => None,
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        match &self.backing {
            Backing::File(path) => {
                if !path.exists() {
                    return Ok(Map::new());
                }
                let content = std::fs::read_to_string(path)?;
                if content.trim().is_empty() {
                    return Ok(Map::new());
                }
                Ok(serde_json::from_str(&content)?)
            }
            Backing::Memory(map) => Ok(map.lock().unwrap_or_else(|e| e.into_inner()).clone()),
        }
    }

    fn write_all(&self, data: Map<String, Value>) -> Result<(), StoreError> {
        match &self.backing {
            Backing::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let content = serde_json::to_string_pretty(&data)?;
                std::fs::write(path, content)?;
            }
            Backing::Memory(map) => {
                *map.lock().unwrap_or_else(|e| e.into_inner()) = data;
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Read one key. A missing key is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let data = self.read_all()?;
        match data.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Write one key, leaving every other key untouched.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let mut data = self.read_all()?;
        data.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(data)
    }

    pub fn api_key(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .get::<String>(API_KEY)?
            .filter(|k| !k.trim().is_empty()))
    }

    pub fn set_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.set(API_KEY, &key)
    }

    pub fn current_project(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .get::<String>(CURRENT_PROJECT)?
            .filter(|p| !p.is_empty()))
    }

    pub fn set_current_project(&self, project_id: &str) -> Result<(), StoreError> {
        self.set(CURRENT_PROJECT, &project_id)
    }

    pub fn saved_papers(&self) -> Result<Vec<Paper>, StoreError> {
        Ok(self.get(SAVED_PAPERS)?.unwrap_or_default())
    }

    /// Append `paper` unless a paper with the same id is already buffered.
    /// Stamps `savedAt` when the paper has none. Returns whether it was added.
    pub fn append_paper(&self, paper: &Paper) -> Result<bool, StoreError> {
        let mut papers = self.saved_papers()?;
        if papers.iter().any(|p| p.id == paper.id) {
            return Ok(false);
        }
        let mut paper = paper.clone();
        if paper.saved_at.is_none() {
            paper.saved_at = Some(chrono::Utc::now().to_rfc3339());
        }
        papers.push(paper);
        self.set(SAVED_PAPERS, &papers)?;
        Ok(true)
    }

    /// Drop the buffered paper with `paper_id`. Returns whether one was removed.
    pub fn remove_paper(&self, paper_id: &str) -> Result<bool, StoreError> {
        let mut papers = self.saved_papers()?;
        let before = papers.len();
        papers.retain(|p| p.id != paper_id);
        if papers.len() == before {
            return Ok(false);
        }
        self.set(SAVED_PAPERS, &papers)?;
        Ok(true)
    }

    /// A value that changes whenever the store is written, by this process or
    /// (for file-backed stores) by another one.
    pub fn stamp(&self) -> Option<u128> {
        match &self.backing {
            Backing::File(path) => std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos()),
            Backing::Memory(_) => Some(u128::from(self.writes.load(Ordering::SeqCst))),
        }
    }
}

/// Detects writes to a [`LocalStore`] made since the last poll.
#[derive(Debug, Default)]
pub struct StoreWatcher {
    last: Option<u128>,
}

impl StoreWatcher {
    /// Start watching from the store's current state.
    pub fn new(store: &LocalStore) -> Self {
        Self {
            last: store.stamp(),
        }
    }

    /// True if the store changed since the previous call.
    pub fn poll(&mut self, store: &LocalStore) -> bool {
        let current = store.stamp();
        if current != self.last {
            self.last = current;
            true
        } else {
            false
        }
    }
}
