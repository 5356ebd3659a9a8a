//! Persistent key/value state: notes, reminders and voice preferences.
//!
//! Every collection is stored as one JSON value under a fixed key and is
//! rewritten wholesale on each mutation.

pub mod notes;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use notes::{Note, NoteList, Notebook, Reminder};

pub const CEO_NOTES: &str = "ceoNotes";
pub const QUICK_NOTES: &str = "quickNotes";
pub const QUICK_REMINDERS: &str = "quickReminders";
pub const PREFERRED_VOICE_NAME: &str = "preferredVoiceName";
pub const USE_ELEVEN_LABS: &str = "useElevenLabs";

/// Durable string-keyed JSON values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Read `key` as `T`. Missing or unreadable values give `T::default()`.
pub fn load_or_default<T, S>(store: &S, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let Some(value) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            warn!(key, error = %err, "stored value unreadable, starting empty");
            Ok(T::default())
        }
    }
}

pub fn save<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let value = serde_json::to_value(value).with_context(|| format!("encoding {key}"))?;
    store.set(key, value)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// One JSON object on disk (`~/.execdash/storage.json` by default), read and
/// rewritten on every operation.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store under the state directory.
    pub fn open_default() -> Result<Self> {
        let dir = crate::config::state_dir().context("Could not determine home directory")?;
        Ok(Self::new(dir.join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut values = self.read()?;
        values.insert(key.to_string(), value);
        self.write(&values)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut values = self.read()?;
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}
