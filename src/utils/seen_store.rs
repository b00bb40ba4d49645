//! Remembers which goals were already delivered for each game, so a restarted
//! watcher doesn't replay animations for goals the lights already showed.
//!
//! The store sits on top of a tiny key-value port ([`KeyValueStore`]) holding a
//! single JSON blob under [`SEEN_GOALS_KEY`]:
//!
//! ```json
//! { "2024020001": ["2024020001|1|MTL", "8841"] }
//! ```
//!
//! Every failure is swallowed. Losing this state only means already seen goals
//! get replayed once; it can never hide a new goal.

use crate::error::StoreError;
use crate::models::GoalEvent;
use crate::utils::event_key::goal_key;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Namespace key of the seen-goals blob
pub const SEEN_GOALS_KEY: &str = "goalWatcher.seenGoals";

type SeenGoals = Map<String, Value>;

/// Small persistent string storage, addressed by key
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }
}

/// In-process storage, handy for tests and for running without a disk
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable `game id -> delivered goal keys` mapping. Entries only ever grow.
pub struct SeenEventStore {
    backend: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write of the shared blob between sessions
    write_lock: Mutex<()>,
}

impl SeenEventStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Keys already delivered for `game_id`. Empty if nothing was stored or the
    /// stored data can't be read.
    pub fn load(&self, game_id: &str) -> HashSet<String> {
        let all = match self.read_blob() {
            Ok(all) => all,
            Err(e) => {
                debug!(error = %e, "Seen goals unavailable, starting empty");
                return HashSet::new();
            }
        };

        match all.get(game_id) {
            Some(Value::Array(keys)) => keys
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => HashSet::new(),
        }
    }

    /// Union the keys of `goals` into the entry for `game_id`. Best effort.
    ///
    /// Only this game's entry is rewritten; every other entry is carried over
    /// as stored, readable or not. Nothing is written if the blob can't be read.
    pub fn save(&self, game_id: &str, goals: &[GoalEvent]) {
        let _guard = self.write_lock.lock();

        let mut all = match self.read_blob() {
            Ok(all) => all,
            Err(e) => {
                warn!(game_id, error = %e, "Seen goals unreadable, skipping write");
                return;
            }
        };

        let mut keys = match all.remove(game_id) {
            Some(Value::Array(keys)) => keys,
            _ => Vec::new(),
        };
        let mut known: HashSet<String> = keys
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        for goal in goals {
            let key = goal_key(goal);
            if known.insert(key.clone()) {
                keys.push(Value::String(key));
            }
        }
        all.insert(game_id.to_string(), Value::Array(keys));

        let json = match serde_json::to_string(&all) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize seen goals");
                return;
            }
        };
        if let Err(e) = self.backend.set_item(SEEN_GOALS_KEY, &json) {
            warn!(game_id, error = %e, "Failed to persist seen goals");
        }
    }

    /// The whole blob. A backend failure is an error; a blob that isn't a
    /// JSON object holds nothing worth keeping and reads as empty.
    fn read_blob(&self) -> Result<SeenGoals, StoreError> {
        let raw = match self.backend.get_item(SEEN_GOALS_KEY)? {
            Some(raw) => raw,
            None => return Ok(SeenGoals::new()),
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!(error = %e, "Seen goals unreadable, starting empty");
            SeenGoals::new()
        }))
    }
}
