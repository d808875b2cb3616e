// Persistence gateway - durable JSON blobs for favorites, playlists and the active playlist id
// Failures are logged and degrade to "nothing stored" / "not saved"; they never reach callers

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const FAVORITES_KEY: &str = "favorites";
pub const PLAYLISTS_KEY: &str = "playlists";
pub const ACTIVE_PLAYLIST_KEY: &str = "active-playlist-id";

/// Raw key-value backend. `load` returns `Ok(None)` for a key that was never saved.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn save(&self, key: &str, value: &Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed, failure-swallowing front of a [`KeyValueStore`]
#[derive(Clone)]
pub struct Persistence {
    backend: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Parsed value for `key`, or `None` when absent, unreadable or malformed
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted data for '{}'", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to load '{}': {}", key, e);
                return None;
            }
        };

        match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed data for '{}': {}", key, e);
                None
            }
        }
    }

    /// Best-effort write. Returns whether it landed, for callers that care.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let outcome = serde_json::to_value(value)
            .map_err(Error::from)
            .and_then(|raw| self.backend.save(key, &raw));

        match outcome {
            Ok(()) => {
                debug!("Saved '{}'", key);
                true
            }
            Err(e) => {
                warn!("Failed to save '{}': {}", key, e);
                false
            }
        }
    }

    /// Used for optional values such as the active playlist id
    pub fn save_optional<T: Serialize>(&self, key: &str, value: Option<&T>) -> bool {
        match value {
            Some(value) => self.save(key, value),
            None => match self.backend.remove(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to clear '{}': {}", key, e);
                    false
                }
            },
        }
    }
}
