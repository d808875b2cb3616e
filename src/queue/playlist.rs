use super::QueueManager;
use crate::error::{Error, Result};
use crate::persistence::PLAYLISTS_KEY;
use crate::store::QueueState;
use crate::track::Track;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Represents a single saved playlist, distinct from the live queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Create a new empty playlist
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            tracks: Vec::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tracks.iter().any(|t| t.same_file(path))
    }

    /// Add a track unless one with the same path is already in the playlist
    pub fn add_track(&mut self, track: Track) -> bool {
        if self.contains(&track.path) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    /// Remove a track from the playlist by path
    pub fn remove_track(&mut self, path: &str) -> bool {
        if let Some(pos) = self.tracks.iter().position(|t| t.same_file(path)) {
            self.tracks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Sum of known durations, in seconds
    pub fn total_duration(&self) -> f64 {
        self.tracks.iter().filter_map(|t| t.duration).sum()
    }
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(Error::Rejected("playlist name cannot be empty".into()))
    } else {
        Ok(name.to_string())
    }
}

fn not_found(id: &str) -> Error {
    Error::NotFound(format!("playlist {}", id))
}

/// Millisecond timestamp, bumped past any id already taken
fn next_playlist_id(existing: &[Playlist]) -> String {
    let mut candidate = chrono::Utc::now().timestamp_millis();
    while existing.iter().any(|p| p.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

impl QueueManager {
    pub fn playlists(&self) -> Vec<Playlist> {
        self.playlists.get()
    }

    pub fn playlist(&self, id: &str) -> Option<Playlist> {
        self.playlists.with(|lists| lists.iter().find(|p| p.id == id).cloned())
    }

    pub fn active_playlist_id(&self) -> Option<String> {
        self.active.get()
    }

    /// Create a new empty playlist and return its id
    pub fn create_playlist(&self, name: &str) -> Result<String> {
        let name = clean_name(name)?;
        let id = self.playlists.update(|lists| {
            let id = next_playlist_id(lists);
            lists.push(Playlist::new(id.clone(), name.clone()));
            id
        });
        self.persist_playlists();

        info!("Created new playlist: '{}' ({})", name, id);
        Ok(id)
    }

    /// Snapshot the live queue into a new playlist
    pub fn save_queue_as_playlist(&self, name: &str) -> Result<String> {
        let name = clean_name(name)?;
        let tracks = self.queue.with(|q| q.tracks.clone());
        let count = tracks.len();
        let id = self.playlists.update(|lists| {
            let id = next_playlist_id(lists);
            lists.push(Playlist {
                id: id.clone(),
                name: name.clone(),
                tracks,
            });
            id
        });
        self.persist_playlists();

        info!("Saved queue ({} tracks) as playlist '{}'", count, name);
        Ok(id)
    }

    /// Rename a playlist
    pub fn rename_playlist(&self, id: &str, new_name: &str) -> Result<()> {
        let new_name = clean_name(new_name)?;
        let old_name = self.playlists.try_update(|lists| {
            let playlist = lists.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found(id))?;
            Ok::<_, Error>(std::mem::replace(&mut playlist.name, new_name.clone()))
        })?;
        self.persist_playlists();

        info!("Renamed playlist '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    /// Delete a playlist. If it was the active one the pointer is cleared;
    /// the live queue is left alone.
    pub fn delete_playlist(&self, id: &str) -> Result<()> {
        let removed = self.playlists.try_update(|lists| {
            let pos = lists.iter().position(|p| p.id == id).ok_or_else(|| not_found(id))?;
            Ok::<_, Error>(lists.remove(pos))
        })?;
        self.persist_playlists();

        if self.active.get().as_deref() == Some(id) {
            self.set_active(None);
            debug!("Active playlist deleted, pointer cleared");
        }

        info!("Deleted playlist: '{}'", removed.name);
        Ok(())
    }

    /// Add a track to a playlist. `Ok(false)` when the path is already in it.
    pub fn add_track_to_playlist(&self, id: &str, track: Track) -> Result<bool> {
        let exists = self.playlists.with(|lists| {
            lists
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.contains(&track.path))
        });
        match exists {
            None => return Err(not_found(id)),
            Some(true) => {
                debug!("'{}' already in playlist {}", track.name, id);
                return Ok(false);
            }
            Some(false) => {}
        }

        let name = track.name.clone();
        let added = self.playlists.try_update(|lists| {
            let playlist = lists.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found(id))?;
            Ok::<_, Error>(playlist.add_track(track))
        })?;
        if added {
            self.persist_playlists();
            info!("Added track '{}' to playlist {}", name, id);
        }
        Ok(added)
    }

    /// Remove a track from a playlist by path
    pub fn remove_track_from_playlist(&self, id: &str, path: &str) -> Result<()> {
        self.playlists.try_update(|lists| {
            let playlist = lists.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found(id))?;
            if playlist.remove_track(path) {
                Ok(())
            } else {
                Err(Error::NotFound(format!("{} in playlist {}", path, id)))
            }
        })?;
        self.persist_playlists();

        info!("Removed track '{}' from playlist {}", path, id);
        Ok(())
    }

    /// Replace the live queue with the playlist's tracks, point at the first
    /// one and mark the playlist active. Returns the track to start, if any.
    pub fn load_playlist_to_queue(&self, id: &str) -> Result<Option<Track>> {
        let playlist = self.playlist(id).ok_or_else(|| not_found(id))?;
        let first = playlist.tracks.first().cloned();

        self.queue.set(QueueState {
            tracks: playlist.tracks,
            current_index: 0,
        });
        self.set_active(Some(playlist.id));

        info!("Loaded playlist '{}' into queue", playlist.name);
        Ok(first)
    }

    fn persist_playlists(&self) {
        self.persistence.save(PLAYLISTS_KEY, &self.playlists.get());
    }
}
