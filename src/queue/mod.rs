// Queue & playlist manager - owns the live queue, the saved playlists and the
// active playlist pointer. Every queue mutation keeps `current_index` on the
// element that was playing before it.

mod playlist;

pub use playlist::Playlist;

use crate::error::{Error, Result};
use crate::persistence::{Persistence, ACTIVE_PLAYLIST_KEY, PLAYLISTS_KEY};
use crate::store::{AppStore, Observable, QueueState};
use crate::track::Track;
use tracing::{debug, info, warn};

pub struct QueueManager {
    queue: Observable<QueueState>,
    playlists: Observable<Vec<Playlist>>,
    active: Observable<Option<String>>,
    persistence: Persistence,
}

/// Where the current pointer lands after removing `removed` from a queue that
/// now holds `len` entries
pub fn index_after_remove(current: usize, removed: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let shifted = if removed < current { current - 1 } else { current };
    shifted.min(len - 1)
}

/// Where the current pointer lands after moving the entry at `from` to `to`
pub fn index_after_move(current: usize, from: usize, to: usize) -> usize {
    if from == current {
        to
    } else if from < current && to >= current {
        current - 1
    } else if from > current && to <= current {
        current + 1
    } else {
        current
    }
}

impl QueueManager {
    pub fn new(store: &AppStore, persistence: Persistence) -> Self {
        Self {
            queue: store.queue.clone(),
            playlists: store.playlists.clone(),
            active: store.active_playlist.clone(),
            persistence,
        }
    }

    /// Seed playlists and the active id from persistence, then build the manager
    pub fn restore(store: &AppStore, persistence: Persistence) -> Self {
        let playlists: Vec<Playlist> = persistence.load(PLAYLISTS_KEY).unwrap_or_default();
        let active = persistence
            .load::<String>(ACTIVE_PLAYLIST_KEY)
            .filter(|id| {
                let known = playlists.iter().any(|p| &p.id == id);
                if !known {
                    warn!("{}", Error::NotFound(format!("active playlist {}", id)));
                }
                known
            });

        info!("Restored {} playlists", playlists.len());
        store.playlists.set(playlists);
        store.active_playlist.set(active);
        Self::new(store, persistence)
    }

    pub fn queue(&self) -> QueueState {
        self.queue.get()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.queue.with(|q| q.current().cloned())
    }

    /// Add unless the same path is already queued. Returns whether it was added.
    pub fn append(&self, track: Track) -> bool {
        let added = self.queue.try_update(|q| {
            if q.tracks.iter().any(|t| t.path == track.path) {
                return Err(());
            }
            q.tracks.push(track.clone());
            Ok(())
        });
        match added {
            Ok(()) => {
                debug!("Appended '{}' to queue", track.name);
                true
            }
            Err(()) => {
                debug!("'{}' already queued", track.name);
                false
            }
        }
    }

    /// Explicit queue-add: the same path may be queued more than once
    pub fn enqueue(&self, track: Track) {
        debug!("Queued '{}'", track.name);
        self.queue.update(|q| q.tracks.push(track));
    }

    pub fn remove(&self, index: usize) -> Result<Track> {
        let removed = self.queue.try_update(|q| {
            if index >= q.tracks.len() {
                return Err(Error::NotFound(format!("queue index {}", index)));
            }
            let removed = q.tracks.remove(index);
            q.current_index = index_after_remove(q.current_index, index, q.tracks.len());
            Ok(removed)
        })?;
        info!("Removed '{}' from queue position {}", removed.name, index);
        Ok(removed)
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return self.queue.with(|q| {
                if from < q.len() {
                    Ok(())
                } else {
                    Err(Error::NotFound(format!("queue index {}", from)))
                }
            });
        }

        self.queue.try_update(|q| {
            let len = q.tracks.len();
            if from >= len || to >= len {
                return Err(Error::NotFound(format!("queue move {} -> {} (len {})", from, to, len)));
            }
            let track = q.tracks.remove(from);
            q.tracks.insert(to, track);
            q.current_index = index_after_move(q.current_index, from, to);
            Ok(())
        })?;
        info!("Moved queue entry from position {} to {}", from, to);
        Ok(())
    }

    /// Empty the queue. It no longer mirrors a playlist, so the active pointer goes too.
    pub fn clear(&self) {
        self.queue.set(QueueState::default());
        if self.active.get().is_some() {
            self.set_active(None);
        }
        info!("Cleared queue");
    }

    pub fn set_current(&self, index: usize) -> Result<Track> {
        self.queue.try_update(|q| {
            let track = q
                .tracks
                .get(index)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("queue index {}", index)))?;
            q.current_index = index;
            Ok(track)
        })
    }

    /// Move the current pointer one step (wrapping) and return the track it lands on.
    /// Reading and moving the pointer happen in one write.
    pub fn advance(&self, forward: bool) -> Option<Track> {
        self.queue
            .try_update(|q| {
                if q.is_empty() {
                    return Err(());
                }
                let len = q.len();
                q.current_index = if forward {
                    (q.current_index + 1) % len
                } else {
                    (q.current_index + len - 1) % len
                };
                q.current().cloned().ok_or(())
            })
            .ok()
    }

    fn set_active(&self, id: Option<String>) {
        self.persistence.save_optional(ACTIVE_PLAYLIST_KEY, id.as_ref());
        self.active.set(id);
    }
}
