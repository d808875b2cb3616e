// Favorites - a set of tracks keyed by path, persisted after every toggle

use crate::persistence::{Persistence, FAVORITES_KEY};
use crate::store::{AppStore, Observable};
use crate::track::Track;
use tracing::info;

pub struct FavoritesManager {
    favorites: Observable<Vec<Track>>,
    persistence: Persistence,
}

impl FavoritesManager {
    pub fn new(store: &AppStore, persistence: Persistence) -> Self {
        Self {
            favorites: store.favorites.clone(),
            persistence,
        }
    }

    /// Seed the favorites cell from persistence, then build the manager
    pub fn restore(store: &AppStore, persistence: Persistence) -> Self {
        let favorites: Vec<Track> = persistence.load(FAVORITES_KEY).unwrap_or_default();
        info!("Restored {} favorites", favorites.len());
        store.favorites.set(favorites);
        Self::new(store, persistence)
    }

    /// Flip membership. Returns true when the track is a favorite afterwards.
    pub fn toggle(&self, track: &Track) -> bool {
        let now_favorite = self.favorites.update(|favorites| {
            if let Some(pos) = favorites.iter().position(|t| t.same_file(&track.path)) {
                favorites.remove(pos);
                false
            } else {
                favorites.push(track.clone());
                true
            }
        });
        self.persistence.save(FAVORITES_KEY, &self.favorites.get());

        if now_favorite {
            info!("Added '{}' to favorites", track.name);
        } else {
            info!("Removed '{}' from favorites", track.name);
        }
        now_favorite
    }

    pub fn is_favorite(&self, path: &str) -> bool {
        self.favorites.with(|favorites| favorites.iter().any(|t| t.same_file(path)))
    }

    pub fn favorites(&self) -> Vec<Track> {
        self.favorites.get()
    }
}
