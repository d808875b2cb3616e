use super::Observable;
use crate::engine::NoteMode;
use crate::queue::Playlist;
use crate::track::Track;
use serde::Serialize;

/// Playback flags and position as last reconciled with the engine.
/// `is_paused` is layered on top of `is_playing`; both are false when stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_seeking: bool,
    pub is_loading: bool,
    pub loop_mode: bool,
    pub current_file: Option<String>,
    pub current_position: f64, // seconds
    pub total_duration: f64,   // seconds
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Playing,
    Paused,
}

impl SessionState {
    /// Seeking is orthogonal and reported through `is_seeking` instead
    pub fn phase(&self) -> PlaybackPhase {
        if self.is_loading {
            PlaybackPhase::Loading
        } else if self.current_file.is_none() {
            PlaybackPhase::Idle
        } else if self.is_playing && self.is_paused {
            PlaybackPhase::Paused
        } else if self.is_playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Idle
        }
    }

    /// Playing and not paused
    pub fn is_active(&self) -> bool {
        self.is_playing && !self.is_paused
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSettings {
    pub note_mode: NoteMode,
    pub octave_shift: i8,
    pub smart_pause: bool,
    pub mini_mode: bool,
    pub interactive: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            note_mode: NoteMode::Closest,
            octave_shift: 0,
            smart_pause: true,
            mini_mode: false,
            interactive: true,
        }
    }
}

/// The live queue. `current_index` is only meaningful when `tracks` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueState {
    pub tracks: Vec<Track>,
    pub current_index: usize,
}

impl QueueState {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }
}

/// Every cell the controller and managers publish. Cloning shares the cells.
#[derive(Clone)]
pub struct AppStore {
    pub session: Observable<SessionState>,        // written by the session controller
    pub settings: Observable<PlayerSettings>,     // written by the session controller
    pub library: Observable<Vec<Track>>,          // written by the session controller
    pub queue: Observable<QueueState>,            // written by the queue manager
    pub playlists: Observable<Vec<Playlist>>,     // written by the queue manager
    pub active_playlist: Observable<Option<String>>, // written by the queue manager
    pub favorites: Observable<Vec<Track>>,        // written by the favorites manager
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            session: Observable::new(SessionState::default()),
            settings: Observable::new(PlayerSettings::default()),
            library: Observable::new(Vec::new()),
            queue: Observable::new(QueueState::default()),
            playlists: Observable::new(Vec::new()),
            active_playlist: Observable::new(None),
            favorites: Observable::new(Vec::new()),
        }
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}
