// keyplayer library - playback session control for a MIDI-to-keyboard engine
// The engine does the actual playing; everything here is state, queueing and user data

pub mod config;      // settings and timing knobs
pub mod engine;      // command trait, event channel, simulated backend
pub mod error;       // shared error taxonomy
pub mod favorites;   // favorite tracks
pub mod persistence; // JSON key-value storage
pub mod player;      // bootstrap / teardown facade
pub mod queue;       // live queue and saved playlists
pub mod session;     // playback state machine
pub mod store;       // observable state cells
pub mod track;

// Export the stuff callers actually use
pub use config::{Config, TimingConfig};
pub use engine::{Engine, EngineEvent, NoteMode, ShortcutAction, SimulatedEngine};
pub use error::{Error, Result};
pub use favorites::FavoritesManager;
pub use player::Player;
pub use queue::{Playlist, QueueManager};
pub use session::{PlaybackController, SmartPauseCheck};
pub use store::{AppStore, Observable, PlaybackPhase, SessionState, Subscription};
pub use track::Track;
