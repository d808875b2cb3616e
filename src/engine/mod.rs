// Engine boundary - the external MIDI-to-keyboard renderer, reached only through
// async commands (this trait) and a push channel of events (see `events`)

pub mod events;
pub mod simulated;

pub use events::{event_channel, EngineEvent, EventReceiver, EventSender, ShortcutAction};
pub use simulated::{scan_album, EngineCall, SimulatedEngine};

use crate::error::Result;
use crate::track::Track;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How MIDI notes are mapped onto the playable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteMode {
    Closest,
    Quantize,
    TransposeOnly,
    Pentatonic,
    Chromatic,
    Raw,
}

impl NoteMode {
    pub const ALL: [NoteMode; 6] = [
        NoteMode::Closest,
        NoteMode::Quantize,
        NoteMode::TransposeOnly,
        NoteMode::Pentatonic,
        NoteMode::Chromatic,
        NoteMode::Raw,
    ];

    fn position(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteMode::Closest => "Closest",
            NoteMode::Quantize => "Quantize",
            NoteMode::TransposeOnly => "Transpose only",
            NoteMode::Pentatonic => "Pentatonic",
            NoteMode::Chromatic => "Chromatic",
            NoteMode::Raw => "Raw",
        }
    }
}

pub const MIN_OCTAVE_SHIFT: i8 = -2;
pub const MAX_OCTAVE_SHIFT: i8 = 2;

/// Reply to a pause/resume toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseResumeReply {
    pub is_paused: bool,
    pub is_playing: bool,
    pub current_position: f64,
    pub total_duration: f64,
}

/// Authoritative engine-side playback status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub is_playing: bool,
    pub is_paused: bool,
    pub loop_mode: bool,
    pub current_position: f64,
    pub total_duration: f64,
    pub current_file: Option<String>,
    pub note_mode: NoteMode,
    pub octave_shift: i8,
}

/// Command interface of the playback engine.
///
/// Every command fails with `Error::EngineUnavailable` when the engine cannot be
/// reached. Callers log failures and carry on; nothing here is retried.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn play(&self, path: &str) -> Result<()>;
    async fn pause_resume(&self) -> Result<PauseResumeReply>;
    async fn stop(&self) -> Result<()>;
    async fn seek(&self, position: f64) -> Result<()>;
    async fn set_loop(&self, enabled: bool) -> Result<()>;
    async fn query_status(&self) -> Result<EngineStatus>;

    /// Whether the window receiving the keystrokes currently has focus
    async fn query_focus(&self) -> Result<bool>;
    async fn focus(&self) -> Result<()>;

    // Configuration and bootstrap, outside the playback state machine
    async fn set_note_mode(&self, mode: NoteMode) -> Result<()>;
    async fn set_octave_shift(&self, shift: i8) -> Result<()>;
    async fn set_interaction_mode(&self, interactive: bool) -> Result<()>;
    async fn import_track(&self, source_path: &str) -> Result<Track>;
    async fn load_library(&self) -> Result<Vec<Track>>;
    async fn test_all_keys(&self) -> Result<()>;
}
