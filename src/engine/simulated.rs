// In-process stand-in for the keyboard automation backend.
// Keeps engine-side status, records every command, and can drive a clock that
// pushes progress / track-ended events like the real renderer does.

use super::{Engine, EngineEvent, EngineStatus, EventSender, NoteMode, PauseResumeReply};
use super::{MAX_OCTAVE_SHIFT, MIN_OCTAVE_SHIFT};
use crate::error::{Error, Result};
use crate::track::Track;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Length assumed for library entries without a known duration
const DEFAULT_TRACK_SECONDS: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play(String),
    PauseResume,
    Stop,
    Seek(f64),
    SetLoop(bool),
    QueryStatus,
    QueryFocus,
    Focus,
    SetNoteMode(NoteMode),
    SetOctaveShift(i8),
    SetInteractionMode(bool),
    ImportTrack(String),
    LoadLibrary,
    TestAllKeys,
}

struct SimState {
    status: EngineStatus,
    library: Vec<Track>,
    focused: bool,
    available: bool,
    calls: Vec<EngineCall>,
}

pub struct SimulatedEngine {
    state: Mutex<SimState>,
    events: Mutex<Option<EventSender>>,
}

impl SimulatedEngine {
    pub fn new(library: Vec<Track>) -> Self {
        Self {
            state: Mutex::new(SimState {
                status: EngineStatus {
                    is_playing: false,
                    is_paused: false,
                    loop_mode: false,
                    current_position: 0.0,
                    total_duration: 0.0,
                    current_file: None,
                    note_mode: NoteMode::Closest,
                    octave_shift: 0,
                },
                library,
                focused: true,
                available: true,
                calls: Vec::new(),
            }),
            events: Mutex::new(None),
        }
    }

    pub fn set_event_sender(&self, sender: EventSender) {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        let sender = self.events.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(sender) = sender {
            if !sender.send(event) {
                debug!("Event dropped, nobody listening");
            }
        }
    }

    /// Log the call and fail it when the engine is marked unreachable
    fn record(&self, call: EngineCall) -> Result<MutexGuard<'_, SimState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.available {
            Ok(state)
        } else {
            Err(Error::EngineUnavailable("simulated engine offline".into()))
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn seek_calls(&self) -> Vec<f64> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn play_calls(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Play(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn set_focused(&self, focused: bool) {
        self.state().focused = focused;
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Pretend the current track reached its end
    pub fn finish_track(&self) {
        {
            let mut state = self.state();
            state.status.is_playing = false;
            state.status.is_paused = false;
            state.status.current_position = state.status.total_duration;
        }
        self.emit(EngineEvent::TrackEnded);
    }

    /// Advance the playhead by `elapsed` seconds, emitting progress or track-ended
    pub fn tick(&self, elapsed: f64) {
        let position = {
            let mut state = self.state();
            let status = &mut state.status;
            if !status.is_playing || status.is_paused {
                return;
            }
            status.current_position += elapsed;
            status.current_position
        };

        let total = self.state().status.total_duration;
        if position >= total {
            self.finish_track();
        } else {
            self.emit(EngineEvent::Progress(position));
        }
    }

    /// Tick every `interval` until `cancel` fires
    pub fn spawn_clock(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => engine.tick(interval.as_secs_f64()),
                }
            }
            debug!("Simulated engine clock stopped");
        })
    }
}

#[async_trait]
impl Engine for SimulatedEngine {
    async fn play(&self, path: &str) -> Result<()> {
        let mut state = self.record(EngineCall::Play(path.to_string()))?;
        let duration = state
            .library
            .iter()
            .find(|t| t.same_file(path))
            .map(|t| t.duration.unwrap_or(DEFAULT_TRACK_SECONDS))
            .ok_or_else(|| Error::NotFound(format!("no such file in album: {}", path)))?;

        let status = &mut state.status;
        status.is_playing = true;
        status.is_paused = false;
        status.current_position = 0.0;
        status.total_duration = duration;
        status.current_file = Some(path.to_string());
        Ok(())
    }

    async fn pause_resume(&self) -> Result<PauseResumeReply> {
        let mut state = self.record(EngineCall::PauseResume)?;
        let status = &mut state.status;
        if status.is_playing {
            status.is_paused = !status.is_paused;
        }
        Ok(PauseResumeReply {
            is_paused: status.is_paused,
            is_playing: status.is_playing,
            current_position: status.current_position,
            total_duration: status.total_duration,
        })
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.record(EngineCall::Stop)?;
        state.status.is_playing = false;
        state.status.is_paused = false;
        state.status.current_position = 0.0;
        Ok(())
    }

    async fn seek(&self, position: f64) -> Result<()> {
        let mut state = self.record(EngineCall::Seek(position))?;
        let total = state.status.total_duration;
        state.status.current_position = position.clamp(0.0, total.max(0.0));
        Ok(())
    }

    async fn set_loop(&self, enabled: bool) -> Result<()> {
        let mut state = self.record(EngineCall::SetLoop(enabled))?;
        state.status.loop_mode = enabled;
        Ok(())
    }

    async fn query_status(&self) -> Result<EngineStatus> {
        let state = self.record(EngineCall::QueryStatus)?;
        Ok(state.status.clone())
    }

    async fn query_focus(&self) -> Result<bool> {
        let state = self.record(EngineCall::QueryFocus)?;
        Ok(state.focused)
    }

    async fn focus(&self) -> Result<()> {
        let mut state = self.record(EngineCall::Focus)?;
        state.focused = true;
        Ok(())
    }

    async fn set_note_mode(&self, mode: NoteMode) -> Result<()> {
        let mut state = self.record(EngineCall::SetNoteMode(mode))?;
        state.status.note_mode = mode;
        Ok(())
    }

    async fn set_octave_shift(&self, shift: i8) -> Result<()> {
        let mut state = self.record(EngineCall::SetOctaveShift(shift))?;
        state.status.octave_shift = shift.clamp(MIN_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT);
        Ok(())
    }

    async fn set_interaction_mode(&self, interactive: bool) -> Result<()> {
        self.record(EngineCall::SetInteractionMode(interactive))?;
        Ok(())
    }

    async fn import_track(&self, source_path: &str) -> Result<Track> {
        let mut state = self.record(EngineCall::ImportTrack(source_path.to_string()))?;

        let source = Path::new(source_path);
        let is_midi = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("mid"))
            .unwrap_or(false);
        if !is_midi {
            return Err(Error::Rejected("File must be a .mid file".into()));
        }
        if state.library.iter().any(|t| t.same_file(source_path)) {
            return Err(Error::Rejected(format!("'{}' already exists in album", source_path)));
        }

        let track = Track::from_path(source, None);
        state.library.push(track.clone());
        Ok(track)
    }

    async fn load_library(&self) -> Result<Vec<Track>> {
        let state = self.record(EngineCall::LoadLibrary)?;
        Ok(state.library.clone())
    }

    async fn test_all_keys(&self) -> Result<()> {
        self.record(EngineCall::TestAllKeys)?;
        Ok(())
    }
}

/// List the `.mid` files directly inside an album folder, sorted by name
pub fn scan_album(dir: &Path) -> Vec<Track> {
    if !dir.exists() {
        warn!("Album folder {} does not exist", dir.display());
        return Vec::new();
    }

    let mut tracks: Vec<Track> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("mid"))
                .unwrap_or(false)
        })
        .map(|entry| Track::from_path(entry.path(), None))
        .collect();

    tracks.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Found {} MIDI files in {}", tracks.len(), dir.display());
    tracks
}
