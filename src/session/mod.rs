// Playback session controller - the state machine between callers, the engine
// and the store. Engine failures are logged here and never reach the caller;
// a failed command leaves the session as it was.

mod listener;
mod seek;
mod smart_pause;

pub use listener::EventListener;
pub use smart_pause::SmartPauseCheck;

use crate::config::TimingConfig;
use crate::engine::{
    Engine, EngineEvent, EngineStatus, NoteMode, PauseResumeReply, ShortcutAction, MAX_OCTAVE_SHIFT,
    MIN_OCTAVE_SHIFT,
};
use crate::queue::QueueManager;
use crate::store::{AppStore, Observable, PlayerSettings, SessionState};
use crate::track::Track;
use seek::SeekGesture;
use smart_pause::Cooldown;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct PlaybackController {
    engine: Arc<dyn Engine>,
    queue: Arc<QueueManager>,
    session: Observable<SessionState>,
    settings: Observable<PlayerSettings>,
    library: Observable<Vec<Track>>,
    timing: TimingConfig,
    cooldown: Cooldown,
    seek: Mutex<SeekGesture>,
}

impl PlaybackController {
    pub fn new(
        store: &AppStore,
        engine: Arc<dyn Engine>,
        queue: Arc<QueueManager>,
        timing: TimingConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            queue,
            session: store.session.clone(),
            settings: store.settings.clone(),
            library: store.library.clone(),
            cooldown: Cooldown::new(timing.smart_pause_cooldown()),
            timing,
            seek: Mutex::new(SeekGesture::default()),
        })
    }

    pub fn session(&self) -> SessionState {
        self.session.get()
    }

    pub fn settings(&self) -> PlayerSettings {
        self.settings.get()
    }

    pub fn queue(&self) -> &Arc<QueueManager> {
        &self.queue
    }

    // ---- transport -------------------------------------------------------

    pub async fn play(&self, path: &str) {
        self.cooldown.extend();
        self.load_and_play(path).await;
        self.cooldown.extend();
    }

    /// Two-phase start: reset optimistically, then trust the engine's status
    /// once the grace delay has passed.
    async fn load_and_play(&self, path: &str) {
        self.session.update(|s| {
            s.current_position = 0.0;
            s.is_playing = false;
            s.is_paused = false;
            s.is_loading = true;
        });

        if let Err(e) = self.engine.play(path).await {
            warn!("Failed to play '{}': {}", path, e);
            self.session.update(|s| s.is_loading = false);
            return;
        }

        tokio::time::sleep(self.timing.play_grace()).await;

        let status = self.engine.query_status().await;
        let fallback_duration = self.library_duration(path);
        self.session.update(|s| {
            match &status {
                Ok(status) => {
                    s.current_position = status.current_position;
                    s.total_duration = status.total_duration;
                    s.is_paused = status.is_paused;
                }
                Err(_) => s.total_duration = fallback_duration.unwrap_or(0.0),
            }
            s.is_loading = false;
            s.is_playing = true;
            s.current_file = Some(path.to_string());
        });
        match status {
            Ok(status) => self.sync_settings(&status),
            Err(e) => warn!("Status refresh after play failed: {}", e),
        }

        if let Err(e) = self.engine.focus().await {
            debug!("Focus request failed: {}", e);
        }
        info!("Playing '{}'", path);
    }

    /// Make queue entry `index` current and play it
    pub async fn play_index(&self, index: usize) {
        match self.queue.set_current(index) {
            Ok(track) => self.play(&track.path).await,
            Err(e) => warn!("Cannot play queue entry: {}", e),
        }
    }

    pub async fn next(&self) {
        match self.queue.advance(true) {
            Some(track) => self.play(&track.path).await,
            None => debug!("Queue is empty, nothing to skip to"),
        }
    }

    pub async fn previous(&self) {
        match self.queue.advance(false) {
            Some(track) => self.play(&track.path).await,
            None => debug!("Queue is empty, nothing to go back to"),
        }
    }

    /// Replace the queue with a saved playlist, optionally starting its first track
    pub async fn load_playlist(&self, id: &str, auto_play: bool) {
        match self.queue.load_playlist_to_queue(id) {
            Ok(Some(first)) if auto_play => self.play(&first.path).await,
            Ok(_) => {}
            Err(e) => warn!("Cannot load playlist: {}", e),
        }
    }

    /// Toggle pause. With nothing playing, start the current queue entry instead.
    pub async fn pause_resume(&self) {
        self.cooldown.extend();

        let idle = self.session.with(|s| !s.is_playing && !s.is_loading);
        if idle {
            if let Some(track) = self.queue.current_track() {
                self.play(&track.path).await;
                return;
            }
        }

        match self.engine.pause_resume().await {
            Ok(reply) => {
                let resumed = reply.is_playing && !reply.is_paused;
                self.apply_pause_reply(&reply);
                if resumed {
                    if let Err(e) = self.engine.focus().await {
                        debug!("Focus request failed: {}", e);
                    }
                    self.cooldown.extend();
                    info!("Resumed");
                } else if reply.is_paused {
                    info!("Paused");
                }
            }
            Err(e) => warn!("Pause/resume failed: {}", e),
        }
    }

    pub async fn stop(&self) {
        self.cooldown.extend();
        match self.engine.stop().await {
            Ok(()) => {
                self.session.update(|s| {
                    s.current_file = None;
                    s.current_position = 0.0;
                    s.total_duration = 0.0;
                    s.is_playing = false;
                    s.is_paused = false;
                    s.is_loading = false;
                });
                info!("Stopped");
            }
            Err(e) => warn!("Stop failed: {}", e),
        }
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.cooldown.extend();
        match self.engine.set_loop(enabled).await {
            Ok(()) => {
                self.session.update(|s| s.loop_mode = enabled);
                info!("Loop {}", if enabled { "on" } else { "off" });
            }
            Err(e) => warn!("Failed to set loop: {}", e),
        }
    }

    pub async fn toggle_loop(&self) {
        let enabled = self.session.with(|s| s.loop_mode);
        self.set_loop(!enabled).await;
    }

    // ---- engine events ---------------------------------------------------

    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(position) => self.on_progress(position),
            EngineEvent::TrackEnded => self.on_track_ended().await,
            EngineEvent::Shortcut(action) => self.handle_shortcut(action).await,
        }
    }

    fn on_progress(&self, position: f64) {
        // A drag in flight owns the position until it settles, and a track that is
        // still loading gets its position from the status refresh
        let applied = self.session.try_update(|s| {
            if s.is_seeking || s.is_loading {
                return Err(());
            }
            s.current_position = position;
            Ok(())
        });
        if applied.is_err() {
            debug!("Progress {:.1}s ignored while seeking or loading", position);
        }
    }

    /// Loop replays a single-entry queue, a longer queue advances (wrapping),
    /// anything else goes idle.
    async fn on_track_ended(&self) {
        let loop_mode = self.session.with(|s| s.loop_mode);
        let queue = self.queue.queue();

        if loop_mode && queue.len() == 1 {
            let path = queue.tracks[0].path.clone();
            info!("Track ended, looping '{}'", path);
            self.load_and_play(&path).await;
        } else if queue.len() > 1 {
            match self.queue.advance(true) {
                Some(track) => {
                    info!("Track ended, advancing to '{}'", track.name);
                    self.load_and_play(&track.path).await;
                }
                None => warn!("Auto-advance failed: queue emptied"),
            }
        } else {
            self.session.update(|s| {
                s.current_file = None;
                s.current_position = 0.0;
                s.is_playing = false;
                s.is_paused = false;
            });
            info!("Track ended, playback idle");
        }
    }

    pub async fn handle_shortcut(&self, action: ShortcutAction) {
        debug!("Shortcut: {}", action.as_str());
        match action {
            ShortcutAction::PauseResume => self.pause_resume().await,
            ShortcutAction::Stop => self.stop().await,
            ShortcutAction::Previous => self.previous().await,
            ShortcutAction::Next => self.next().await,
            ShortcutAction::ToggleLoop => self.toggle_loop().await,
            ShortcutAction::ModePrev => self.cycle_note_mode(false).await,
            ShortcutAction::ModeNext => self.cycle_note_mode(true).await,
            ShortcutAction::ToggleMini => self.toggle_mini_mode(),
        }
    }

    // ---- engine configuration pass-throughs -------------------------------

    pub async fn set_note_mode(&self, mode: NoteMode) {
        match self.engine.set_note_mode(mode).await {
            Ok(()) => {
                self.settings.update(|s| s.note_mode = mode);
                info!("Note mode: {}", mode.label());
            }
            Err(e) => warn!("Failed to set note mode: {}", e),
        }
    }

    pub async fn cycle_note_mode(&self, forward: bool) {
        let current = self.settings.with(|s| s.note_mode);
        let mode = if forward { current.next() } else { current.prev() };
        self.set_note_mode(mode).await;
    }

    /// Shift is clamped to the supported octave range before it is sent
    pub async fn set_octave_shift(&self, shift: i8) {
        let shift = shift.clamp(MIN_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT);
        match self.engine.set_octave_shift(shift).await {
            Ok(()) => {
                self.settings.update(|s| s.octave_shift = shift);
                info!("Octave shift: {:+}", shift);
            }
            Err(e) => warn!("Failed to set octave shift: {}", e),
        }
    }

    pub async fn set_interaction_mode(&self, interactive: bool) {
        match self.engine.set_interaction_mode(interactive).await {
            Ok(()) => self.settings.update(|s| s.interactive = interactive),
            Err(e) => warn!("Failed to set interaction mode: {}", e),
        }
    }

    pub fn set_smart_pause(&self, enabled: bool) {
        self.settings.update(|s| s.smart_pause = enabled);
        info!("Smart pause {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn toggle_mini_mode(&self) {
        let mini = self.settings.update(|s| {
            s.mini_mode = !s.mini_mode;
            s.mini_mode
        });
        debug!("Mini mode: {}", mini);
    }

    pub async fn refresh_library(&self) {
        match self.engine.load_library().await {
            Ok(tracks) => {
                info!("Library loaded: {} tracks", tracks.len());
                self.library.set(tracks);
            }
            Err(e) => warn!("Failed to load library: {}", e),
        }
    }

    /// Copy a file into the album; the new track lands at the end of the library
    pub async fn import_track(&self, source_path: &str) -> Option<Track> {
        match self.engine.import_track(source_path).await {
            Ok(track) => {
                info!("Imported '{}'", track.name);
                self.library.update(|tracks| tracks.push(track.clone()));
                Some(track)
            }
            Err(e) => {
                warn!("Import of '{}' failed: {}", source_path, e);
                None
            }
        }
    }

    pub async fn test_all_keys(&self) {
        if let Err(e) = self.engine.test_all_keys().await {
            warn!("Key test failed: {}", e);
        }
    }

    /// Pull the full engine status into the session and settings cells
    pub async fn refresh_status(&self) {
        match self.engine.query_status().await {
            Ok(status) => {
                // A stopped engine may still report its last file; idle has none
                let stopped = !status.is_playing && !status.is_paused;
                self.session.update(|s| {
                    s.is_playing = status.is_playing;
                    s.is_paused = status.is_paused;
                    s.loop_mode = status.loop_mode;
                    if stopped {
                        s.current_file = None;
                        s.total_duration = 0.0;
                        s.current_position = 0.0;
                    } else {
                        s.current_file = status.current_file.clone();
                        s.total_duration = status.total_duration;
                        if !s.is_seeking {
                            s.current_position = status.current_position;
                        }
                    }
                });
                self.sync_settings(&status);
            }
            Err(e) => warn!("Status refresh failed: {}", e),
        }
    }

    // ---- helpers ---------------------------------------------------------

    fn apply_pause_reply(&self, reply: &PauseResumeReply) {
        self.session.update(|s| {
            s.is_paused = reply.is_paused;
            s.is_playing = reply.is_playing;
            s.current_position = reply.current_position;
            s.total_duration = reply.total_duration;
        });
    }

    fn sync_settings(&self, status: &EngineStatus) {
        let in_sync = self.settings.with(|s| {
            s.note_mode == status.note_mode && s.octave_shift == status.octave_shift
        });
        if !in_sync {
            self.settings.update(|s| {
                s.note_mode = status.note_mode;
                s.octave_shift = status.octave_shift;
            });
        }
    }

    fn library_duration(&self, path: &str) -> Option<f64> {
        self.library
            .with(|tracks| tracks.iter().find(|t| t.same_file(path)).and_then(|t| t.duration))
    }
}

#[cfg(test)]
mod tests;
