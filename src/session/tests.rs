use super::*;
use crate::engine::{event_channel, EngineCall, SimulatedEngine};
use crate::error::Error;
use crate::persistence::Persistence;
use crate::store::PlaybackPhase;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

struct Harness {
    controller: Arc<PlaybackController>,
    engine: Arc<SimulatedEngine>,
    queue: Arc<QueueManager>,
    store: AppStore,
}

fn library() -> Vec<Track> {
    vec![
        Track::new("a.mid", "a", Some(30.0)),
        Track::new("b.mid", "b", Some(40.0)),
        Track::new("c.mid", "c", Some(50.0)),
    ]
}

fn harness() -> Harness {
    let store = AppStore::new();
    let engine = Arc::new(SimulatedEngine::new(library()));
    let queue = Arc::new(QueueManager::new(&store, Persistence::in_memory()));
    let controller = PlaybackController::new(
        &store,
        engine.clone(),
        Arc::clone(&queue),
        TimingConfig::default(),
    );
    Harness {
        controller,
        engine,
        queue,
        store,
    }
}

/// Queue the given library paths and point at `current`
fn queue_up(h: &Harness, paths: &[&str], current: usize) {
    for path in paths {
        let track = library()
            .into_iter()
            .find(|t| t.path == *path)
            .unwrap();
        h.queue.enqueue(track);
    }
    h.queue.set_current(current).unwrap();
}

async fn wait_out_cooldown() {
    sleep(TimingConfig::default().smart_pause_cooldown() + Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn test_play_resets_optimistically_then_applies_engine_status() {
    let h = harness();
    h.store.session.set(SessionState {
        is_playing: true,
        current_position: 55.0,
        total_duration: 90.0,
        current_file: Some("old.mid".into()),
        ..Default::default()
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = h.store.session.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

    let started = Instant::now();
    h.controller.play("b.mid").await;
    assert!(started.elapsed() >= TimingConfig::default().play_grace());

    let seen = seen.lock().unwrap();
    let first = &seen[0];
    assert_eq!(first.current_position, 0.0);
    assert!(!first.is_playing);
    assert!(first.is_loading);
    assert_eq!(first.phase(), PlaybackPhase::Loading);

    let session = h.controller.session();
    assert!(session.is_playing);
    assert!(!session.is_loading);
    assert_eq!(session.current_file.as_deref(), Some("b.mid"));
    assert_eq!(session.total_duration, 40.0);
    assert_eq!(session.phase(), PlaybackPhase::Playing);

    assert_eq!(
        h.engine.calls(),
        vec![
            EngineCall::Play("b.mid".into()),
            EngineCall::QueryStatus,
            EngineCall::Focus,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_play_keeps_the_optimistic_reset_only() {
    let h = harness();
    h.controller.play("a.mid").await;

    h.controller.play("missing.mid").await;
    let session = h.controller.session();
    assert!(!session.is_playing);
    assert!(!session.is_loading);
    assert_eq!(session.current_position, 0.0);
    // the file pointer is only moved by a successful play
    assert_eq!(session.current_file.as_deref(), Some("a.mid"));
}

#[tokio::test(start_paused = true)]
async fn test_pause_resume_follows_engine_and_refocuses_on_resume() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.clear_calls();

    h.controller.pause_resume().await;
    let session = h.controller.session();
    assert!(session.is_paused);
    assert_eq!(session.phase(), PlaybackPhase::Paused);
    assert_eq!(h.engine.count(&EngineCall::Focus), 0);

    h.controller.pause_resume().await;
    assert!(!h.controller.session().is_paused);
    assert_eq!(h.engine.count(&EngineCall::Focus), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_resume_when_idle_starts_the_current_queue_entry() {
    let h = harness();
    queue_up(&h, &["a.mid", "c.mid"], 1);

    h.controller.pause_resume().await;
    assert_eq!(h.engine.play_calls(), vec!["c.mid".to_string()]);
    assert_eq!(h.engine.count(&EngineCall::PauseResume), 0);
    assert!(h.controller.session().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_stop_returns_to_idle() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.tick(12.0);

    h.controller.stop().await;
    let session = h.controller.session();
    assert_eq!(session.current_file, None);
    assert_eq!(session.current_position, 0.0);
    assert!(!session.is_playing);
    assert!(!session.is_paused);
    assert_eq!(session.phase(), PlaybackPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_engine_leaves_session_untouched() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.controller.handle_event(EngineEvent::Progress(7.0)).await;
    let before = h.controller.session();

    h.engine.set_available(false);
    h.controller.pause_resume().await;
    h.controller.stop().await;
    h.controller.set_loop(true).await;
    h.controller.seek(20.0).await;
    sleep(Duration::from_secs(1)).await;

    // the drag preview is rolled back when the engine refuses the seek
    assert_eq!(h.controller.session(), before);
}

#[tokio::test(start_paused = true)]
async fn test_refused_seek_restores_position_from_before_the_drag() {
    let h = harness();
    h.controller.play("b.mid").await;
    h.controller.handle_event(EngineEvent::Progress(7.0)).await;
    h.engine.set_available(false);

    // the debounce timer fires mid-drag and fails
    h.controller.seek_to(12.0);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.controller.session().current_position, 7.0);

    h.controller.seek_to(18.0);
    h.controller.seek_to(25.0);
    h.controller.end_seek().await;
    assert_eq!(h.controller.session().current_position, 7.0);

    sleep(Duration::from_secs(1)).await;
    let session = h.controller.session();
    assert!(!session.is_seeking);
    assert_eq!(session.current_position, 7.0);
    assert_eq!(h.engine.seek_calls(), vec![12.0, 25.0]);
}

#[tokio::test(start_paused = true)]
async fn test_seek_burst_coalesces_into_latest_position() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.clear_calls();

    for position in [10.0, 12.0, 15.0, 20.0] {
        h.controller.seek_to(position);
        assert!(h.controller.session().is_seeking);
        sleep(Duration::from_millis(20)).await;
    }
    assert!(h.engine.seek_calls().is_empty());
    assert_eq!(h.controller.session().current_position, 20.0);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(h.engine.seek_calls(), vec![20.0]);
    assert_eq!(h.controller.session().current_position, 20.0);
}

#[tokio::test(start_paused = true)]
async fn test_end_seek_flushes_without_waiting() {
    let h = harness();
    h.controller.play("b.mid").await;
    h.engine.clear_calls();

    h.controller.seek_to(30.0);
    h.controller.end_seek().await;
    assert_eq!(h.engine.seek_calls(), vec![30.0]);
    assert!(h.controller.session().is_seeking);

    // the debounce timer armed by seek_to must not fire a second call
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.engine.seek_calls(), vec![30.0]);
    assert!(!h.controller.session().is_seeking);
}

#[tokio::test(start_paused = true)]
async fn test_drag_preview_is_clamped_to_track_length() {
    let h = harness();
    h.controller.play("a.mid").await;

    h.controller.seek(99.0).await;
    assert_eq!(h.engine.seek_calls(), vec![30.0]);
}

#[tokio::test(start_paused = true)]
async fn test_progress_ignored_while_seeking() {
    let h = harness();
    h.controller.play("b.mid").await;

    h.controller.seek_to(10.0);
    h.controller.handle_event(EngineEvent::Progress(3.0)).await;
    assert_eq!(h.controller.session().current_position, 10.0);

    h.controller.end_seek().await;
    h.controller.handle_event(EngineEvent::Progress(3.5)).await;
    assert_eq!(h.controller.session().current_position, 10.0);

    sleep(TimingConfig::default().seek_settle() + Duration::from_millis(10)).await;
    h.controller.handle_event(EngineEvent::Progress(12.0)).await;
    assert_eq!(h.controller.session().current_position, 12.0);
}

#[tokio::test(start_paused = true)]
async fn test_track_end_with_loop_replays_single_entry() {
    let h = harness();
    queue_up(&h, &["a.mid"], 0);
    h.controller.set_loop(true).await;
    h.controller.play_index(0).await;
    h.engine.clear_calls();

    h.engine.finish_track();
    h.controller.handle_event(EngineEvent::TrackEnded).await;

    assert_eq!(h.engine.play_calls(), vec!["a.mid".to_string()]);
    assert!(h.controller.session().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_track_end_at_last_entry_wraps_to_first() {
    let h = harness();
    queue_up(&h, &["a.mid", "b.mid", "c.mid"], 2);
    h.controller.set_loop(true).await;
    h.controller.play_index(2).await;
    h.engine.clear_calls();

    h.controller.handle_event(EngineEvent::TrackEnded).await;

    assert_eq!(h.queue.queue().current_index, 0);
    assert_eq!(h.engine.play_calls(), vec!["a.mid".to_string()]);
    assert_eq!(h.controller.session().current_file.as_deref(), Some("a.mid"));
}

#[tokio::test(start_paused = true)]
async fn test_track_end_without_loop_on_single_entry_goes_idle() {
    let h = harness();
    queue_up(&h, &["a.mid"], 0);
    h.controller.play_index(0).await;
    h.engine.tick(10.0);
    h.controller.handle_event(EngineEvent::Progress(10.0)).await;
    h.engine.clear_calls();

    h.controller.handle_event(EngineEvent::TrackEnded).await;

    let session = h.controller.session();
    assert_eq!(session.phase(), PlaybackPhase::Idle);
    assert_eq!(session.current_position, 0.0);
    assert!(h.engine.play_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_smart_pause_waits_out_the_cooldown() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.set_focused(false);
    h.engine.clear_calls();

    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::CoolingDown);
    assert!(h.engine.calls().is_empty());

    wait_out_cooldown().await;
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::Paused);
    assert_eq!(h.engine.count(&EngineCall::PauseResume), 1);
    assert!(h.controller.session().is_paused);

    // already paused: nothing more to do
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::Inactive);
    assert_eq!(h.engine.count(&EngineCall::PauseResume), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_actions_extend_the_cooldown() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.set_focused(false);
    wait_out_cooldown().await;

    h.controller.toggle_loop().await;
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::CoolingDown);

    wait_out_cooldown().await;
    h.controller.seek(5.0).await;
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::CoolingDown);
}

#[tokio::test(start_paused = true)]
async fn test_smart_pause_respects_setting_and_focus() {
    let h = harness();
    h.controller.play("a.mid").await;
    wait_out_cooldown().await;

    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::Focused);

    h.engine.set_focused(false);
    h.controller.set_smart_pause(false);
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::Disabled);

    h.controller.set_smart_pause(true);
    h.engine.set_available(false);
    assert_eq!(h.controller.smart_pause_check().await, SmartPauseCheck::Failed);
    assert!(!h.controller.session().is_paused);
}

#[tokio::test(start_paused = true)]
async fn test_smart_pause_loop_pauses_once_and_stops_on_cancel() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.engine.set_focused(false);

    let cancel = CancellationToken::new();
    let task = h.controller.spawn_smart_pause(cancel.clone());
    sleep(Duration::from_secs(6)).await;

    assert!(h.controller.session().is_paused);
    assert_eq!(h.engine.count(&EngineCall::PauseResume), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_attached_listener_handles_events_until_shutdown() {
    let h = harness();
    let (sender, receiver) = event_channel();
    let listener = h.controller.attach(receiver);
    h.controller.play("a.mid").await;

    assert!(sender.send(EngineEvent::Progress(5.0)));
    assert!(sender.send(EngineEvent::Shortcut(ShortcutAction::ToggleLoop)));
    sleep(Duration::from_millis(10)).await;

    let session = h.controller.session();
    assert_eq!(session.current_position, 5.0);
    assert!(session.loop_mode);

    listener.shutdown().await;
    assert!(!sender.send(EngineEvent::Progress(6.0)));
}

#[tokio::test(start_paused = true)]
async fn test_shortcuts_map_to_controller_operations() {
    let h = harness();
    queue_up(&h, &["a.mid", "b.mid", "c.mid"], 0);

    h.controller.handle_shortcut(ShortcutAction::Previous).await;
    assert_eq!(h.queue.queue().current_index, 2);
    assert_eq!(h.controller.session().current_file.as_deref(), Some("c.mid"));

    h.controller.handle_shortcut(ShortcutAction::Next).await;
    assert_eq!(h.controller.session().current_file.as_deref(), Some("a.mid"));

    h.controller.handle_shortcut(ShortcutAction::ModeNext).await;
    assert_eq!(h.controller.settings().note_mode, NoteMode::Quantize);
    h.controller.handle_shortcut(ShortcutAction::ModePrev).await;
    h.controller.handle_shortcut(ShortcutAction::ModePrev).await;
    assert_eq!(h.controller.settings().note_mode, NoteMode::Raw);

    h.controller.handle_shortcut(ShortcutAction::ToggleMini).await;
    assert!(h.controller.settings().mini_mode);

    h.controller.handle_shortcut(ShortcutAction::Stop).await;
    assert_eq!(h.controller.session().phase(), PlaybackPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_load_playlist_with_auto_play() {
    let h = harness();
    let id = h.queue.create_playlist("Set").unwrap();
    h.queue
        .add_track_to_playlist(&id, Track::new("c.mid", "c", Some(50.0)))
        .unwrap();

    h.controller.load_playlist(&id, false).await;
    assert!(h.engine.play_calls().is_empty());

    h.controller.load_playlist(&id, true).await;
    assert_eq!(h.engine.play_calls(), vec!["c.mid".to_string()]);

    h.controller.load_playlist("nope", true).await;
    assert_eq!(h.engine.play_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_octave_shift_is_clamped() {
    let h = harness();
    h.controller.set_octave_shift(5).await;
    assert_eq!(h.controller.settings().octave_shift, MAX_OCTAVE_SHIFT);
    assert_eq!(h.engine.count(&EngineCall::SetOctaveShift(2)), 1);

    h.controller.set_octave_shift(-9).await;
    assert_eq!(h.controller.settings().octave_shift, MIN_OCTAVE_SHIFT);
}

#[tokio::test(start_paused = true)]
async fn test_library_refresh_and_import() {
    let h = harness();
    h.controller.refresh_library().await;
    assert_eq!(h.store.library.get().len(), 3);

    let imported = h.controller.import_track("/music/new song.mid").await.unwrap();
    assert_eq!(imported.name, "new song");
    assert_eq!(h.store.library.get().len(), 4);

    assert!(h.controller.import_track("/music/cover.png").await.is_none());
    assert_eq!(h.store.library.get().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_status_syncs_settings() {
    let h = harness();
    h.controller.play("a.mid").await;
    // change the engine behind the controller's back
    h.engine.set_note_mode(NoteMode::Chromatic).await.unwrap();
    h.engine.set_loop(true).await.unwrap();

    h.controller.refresh_status().await;
    assert_eq!(h.controller.settings().note_mode, NoteMode::Chromatic);
    assert!(h.controller.session().loop_mode);

    h.engine.set_available(false);
    h.controller.test_all_keys().await;
    assert!(matches!(h.engine.query_status().await, Err(Error::EngineUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_status_refresh_after_stop_stays_idle() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.controller.stop().await;

    // the engine still remembers its last file after a stop
    let status = h.engine.query_status().await.unwrap();
    assert_eq!(status.current_file.as_deref(), Some("a.mid"));

    h.controller.refresh_status().await;
    let session = h.controller.session();
    assert_eq!(session.current_file, None);
    assert_eq!(session.total_duration, 0.0);
    assert_eq!(session.phase(), PlaybackPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_track_end_without_loop_on_longer_queue_still_wraps() {
    let h = harness();
    queue_up(&h, &["a.mid", "b.mid", "c.mid"], 2);
    h.controller.play_index(2).await;
    assert!(!h.controller.session().loop_mode);
    h.engine.clear_calls();

    h.controller.handle_event(EngineEvent::TrackEnded).await;

    assert_eq!(h.queue.queue().current_index, 0);
    assert_eq!(h.engine.play_calls(), vec!["a.mid".to_string()]);
    assert_eq!(h.controller.session().phase(), PlaybackPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_loop_toggle_is_mirrored_to_the_engine() {
    let h = harness();

    h.controller.toggle_loop().await;
    assert!(h.controller.session().loop_mode);
    assert_eq!(h.engine.count(&EngineCall::SetLoop(true)), 1);
    assert!(h.engine.query_status().await.unwrap().loop_mode);

    h.controller.toggle_loop().await;
    assert!(!h.controller.session().loop_mode);
    assert_eq!(h.engine.count(&EngineCall::SetLoop(false)), 1);

    // a refused toggle leaves the flag alone
    h.engine.set_available(false);
    h.controller.toggle_loop().await;
    assert!(!h.controller.session().loop_mode);
}

#[tokio::test(start_paused = true)]
async fn test_progress_ignored_while_loading() {
    let h = harness();
    h.controller.play("a.mid").await;
    h.controller.handle_event(EngineEvent::Progress(25.0)).await;

    let controller = Arc::clone(&h.controller);
    let switching = tokio::spawn(async move { controller.play("b.mid").await });
    // still inside the grace delay
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.controller.session().phase(), PlaybackPhase::Loading);

    // a late tick from the old track must not show up on the new one
    h.controller.handle_event(EngineEvent::Progress(25.5)).await;
    assert_eq!(h.controller.session().current_position, 0.0);

    switching.await.unwrap();
    let session = h.controller.session();
    assert_eq!(session.current_file.as_deref(), Some("b.mid"));
    assert_eq!(session.current_position, 0.0);
    assert_eq!(session.total_duration, 40.0);
}
