// keyplayer - plays MIDI files as keystrokes through an external engine
// This binary drives the simulated engine from a line-based shell, which is
// handy for poking at the session logic without the real backend

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Command, HELP};
use keyplayer::engine::{event_channel, scan_album};
use keyplayer::{Config, PlaybackPhase, Player, SessionState, SimulatedEngine, Track};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "keyplayer")]
#[command(about = "Queue and play MIDI files on a keyboard automation engine")]
struct Args {
    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    /// Read settings from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Album folder with .mid files (overrides the config)
    #[arg(long)]
    library: Option<PathBuf>,
}

fn init_logging(log_dir: &Path, dev: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "keyplayer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,keyplayer=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(base_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if dev {
        eprintln!("🔧 Dev mode: debug output to stderr + file");
    }
    Ok(guard)
}

fn describe(session: &SessionState) -> String {
    let file = session.current_file.as_deref().unwrap_or("-");
    match session.phase() {
        PlaybackPhase::Idle => "⏹  idle".to_string(),
        PlaybackPhase::Loading => format!("⏳ loading {}", file),
        PlaybackPhase::Playing => format!("▶  {}", file),
        PlaybackPhase::Paused => format!("⏸  {}", file),
    }
}

fn print_tracks(title: &str, tracks: &[Track]) {
    println!("{} ({})", title, tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        println!("  {:>3}. {} [{}]", i + 1, track.name, track.duration_string());
    }
}

fn library_track(player: &Player, index: usize) -> Option<Track> {
    let track = player.store().library.with(|tracks| tracks.get(index).cloned());
    if track.is_none() {
        println!("No album track #{}", index + 1);
    }
    track
}

/// Run one command. Returns false when the shell should exit.
async fn execute(player: &Player, command: Command) -> bool {
    let controller = player.controller();
    let queue = player.queue();

    match command {
        Command::Play(index) => {
            if let Some(track) = library_track(player, index) {
                controller.play(&track.path).await;
            }
        }
        Command::Pause => controller.pause_resume().await,
        Command::Stop => controller.stop().await,
        Command::Next => controller.next().await,
        Command::Prev => controller.previous().await,
        Command::Seek(position) => controller.seek(position).await,
        Command::Loop => controller.toggle_loop().await,
        Command::Library => print_tracks("Album", &player.store().library.get()),
        Command::Queue => {
            let state = queue.queue();
            println!("Queue ({})", state.len());
            for (i, track) in state.tracks.iter().enumerate() {
                let marker = if i == state.current_index { '>' } else { ' ' };
                println!(" {}{:>3}. {}", marker, i + 1, track.name);
            }
        }
        Command::Add(index) => {
            if let Some(track) = library_track(player, index) {
                queue.enqueue(track);
            }
        }
        Command::Remove(index) => match queue.remove(index) {
            Ok(track) => println!("Removed {}", track.name),
            Err(e) => println!("{}", e),
        },
        Command::Move(from, to) => {
            if let Err(e) = queue.reorder(from, to) {
                println!("{}", e);
            }
        }
        Command::Clear => queue.clear(),
        Command::Fav(index) => {
            if let Some(track) = library_track(player, index) {
                let now = player.favorites().toggle(&track);
                println!("{} {}", if now { "★" } else { "☆" }, track.name);
            }
        }
        Command::Favs => print_tracks("Favorites", &player.favorites().favorites()),
        Command::Mode { forward } => controller.cycle_note_mode(forward).await,
        Command::Octave(shift) => controller.set_octave_shift(shift).await,
        Command::Smart(enabled) => controller.set_smart_pause(enabled),
        Command::PlaylistNew(name) => match queue.create_playlist(&name) {
            Ok(id) => println!("Created playlist {} ({})", name, id),
            Err(e) => println!("{}", e),
        },
        Command::PlaylistSave(name) => match queue.save_queue_as_playlist(&name) {
            Ok(id) => println!("Saved queue as {} ({})", name, id),
            Err(e) => println!("{}", e),
        },
        Command::PlaylistAdd(id, index) => {
            if let Some(track) = library_track(player, index) {
                match queue.add_track_to_playlist(&id, track) {
                    Ok(true) => {}
                    Ok(false) => println!("Already in that playlist"),
                    Err(e) => println!("{}", e),
                }
            }
        }
        Command::PlaylistLoad(id) => controller.load_playlist(&id, true).await,
        Command::PlaylistRemove(id) => {
            if let Err(e) = queue.delete_playlist(&id) {
                println!("{}", e);
            }
        }
        Command::PlaylistRename(id, name) => {
            if let Err(e) = queue.rename_playlist(&id, &name) {
                println!("{}", e);
            }
        }
        Command::Playlists => {
            let active = queue.active_playlist_id();
            for playlist in queue.playlists() {
                let marker = if active.as_deref() == Some(playlist.id.as_str()) { '*' } else { ' ' };
                let minutes = (playlist.total_duration() / 60.0) as u64;
                let seconds = (playlist.total_duration() % 60.0) as u64;
                println!(
                    " {} {}  {} ({} tracks, {}:{:02})",
                    marker,
                    playlist.id,
                    playlist.name,
                    playlist.tracks.len(),
                    minutes,
                    seconds
                );
            }
        }
        Command::Import(path) => {
            if let Some(track) = controller.import_track(&path).await {
                println!("Imported {}", track.name);
            }
        }
        Command::Shortcut(action) => player.dispatch(action).await,
        Command::TestKeys => controller.test_all_keys().await,
        Command::Status => {
            controller.refresh_status().await;
            let session = controller.session();
            let settings = controller.settings();
            println!(
                "{}  {:.1}/{:.1}s  loop:{}  mode:{}  octave:{:+}  smart-pause:{}",
                describe(&session),
                session.current_position,
                session.total_duration,
                if session.loop_mode { "on" } else { "off" },
                settings.note_mode.label(),
                settings.octave_shift,
                if settings.smart_pause { "on" } else { "off" },
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _log_guard = init_logging(&config.log_dir, args.dev)?;
    info!("🎹 keyplayer starting up");

    let library_dir = args.library.clone().unwrap_or_else(|| config.library_dir.clone());
    let engine = Arc::new(SimulatedEngine::new(scan_album(&library_dir)));
    let (events_tx, events_rx) = event_channel();
    engine.set_event_sender(events_tx);

    let clock_cancel = CancellationToken::new();
    let clock = engine.spawn_clock(config.timing.progress_interval(), clock_cancel.clone());

    let player = Player::start(&config, engine, events_rx).await;

    // Echo phase changes, not every progress tick
    let last_line = Mutex::new(String::new());
    let _status_echo = player.store().session.subscribe(move |session| {
        let line = describe(session);
        let mut last = last_line.lock().unwrap_or_else(|e| e.into_inner());
        if *last != line {
            println!("{}", line);
            *last = line;
        }
    });

    println!("🎹 keyplayer - {} tracks in {}", player.store().library.with(Vec::len), library_dir.display());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Ok(command) => {
                debug!("Command: {:?}", command);
                if !execute(&player, command).await {
                    break;
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    player.shutdown().await;
    clock_cancel.cancel();
    clock.await?;
    info!("👋 keyplayer exiting");
    Ok(())
}
