use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::mpsc;

/// Everything the engine pushes to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(f64), // position in seconds
    TrackEnded,
    Shortcut(ShortcutAction),
}

/// Global shortcuts forwarded by the engine's hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    PauseResume,
    Stop,
    Previous,
    Next,
    ToggleLoop,
    ModePrev,
    ModeNext,
    ToggleMini,
}

impl ShortcutAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ShortcutAction::PauseResume => "pause_resume",
            ShortcutAction::Stop => "stop",
            ShortcutAction::Previous => "previous",
            ShortcutAction::Next => "next",
            ShortcutAction::ToggleLoop => "toggle_loop",
            ShortcutAction::ModePrev => "mode_prev",
            ShortcutAction::ModeNext => "mode_next",
            ShortcutAction::ToggleMini => "toggle_mini",
        }
    }
}

impl FromStr for ShortcutAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pause_resume" => Ok(ShortcutAction::PauseResume),
            "stop" => Ok(ShortcutAction::Stop),
            "previous" => Ok(ShortcutAction::Previous),
            "next" => Ok(ShortcutAction::Next),
            "toggle_loop" => Ok(ShortcutAction::ToggleLoop),
            "mode_prev" => Ok(ShortcutAction::ModePrev),
            "mode_next" => Ok(ShortcutAction::ModeNext),
            "toggle_mini" => Ok(ShortcutAction::ToggleMini),
            other => Err(Error::Rejected(format!("unknown shortcut '{}'", other))),
        }
    }
}

/// Sending half handed to the engine side
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    /// Returns false once the controller has stopped listening
    pub fn send(&self, event: EngineEvent) -> bool {
        self.inner.send(event).is_ok()
    }
}

/// Receiving half consumed by the session controller
#[derive(Debug)]
pub struct EventReceiver {
    inner: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.inner.recv().await
    }
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { inner: tx }, EventReceiver { inner: rx })
}
