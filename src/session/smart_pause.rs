// Smart pause - pause playback when the keystroke target loses focus, but never
// right after the user did something themselves

use super::PlaybackController;
use crate::store::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a single smart-pause check decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartPauseCheck {
    Disabled,
    CoolingDown,
    /// Nothing playing, or already paused
    Inactive,
    Focused,
    Paused,
    Failed,
}

/// Deadline pushed forward by every manual action
#[derive(Debug)]
pub(super) struct Cooldown {
    until: Mutex<Option<Instant>>,
    length: Duration,
}

impl Cooldown {
    pub(super) fn new(length: Duration) -> Self {
        Self {
            until: Mutex::new(None),
            length,
        }
    }

    /// Never moves the deadline backwards
    pub(super) fn extend(&self) {
        let target = Instant::now() + self.length;
        let mut until = lock(&self.until);
        if until.map_or(true, |current| current < target) {
            *until = Some(target);
        }
    }

    pub(super) fn active(&self) -> bool {
        lock(&self.until).map_or(false, |until| Instant::now() < until)
    }
}

impl PlaybackController {
    /// One round of the focus check
    pub async fn smart_pause_check(&self) -> SmartPauseCheck {
        if !self.settings.with(|s| s.smart_pause) {
            return SmartPauseCheck::Disabled;
        }
        if self.cooldown.active() {
            return SmartPauseCheck::CoolingDown;
        }
        if !self.session.with(|s| s.is_active()) {
            return SmartPauseCheck::Inactive;
        }

        match self.engine.query_focus().await {
            Ok(true) => return SmartPauseCheck::Focused,
            Ok(false) => {}
            Err(e) => {
                warn!("Focus query failed: {}", e);
                return SmartPauseCheck::Failed;
            }
        }

        // The user may have acted while the focus query was in flight
        if self.cooldown.active() {
            return SmartPauseCheck::CoolingDown;
        }
        if !self.session.with(|s| s.is_active()) {
            return SmartPauseCheck::Inactive;
        }

        match self.engine.pause_resume().await {
            Ok(reply) => {
                self.apply_pause_reply(&reply);
                info!("Target window lost focus, playback paused");
                SmartPauseCheck::Paused
            }
            Err(e) => {
                warn!("Smart pause failed: {}", e);
                SmartPauseCheck::Failed
            }
        }
    }

    /// Run the focus check every `smart_pause_interval` until `cancel` fires
    pub fn spawn_smart_pause(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = self.timing.smart_pause_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        this.smart_pause_check().await;
                    }
                }
            }
            debug!("Smart pause loop stopped");
        })
    }
}
