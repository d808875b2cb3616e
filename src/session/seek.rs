// Seek gesture bookkeeping - coalesces a drag into one engine seek

use super::PlaybackController;
use crate::store::lock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pending target of the current drag plus a generation counter.
///
/// Every new request or flush bumps the generation; a timer that wakes up to a
/// different generation than it was armed with has been superseded and does nothing.
/// `origin` is the position before the drag started, restored if the engine refuses the seek.
#[derive(Debug, Default)]
pub(super) struct SeekGesture {
    pending: Option<f64>,
    origin: Option<f64>,
    generation: u64,
}

impl SeekGesture {
    /// Record the latest target and return the generation a debounce timer should watch
    fn request(&mut self, position: f64, before: f64) -> u64 {
        self.origin.get_or_insert(before);
        self.pending = Some(position);
        self.generation += 1;
        self.generation
    }

    /// Take the pending target if no newer request arrived since `generation`
    fn take_if_current(&mut self, generation: u64) -> Option<f64> {
        if self.generation == generation {
            self.pending.take()
        } else {
            None
        }
    }

    /// End of drag: take whatever is pending and invalidate outstanding timers
    fn finish(&mut self) -> (Option<f64>, u64) {
        self.generation += 1;
        let pending = self.pending.take();
        if pending.is_none() {
            self.origin = None;
        }
        (pending, self.generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// Clamp a preview position into the known track length
fn clamp_position(position: f64, total: f64) -> f64 {
    let position = position.max(0.0);
    if total > 0.0 {
        position.min(total)
    } else {
        position
    }
}

impl PlaybackController {
    /// One step of a drag gesture: preview locally now, talk to the engine once
    /// the gesture has been quiet for the debounce window.
    pub fn seek_to(self: &Arc<Self>, position: f64) {
        self.cooldown.extend();
        let (position, before) = self.session.update(|s| {
            let before = s.current_position;
            let position = clamp_position(position, s.total_duration);
            s.is_seeking = true;
            s.current_position = position;
            (position, before)
        });

        let generation = lock(&self.seek).request(position, before);
        let this = Arc::clone(self);
        let debounce = self.timing.seek_debounce();
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let due = lock(&this.seek).take_if_current(generation);
            if let Some(position) = due {
                this.issue_seek(position).await;
            }
        });
    }

    /// End of drag: flush the pending seek right away, then drop the seeking
    /// flag once the settle delay has swallowed any stale progress ticks.
    pub async fn end_seek(self: &Arc<Self>) {
        let (pending, generation) = lock(&self.seek).finish();
        if let Some(position) = pending {
            self.issue_seek(position).await;
        }

        let this = Arc::clone(self);
        let settle = self.timing.seek_settle();
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            if lock(&this.seek).is_current(generation) {
                this.session.update(|s| s.is_seeking = false);
            }
        });
    }

    /// Jump straight to a position (a drag of length one)
    pub async fn seek(self: &Arc<Self>, position: f64) {
        self.seek_to(position);
        self.end_seek().await;
    }

    async fn issue_seek(&self, position: f64) {
        let result = self.engine.seek(position).await;
        let origin = lock(&self.seek).origin.take();
        match result {
            Ok(()) => {
                debug!("Seeked to {:.1}s", position);
                self.cooldown.extend();
                self.session.update(|s| s.current_position = position);
            }
            Err(e) => {
                warn!("Seek to {:.1}s failed: {}", position, e);
                if let Some(origin) = origin {
                    self.session.update(|s| s.current_position = origin);
                }
            }
        }
    }
}
