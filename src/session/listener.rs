// Engine event pump - feeds pushed events into the controller one at a time

use super::PlaybackController;
use crate::engine::EventReceiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for an attached event stream. Events are handled in arrival order,
/// each at most once; `shutdown` stops the pump and drops the receiver.
pub struct EventListener {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventListener {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            debug!("Event listener ended abnormally: {}", e);
        }
    }
}

impl PlaybackController {
    pub fn attach(self: &Arc<Self>, mut events: EventReceiver) -> EventListener {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => this.handle_event(event).await,
                        None => break,
                    },
                }
            }
            debug!("Engine event listener stopped");
        });

        EventListener { cancel, task }
    }
}
