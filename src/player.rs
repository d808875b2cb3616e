// Player - wires store, persistence, managers and the session controller together
// and owns the background tasks so they can be torn down in one place

use crate::config::Config;
use crate::engine::{Engine, EventReceiver, ShortcutAction};
use crate::favorites::FavoritesManager;
use crate::persistence::{JsonFileStore, Persistence};
use crate::queue::QueueManager;
use crate::session::{EventListener, PlaybackController};
use crate::store::AppStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Player {
    store: AppStore,
    controller: Arc<PlaybackController>,
    queue: Arc<QueueManager>,
    favorites: FavoritesManager,
    listener: EventListener,
    smart_pause: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Player {
    /// Start against the JSON files in `config.data_dir`
    pub async fn start(config: &Config, engine: Arc<dyn Engine>, events: EventReceiver) -> Self {
        let backend = JsonFileStore::new(&config.data_dir);
        Self::start_with(Persistence::new(Arc::new(backend)), config, engine, events).await
    }

    pub async fn start_with(
        persistence: Persistence,
        config: &Config,
        engine: Arc<dyn Engine>,
        events: EventReceiver,
    ) -> Self {
        let store = AppStore::new();
        let favorites = FavoritesManager::restore(&store, persistence.clone());
        let queue = Arc::new(QueueManager::restore(&store, persistence));
        let controller = PlaybackController::new(
            &store,
            engine,
            Arc::clone(&queue),
            config.timing.clone(),
        );

        if !config.smart_pause {
            controller.set_smart_pause(false);
        }
        controller.refresh_library().await;

        let listener = controller.attach(events);
        let cancel = CancellationToken::new();
        let smart_pause = controller.spawn_smart_pause(cancel.child_token());

        info!("Player started");
        Self {
            store,
            controller,
            queue,
            favorites,
            listener,
            smart_pause,
            cancel,
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub fn queue(&self) -> &Arc<QueueManager> {
        &self.queue
    }

    pub fn favorites(&self) -> &FavoritesManager {
        &self.favorites
    }

    /// Route an externally triggered shortcut
    pub async fn dispatch(&self, action: ShortcutAction) {
        self.controller.handle_shortcut(action).await;
    }

    /// Stop the event listener and the smart-pause loop
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.listener.shutdown().await;
        if let Err(e) = self.smart_pause.await {
            debug!("Smart pause loop ended abnormally: {}", e);
        }
        info!("Player shut down");
    }
}
