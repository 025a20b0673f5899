use std::sync::{Arc, Mutex};

use chiplabel_events::EventBus;
use chiplabel_queue::ChipQueueManager;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// The labeling session. Queue operations run one at a time under this
    /// lock, which keeps the tracker single-writer. Only lock it through
    /// [`AppState::run_queue`]: every operation does file I/O.
    pub queue: Arc<Mutex<ChipQueueManager>>,
    /// Session events, streamed to WebSocket clients.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    pub fn new(config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let queue = ChipQueueManager::new(config.queue.clone(), Arc::clone(&event_bus));
        Self {
            config: Arc::new(config),
            queue: Arc::new(Mutex::new(queue)),
            event_bus,
        }
    }

    /// Run `op` against the queue manager on the blocking thread pool.
    ///
    /// The tracker and label stores read, write and fsync files
    /// synchronously, so the lock is taken inside the blocking task.
    pub async fn run_queue<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ChipQueueManager) -> AppResult<T> + Send + 'static,
    {
        let queue = Arc::clone(&self.queue);
        tokio::task::spawn_blocking(move || {
            let mut manager = queue
                .lock()
                .map_err(|_| AppError::InternalError("queue lock poisoned".to_string()))?;
            op(&mut manager)
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Queue task failed: {e}")))?
    }
}
