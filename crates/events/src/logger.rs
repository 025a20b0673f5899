//! Event logging service.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! emits one structured `tracing` record per [`SessionEvent`]. It runs as a
//! long-lived background task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::SessionEvent;

/// Background service that traces every session event.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes. Returns the number of
    /// events logged.
    pub async fn run(mut receiver: broadcast::Receiver<SessionEvent>) -> usize {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(logged, "Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &SessionEvent) {
        let chip_id = event.chip_id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        let session_id = event
            .session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        tracing::info!(
            event_type = %event.event_type,
            chip_id,
            session_id = %session_id,
            payload = %event.payload,
            "Session event"
        );
    }
}
