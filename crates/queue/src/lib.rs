//! The chip work-queue manager.
//!
//! [`ChipQueueManager`] owns the labeling session: it reads and rewrites the
//! chip tracker, writes and deletes label files, keeps the one-step undo
//! history, and publishes a [`SessionEvent`](chiplabel_events::SessionEvent)
//! for every state change.

pub mod config;
pub mod error;
pub mod manager;
pub mod prefetch;
pub mod session;

pub use config::QueueConfig;
pub use error::QueueError;
pub use manager::{ChipQueueManager, DeleteOutcome, FetchOutcome, GoBackOutcome, SubmitOutcome};
pub use prefetch::TileLayer;
pub use session::{ActiveChip, LatLon, MapView, SessionSnapshot, SessionState};
