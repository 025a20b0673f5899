//! Event type names published on the [`EventBus`](crate::EventBus).

/// A chip became the session's active chip (fetched or restored).
pub const CHIP_ACTIVATED: &str = "chip.activated";

/// Labels for a chip were written and the chip marked labeled.
pub const CHIP_LABELED: &str = "chip.labeled";

/// A chip was returned to the pending pool.
pub const CHIP_RELEASED: &str = "chip.released";

/// A chip's label file was deleted.
pub const LABELS_DELETED: &str = "labels.deleted";

/// Fetch-next found no pending chip.
pub const QUEUE_EMPTY: &str = "queue.empty";

/// The map centre or zoom changed.
pub const VIEW_CHANGED: &str = "view.changed";

/// A session started (stale chips released).
pub const SESSION_STARTED: &str = "session.started";

/// The annotator exited; no chip is active.
pub const SESSION_ENDED: &str = "session.ended";
