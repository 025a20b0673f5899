use chiplabel_core::error::CoreError;
use chiplabel_store::StoreError;

/// Errors surfaced by queue operations.
///
/// Expected conditions (empty queue, no active chip, nothing to delete) are
/// reported through the outcome enums, never through this type.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    /// True when the tracker data itself is bad and an operator must fix it.
    pub fn is_data_integrity(&self) -> bool {
        match self {
            QueueError::Core(CoreError::MalformedGeometry { .. }) => true,
            QueueError::Store(e) => e.is_data_integrity(),
            _ => false,
        }
    }
}
