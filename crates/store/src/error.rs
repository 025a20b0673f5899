use std::io;
use std::path::{Path, PathBuf};

use chiplabel_core::types::ChipId;

/// Errors raised by the tracker and label stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tracker is missing required column '{0}'")]
    MissingColumn(&'static str),

    /// The tracker violates one of its invariants (unique ids, valid
    /// statuses). Requires operator intervention.
    #[error("Tracker row {row} is corrupt: {reason}")]
    Corrupt { row: usize, reason: String },

    #[error("Chip {0} is not in the tracker")]
    UnknownChip(ChipId),
}

impl StoreError {
    /// Adapter for `map_err` that attaches the offending path.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for faults in the stored data itself rather than the environment.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            StoreError::Corrupt { .. } | StoreError::MissingColumn(_) | StoreError::Csv(_)
        )
    }
}
