//! File-backed persistence for the chip labeling service.
//!
//! - [`tracker`]: the CSV chip tracker, rewritten in full on every mutation.
//! - [`labels`]: one GeoJSON label file per chip.
//!
//! Both stores replace files atomically (write a sibling temp file, then
//! rename) so a concurrent reader sees either the old or the new snapshot.
//! There is no cross-process locking: one writer process is assumed.

pub mod error;
pub mod labels;
pub mod models;
pub mod tracker;

use std::fs;
use std::io::Write;
use std::path::Path;

pub use error::StoreError;
pub use labels::LabelStore;
pub use tracker::{ChipTracker, TrackerRecord, TrackerTable};

/// Replace `path` with `bytes` via a temp file in the same directory.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = fs::File::create(&tmp_path).map_err(StoreError::io(&tmp_path))?;
    file.write_all(bytes).map_err(StoreError::io(&tmp_path))?;
    file.sync_all().map_err(StoreError::io(&tmp_path))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(StoreError::io(path))?;
    Ok(())
}
