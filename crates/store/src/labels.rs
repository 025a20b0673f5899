//! ROI label files: `<outputs_dir>/<chip_id>_labels.geojson`.

use std::fs;
use std::io;
use std::path::PathBuf;

use chiplabel_core::types::ChipId;

use crate::error::StoreError;
use crate::models::LabelCollection;
use crate::write_atomically;

/// Default label directory name inside the data directory.
pub const DEFAULT_OUTPUTS_DIR: &str = "outputs";

/// Directory of per-chip label files.
#[derive(Debug, Clone)]
pub struct LabelStore {
    dir: PathBuf,
}

impl LabelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the label file for `chip_id`.
    pub fn path_for(&self, chip_id: &ChipId) -> PathBuf {
        self.dir.join(format!("{chip_id}_labels.geojson"))
    }

    pub fn exists(&self, chip_id: &ChipId) -> bool {
        self.path_for(chip_id).is_file()
    }

    /// Write (or overwrite) the label file for the collection's chip.
    pub fn save(&self, collection: &LabelCollection) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(StoreError::io(&self.dir))?;
        let path = self.path_for(&collection.chip_id);
        let bytes = serde_json::to_vec_pretty(&collection.to_geojson())?;
        write_atomically(&path, &bytes)?;
        tracing::info!(
            chip_id = %collection.chip_id,
            labels = collection.len(),
            path = %path.display(),
            "Saved ROI labels"
        );
        Ok(path)
    }

    /// Read back a chip's label file as raw GeoJSON, if present.
    pub fn load(&self, chip_id: &ChipId) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.path_for(chip_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path)(e)),
        }
    }

    /// Delete a chip's label file. Returns `false` when there was none.
    pub fn delete(&self, chip_id: &ChipId) -> Result<bool, StoreError> {
        let path = self.path_for(chip_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(chip_id = %chip_id, path = %path.display(), "Deleted ROI labels");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path)(e)),
        }
    }
}
