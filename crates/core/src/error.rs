use crate::types::ChipId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored bbox string could not be parsed into a polygon. This is a
    /// data-integrity fault in the tracker, never a user input error.
    #[error("Malformed geometry for chip {chip_id}: {reason}")]
    MalformedGeometry { chip_id: ChipId, reason: String },

    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),
}
