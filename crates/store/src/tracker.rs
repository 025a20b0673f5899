//! The CSV chip tracker.
//!
//! The tracker is the single source of truth for queue order: rows are
//! worked in file order, first `pending` row wins. Columns `id`, `bbox` and
//! `status` are required; any other columns are carried through untouched.
//! Only the `status` field is ever rewritten, so `id` and `bbox` text
//! round-trips byte-for-byte.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chiplabel_core::chip_status::ChipStatus;
use chiplabel_core::types::ChipId;
use serde::Serialize;

use crate::error::StoreError;
use crate::write_atomically;

pub const COLUMN_ID: &str = "id";
pub const COLUMN_BBOX: &str = "bbox";
pub const COLUMN_STATUS: &str = "status";

/// Default tracker file name inside the data directory.
pub const DEFAULT_TRACKER_FILE: &str = "chip_tracker.csv";

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// One tracker row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerRecord {
    pub id: ChipId,
    /// Coordinate-list string exactly as stored.
    pub bbox: String,
    pub status: ChipStatus,
    /// All raw fields in header order; the status field is overwritten on
    /// write.
    fields: Vec<String>,
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    id: usize,
    bbox: usize,
    status: usize,
}

/// Counts of chips per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub pending: usize,
    pub active: usize,
    pub labeled: usize,
    pub total: usize,
}

/// In-memory snapshot of the tracker file.
#[derive(Debug, Clone)]
pub struct TrackerTable {
    headers: Vec<String>,
    columns: Columns,
    records: Vec<TrackerRecord>,
}

impl TrackerTable {
    /// Parse a tracker from CSV, validating the table invariants.
    ///
    /// Row numbers in errors are 1-based file lines (the header is line 1).
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, StoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(StoreError::MissingColumn(name))
        };
        let columns = Columns {
            id: find(COLUMN_ID)?,
            bbox: find(COLUMN_BBOX)?,
            status: find(COLUMN_STATUS)?,
        };

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for (index, result) in csv_reader.records().enumerate() {
            let row = index + 2;
            let record = result?;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();

            let id = fields[columns.id].trim();
            if id.is_empty() {
                return Err(StoreError::Corrupt {
                    row,
                    reason: "empty id".to_string(),
                });
            }
            let id = ChipId::new(id);
            if !seen.insert(id.clone()) {
                return Err(StoreError::Corrupt {
                    row,
                    reason: format!("duplicate id '{id}'"),
                });
            }
            let status = fields[columns.status]
                .trim()
                .parse::<ChipStatus>()
                .map_err(|e| StoreError::Corrupt {
                    row,
                    reason: e.to_string(),
                })?;

            records.push(TrackerRecord {
                id,
                bbox: fields[columns.bbox].clone(),
                status,
                fields,
            });
        }

        Ok(Self {
            headers,
            columns,
            records,
        })
    }

    /// Serialize the full table as CSV.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), StoreError> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for record in &self.records {
            let fields = record.fields.iter().enumerate().map(|(i, field)| {
                if i == self.columns.status {
                    record.status.as_str()
                } else {
                    field.as_str()
                }
            });
            csv_writer.write_record(fields)?;
        }
        csv_writer
            .flush()
            .map_err(|e| StoreError::Csv(csv::Error::from(e)))?;
        Ok(())
    }

    pub fn records(&self) -> &[TrackerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &ChipId) -> Option<&TrackerRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// The first `pending` row in file order.
    pub fn first_pending(&self) -> Option<&TrackerRecord> {
        self.records
            .iter()
            .find(|r| r.status == ChipStatus::Pending)
    }

    /// Ids of every row currently marked `active`.
    pub fn active_ids(&self) -> Vec<ChipId> {
        self.records
            .iter()
            .filter(|r| r.status == ChipStatus::Active)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Set a chip's status. Returns whether the status changed.
    pub fn set_status(&mut self, id: &ChipId, status: ChipStatus) -> Result<bool, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::UnknownChip(id.clone()))?;
        let changed = record.status != status;
        record.status = status;
        Ok(changed)
    }

    pub fn summary(&self) -> StatusSummary {
        self.records
            .iter()
            .fold(StatusSummary::default(), |mut s, r| {
                match r.status {
                    ChipStatus::Pending => s.pending += 1,
                    ChipStatus::Active => s.active += 1,
                    ChipStatus::Labeled => s.labeled += 1,
                }
                s.total += 1;
                s
            })
    }
}

// ---------------------------------------------------------------------------
// File handle
// ---------------------------------------------------------------------------

/// Handle on the tracker file.
///
/// Every call to [`load`](ChipTracker::load) reads the whole file and every
/// [`save`](ChipTracker::save) rewrites it.
#[derive(Debug, Clone)]
pub struct ChipTracker {
    path: PathBuf,
    writes: u64,
}

impl ChipTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful saves through this handle.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn load(&self) -> Result<TrackerTable, StoreError> {
        let file = fs::File::open(&self.path).map_err(StoreError::io(&self.path))?;
        TrackerTable::from_reader(io::BufReader::new(file))
    }

    pub fn save(&mut self, table: &TrackerTable) -> Result<(), StoreError> {
        let mut buffer = Vec::new();
        table.write_to(&mut buffer)?;
        write_atomically(&self.path, &buffer)?;
        self.writes += 1;
        tracing::debug!(
            path = %self.path.display(),
            rows = table.len(),
            writes = self.writes,
            "Tracker rewritten"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
