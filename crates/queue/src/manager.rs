//! The labeling work queue.
//!
//! [`ChipQueueManager`] drives a chip through its lifecycle:
//!
//! ```text
//!   fetch_next      pending -> active
//!   submit          active  -> labeled, then fetch_next
//!   go_back         current active -> pending, previous labeled -> active
//!   delete_labels   current chip's label file removed, chip stays active
//!   exit            current active -> pending
//! ```
//!
//! Every operation reloads the tracker, applies its status changes to the
//! in-memory table, and writes the file back once. At most one chip is
//! `active` at any time as long as a single manager owns the tracker.
//!
//! The manager is not internally synchronized; callers that share it
//! between tasks wrap it in a mutex so operations run one at a time.

use std::path::PathBuf;
use std::sync::Arc;

use chiplabel_core::chip_status::{ChipStatus, ChipTransition};
use chiplabel_core::crs::{Crs, Reprojector};
use chiplabel_core::geometry::{polygons_from_geojson, Polygon};
use chiplabel_core::types::ChipId;
use chiplabel_events::{event_types, EventBus, SessionEvent};
use chiplabel_store::models::LabelCollection;
use chiplabel_store::tracker::StatusSummary;
use chiplabel_store::{ChipTracker, LabelStore, StoreError, TrackerTable};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::prefetch::{self, TileLayer};
use crate::session::{ActiveChip, LatLon, MapView, SessionSnapshot, SessionState};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`ChipQueueManager::fetch_next`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// A pending chip was claimed and is now active.
    Activated { chip: ActiveChip },
    /// A chip was already active; nothing changed.
    Unchanged { chip: ActiveChip },
    /// No pending chips remain.
    QueueEmpty,
}

impl FetchOutcome {
    pub fn chip(&self) -> Option<&ActiveChip> {
        match self {
            Self::Activated { chip } | Self::Unchanged { chip } => Some(chip),
            Self::QueueEmpty => None,
        }
    }
}

/// Result of [`ChipQueueManager::submit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Submitted {
        chip_id: ChipId,
        label_count: usize,
        path: PathBuf,
        next: FetchOutcome,
    },
    NoActiveChip,
    /// The drawing contained no polygons.
    NoGeometry,
}

/// Result of [`ChipQueueManager::delete_labels`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { chip_id: ChipId },
    NothingToDelete { chip_id: ChipId },
    NoActiveChip,
}

/// Result of [`ChipQueueManager::go_back`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GoBackOutcome {
    Restored {
        chip: ActiveChip,
        /// The chip that was active before, now pending again.
        released: Option<ChipId>,
        labels_deleted: bool,
    },
    NoHistory,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct ChipQueueManager {
    config: QueueConfig,
    tracker: ChipTracker,
    labels: LabelStore,
    events: Arc<EventBus>,
    state: SessionState,
}

impl ChipQueueManager {
    pub fn new(config: QueueConfig, events: Arc<EventBus>) -> Self {
        let tracker = ChipTracker::new(config.tracker_path());
        let labels = LabelStore::new(config.outputs_path());
        let state = SessionState::new(config.default_center, config.chip_zoom);
        Self {
            config,
            tracker,
            labels,
            events,
            state,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&ActiveChip> {
        self.state.current.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    // -- session -----------------------------------------------------------

    /// Begin labeling: release chips left active by an earlier run, then
    /// fetch the first chip.
    pub fn start(&mut self) -> Result<FetchOutcome, QueueError> {
        let released = self.release_stale()?;
        tracing::info!(
            session_id = %self.state.session_id,
            released = released.len(),
            "Labeling session started"
        );
        self.publish(
            event_types::SESSION_STARTED,
            None,
            json!({ "released": released.len() }),
        );
        self.fetch_next()
    }

    /// Return every `active` row other than the session's own chip to
    /// `pending`.
    pub fn release_stale(&mut self) -> Result<Vec<ChipId>, QueueError> {
        let mut table = self.tracker.load()?;
        let own = self.state.current.as_ref().map(|chip| chip.id.clone());
        let stale: Vec<ChipId> = table
            .active_ids()
            .into_iter()
            .filter(|id| Some(id) != own.as_ref())
            .collect();
        if stale.is_empty() {
            return Ok(stale);
        }

        for id in &stale {
            table.set_status(id, ChipStatus::Pending)?;
        }
        self.tracker.save(&table)?;
        tracing::warn!(count = stale.len(), "Released chips left active by a previous session");
        for id in &stale {
            self.publish(event_types::CHIP_RELEASED, Some(id), json!({ "reason": "stale" }));
        }
        Ok(stale)
    }

    /// Release the active chip and end the session.
    ///
    /// Returns the id of the released chip, if one was active. The next
    /// [`start`](Self::start) begins a fresh session.
    pub fn exit(&mut self) -> Result<Option<ChipId>, QueueError> {
        let released = match &self.state.current {
            Some(chip) => {
                let mut table = self.tracker.load()?;
                let is_active = table
                    .find(&chip.id)
                    .is_some_and(|record| record.status == ChipStatus::Active);
                if is_active && table.set_status(&chip.id, ChipStatus::Pending)? {
                    self.tracker.save(&table)?;
                }
                Some(chip.id.clone())
            }
            None => None,
        };

        if let Some(id) = &released {
            self.publish(event_types::CHIP_RELEASED, Some(id), json!({ "reason": "exit" }));
        }
        self.publish(event_types::SESSION_ENDED, None, json!({}));
        tracing::info!(
            session_id = %self.state.session_id,
            released = ?released.as_ref().map(ChipId::as_str),
            "Labeling session ended"
        );

        self.state = SessionState::new(self.config.default_center, self.config.chip_zoom);
        Ok(released)
    }

    // -- queue operations --------------------------------------------------

    /// Activate the first pending chip in tracker order.
    ///
    /// A no-op while a chip is already active. A malformed bbox fails the
    /// call before the tracker is written.
    pub fn fetch_next(&mut self) -> Result<FetchOutcome, QueueError> {
        if let Some(chip) = &self.state.current {
            tracing::debug!(chip_id = %chip.id, "Chip already active");
            return Ok(FetchOutcome::Unchanged { chip: chip.clone() });
        }

        let mut table = self.tracker.load()?;
        let Some(record) = table.first_pending() else {
            tracing::info!("No pending chips left");
            self.publish(event_types::QUEUE_EMPTY, None, json!({}));
            return Ok(FetchOutcome::QueueEmpty);
        };

        let status = ChipTransition::Activate.apply(record.status)?;
        let chip = self.resolve(record.id.clone(), &record.bbox, status)?;
        table.set_status(&chip.id, status)?;
        self.tracker.save(&table)?;

        tracing::info!(chip_id = %chip.id, "Chip activated");
        self.activate(chip.clone());
        Ok(FetchOutcome::Activated { chip })
    }

    /// Save `polygons` (drawn in `drawn_in`) as the active chip's labels,
    /// mark it labeled, and fetch the next chip.
    pub fn submit(
        &mut self,
        polygons: Vec<Polygon>,
        drawn_in: Crs,
    ) -> Result<SubmitOutcome, QueueError> {
        let Some(chip) = self.state.current.clone() else {
            tracing::warn!("No active chip to save ROIs for");
            return Ok(SubmitOutcome::NoActiveChip);
        };
        if polygons.is_empty() {
            tracing::warn!(chip_id = %chip.id, "No ROIs drawn, nothing saved");
            return Ok(SubmitOutcome::NoGeometry);
        }

        let storage = self.config.storage_crs;
        let reprojector = Reprojector::new(drawn_in, storage)?;
        let stored = polygons
            .iter()
            .map(|polygon| polygon.reproject_with(&reprojector))
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = self.tracker.load()?;
        let labeled = ChipTransition::Label.apply(status_of(&table, &chip.id)?)?;

        let collection = LabelCollection::new(chip.id.clone(), storage, stored, Utc::now());
        let path = self.labels.save(&collection)?;
        table.set_status(&chip.id, labeled)?;
        self.tracker.save(&table)?;

        let label_count = collection.len();
        tracing::info!(chip_id = %chip.id, label_count, path = %path.display(), "Chip labeled");
        self.publish(
            event_types::CHIP_LABELED,
            Some(&chip.id),
            json!({ "label_count": label_count, "path": path.display().to_string() }),
        );

        let chip_id = chip.id.clone();
        self.state.current = None;
        self.state.history.push(ActiveChip {
            status: labeled,
            ..chip
        });

        let next = self.fetch_next()?;
        Ok(SubmitOutcome::Submitted {
            chip_id,
            label_count,
            path,
            next,
        })
    }

    /// [`submit`](Self::submit) the polygons of a GeoJSON drawing. Features
    /// of other geometry types are ignored.
    pub fn submit_geojson(
        &mut self,
        drawing: &serde_json::Value,
        drawn_in: Crs,
    ) -> Result<SubmitOutcome, QueueError> {
        let polygons = polygons_from_geojson(drawing)?;
        self.submit(polygons, drawn_in)
    }

    /// Delete the active chip's label file. The chip stays (or becomes)
    /// active.
    pub fn delete_labels(&mut self) -> Result<DeleteOutcome, QueueError> {
        let Some(chip_id) = self.state.current.as_ref().map(|chip| chip.id.clone()) else {
            tracing::warn!("No active chip to delete ROIs for");
            return Ok(DeleteOutcome::NoActiveChip);
        };

        if !self.labels.delete(&chip_id)? {
            tracing::info!(chip_id = %chip_id, "No saved labels to delete");
            return Ok(DeleteOutcome::NothingToDelete { chip_id });
        }

        let mut table = self.tracker.load()?;
        if table.set_status(&chip_id, ChipStatus::Active)? {
            self.tracker.save(&table)?;
        }
        if let Some(chip) = self.state.current.as_mut() {
            chip.status = ChipStatus::Active;
        }

        tracing::info!(chip_id = %chip_id, "Labels deleted");
        self.publish(event_types::LABELS_DELETED, Some(&chip_id), json!({}));
        Ok(DeleteOutcome::Deleted { chip_id })
    }

    /// Step back to the previously submitted chip.
    ///
    /// The current chip returns to `pending` and the previous one becomes
    /// `active` in a single tracker write; the previous chip's labels are
    /// deleted afterwards. A failed label delete leaves a stale file that
    /// the next submit overwrites.
    pub fn go_back(&mut self) -> Result<GoBackOutcome, QueueError> {
        let Some(previous_id) = self.state.history.peek().map(|chip| chip.id.clone()) else {
            tracing::info!("No previous chip to go back to");
            return Ok(GoBackOutcome::NoHistory);
        };

        let mut table = self.tracker.load()?;
        let record = table
            .find(&previous_id)
            .ok_or_else(|| StoreError::UnknownChip(previous_id.clone()))?;
        let reopened = ChipTransition::Reopen.apply(record.status)?;
        let restored = self.resolve(previous_id.clone(), &record.bbox, reopened)?;

        let released = match &self.state.current {
            Some(current) => {
                let pending = ChipTransition::Release.apply(status_of(&table, &current.id)?)?;
                table.set_status(&current.id, pending)?;
                Some(current.id.clone())
            }
            None => None,
        };
        table.set_status(&previous_id, reopened)?;
        self.tracker.save(&table)?;

        self.state.history.pop();
        self.state.current = None;
        if let Some(id) = &released {
            self.publish(event_types::CHIP_RELEASED, Some(id), json!({ "reason": "go_back" }));
        }

        let labels_deleted = match self.labels.delete(&previous_id) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(chip_id = %previous_id, error = %e, "Failed to delete labels of restored chip");
                false
            }
        };
        if labels_deleted {
            self.publish(event_types::LABELS_DELETED, Some(&previous_id), json!({}));
        }

        tracing::info!(
            chip_id = %previous_id,
            released = ?released.as_ref().map(ChipId::as_str),
            "Went back to previous chip"
        );
        self.activate(restored.clone());
        Ok(GoBackOutcome::Restored {
            chip: restored,
            released,
            labels_deleted,
        })
    }

    pub fn summary(&self) -> Result<StatusSummary, QueueError> {
        Ok(self.tracker.load()?.summary())
    }

    /// Saved labels of the active chip, if any.
    pub fn current_labels(&self) -> Result<Option<serde_json::Value>, QueueError> {
        match &self.state.current {
            Some(chip) => Ok(self.labels.load(&chip.id)?),
            None => Ok(None),
        }
    }

    // -- map ---------------------------------------------------------------

    pub fn view(&self) -> MapView {
        self.state.view
    }

    pub fn set_view(&mut self, center: LatLon, zoom: u8) -> Result<MapView, QueueError> {
        let view = MapView::new(center, zoom)?;
        self.state.view = view;
        tracing::debug!(lat = center.lat, lon = center.lon, zoom, "Map view changed");
        self.publish(event_types::VIEW_CHANGED, None, json!(view));
        Ok(view)
    }

    pub fn tile_layers(&self) -> Vec<TileLayer> {
        prefetch::tile_layers(&self.config.tiles)
    }

    /// Tile URLs covering the active chip for every imagery year. Empty when
    /// no chip is active.
    pub fn prefetch_urls(&self) -> Result<Vec<String>, QueueError> {
        match &self.state.current {
            Some(chip) => Ok(prefetch::prefetch_urls(&self.config.tiles, &chip.bounds)?),
            None => Ok(Vec::new()),
        }
    }

    // -- helpers -----------------------------------------------------------

    fn resolve(&self, id: ChipId, bbox: &str, status: ChipStatus) -> Result<ActiveChip, QueueError> {
        Ok(ActiveChip::resolve(
            id,
            bbox,
            status,
            self.config.storage_crs,
            self.config.display_crs,
        )?)
    }

    /// Make `chip` the current chip and centre the map on it.
    fn activate(&mut self, chip: ActiveChip) {
        self.state.view = MapView {
            center: chip.center,
            zoom: self.config.chip_zoom,
        };
        self.publish(
            event_types::CHIP_ACTIVATED,
            Some(&chip.id),
            json!({ "center": chip.center, "zoom": self.config.chip_zoom }),
        );
        self.state.current = Some(chip);
    }

    fn publish(&self, event_type: &str, chip_id: Option<&ChipId>, payload: serde_json::Value) {
        let mut event = SessionEvent::new(event_type)
            .with_session(self.state.session_id)
            .with_payload(payload);
        if let Some(id) = chip_id {
            event = event.with_chip(id.clone());
        }
        self.events.publish(event);
    }
}

fn status_of(table: &TrackerTable, id: &ChipId) -> Result<ChipStatus, StoreError> {
    table
        .find(id)
        .map(|record| record.status)
        .ok_or_else(|| StoreError::UnknownChip(id.clone()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
