//! In-memory session state: the active chip, the undo history and the map
//! view.

use chiplabel_core::chip_status::ChipStatus;
use chiplabel_core::crs::Crs;
use chiplabel_core::error::CoreError;
use chiplabel_core::geometry::{parse_coordinate_list, Bounds, Polygon};
use chiplabel_core::history::{History, HISTORY_DEPTH};
use chiplabel_core::tiles::MAX_ZOOM;
use chiplabel_core::types::ChipId;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Map view
// ---------------------------------------------------------------------------

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Where the map widget is looking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLon,
    pub zoom: u8,
}

impl MapView {
    pub fn new(center: LatLon, zoom: u8) -> Result<Self, CoreError> {
        if !center.lat.is_finite() || !(-90.0..=90.0).contains(&center.lat) {
            return Err(CoreError::Validation(format!(
                "latitude must be within [-90, 90], got {}",
                center.lat
            )));
        }
        if !center.lon.is_finite() || !(-180.0..=180.0).contains(&center.lon) {
            return Err(CoreError::Validation(format!(
                "longitude must be within [-180, 180], got {}",
                center.lon
            )));
        }
        if zoom > MAX_ZOOM {
            return Err(CoreError::Validation(format!(
                "zoom must be between 0 and {MAX_ZOOM}, got {zoom}"
            )));
        }
        Ok(Self { center, zoom })
    }
}

// ---------------------------------------------------------------------------
// Active chip
// ---------------------------------------------------------------------------

/// The chip currently presented for labeling, with its geometry resolved in
/// every CRS the session needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveChip {
    pub id: ChipId,
    pub status: ChipStatus,
    /// Coordinate-list string as stored in the tracker.
    pub bbox: String,
    pub storage_epsg: u32,
    pub display_epsg: u32,
    /// Chip outline in the display CRS, serialized as a GeoJSON geometry.
    #[serde(serialize_with = "serialize_geojson")]
    pub geometry: Polygon,
    /// WGS84 bounds, `x` = longitude.
    pub bounds: Bounds,
    /// WGS84 centroid.
    pub center: LatLon,
}

fn serialize_geojson<S: Serializer>(polygon: &Polygon, serializer: S) -> Result<S::Ok, S::Error> {
    polygon.to_geojson().serialize(serializer)
}

impl ActiveChip {
    /// Parse a tracker bbox and project it for display.
    ///
    /// Fails with [`CoreError::MalformedGeometry`] when the stored string is
    /// not a valid polygon, before anything is written.
    pub fn resolve(
        id: ChipId,
        bbox: &str,
        status: ChipStatus,
        storage: Crs,
        display: Crs,
    ) -> Result<Self, CoreError> {
        let footprint = parse_coordinate_list(&id, bbox)?;
        let malformed = |e: CoreError| CoreError::MalformedGeometry {
            chip_id: id.clone(),
            reason: e.to_string(),
        };
        let geometry = footprint.reproject(storage, display).map_err(malformed)?;
        let geographic = footprint.reproject(storage, Crs::Wgs84).map_err(malformed)?;
        let centroid = geographic.centroid();

        Ok(Self {
            id,
            status,
            bbox: bbox.to_string(),
            storage_epsg: storage.epsg(),
            display_epsg: display.epsg(),
            geometry,
            bounds: geographic.bounds(),
            center: LatLon {
                lat: centroid.y,
                lon: centroid.x,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State of one labeling session. Owned by the queue manager.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub current: Option<ActiveChip>,
    /// Previously submitted chips, most recent last.
    pub history: History<ActiveChip>,
    pub view: MapView,
}

impl SessionState {
    pub fn new(default_center: LatLon, zoom: u8) -> Self {
        Self {
            session_id: Uuid::now_v7(),
            current: None,
            history: History::with_capacity(HISTORY_DEPTH),
            view: MapView {
                center: default_center,
                zoom,
            },
        }
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Snapshot for API responses.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            current: self.current.clone(),
            previous: self.history.peek().map(|chip| chip.id.clone()),
            can_go_back: self.can_go_back(),
            view: self.view,
        }
    }
}

/// Serializable view of [`SessionState`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub current: Option<ActiveChip>,
    pub previous: Option<ChipId>,
    pub can_go_back: bool,
    pub view: MapView,
}
