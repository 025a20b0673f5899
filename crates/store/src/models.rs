//! Persisted label records.

use chiplabel_core::crs::Crs;
use chiplabel_core::geometry::Polygon;
use chiplabel_core::types::{ChipId, Timestamp};
use serde_json::{json, Value};

/// One annotator-drawn region of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiLabel {
    pub chip_id: ChipId,
    pub geometry: Polygon,
    pub timestamp: Timestamp,
}

/// Every label drawn for one chip, in one CRS.
///
/// Saved as a single GeoJSON FeatureCollection; saving again replaces the
/// previous submission wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCollection {
    pub chip_id: ChipId,
    pub crs: Crs,
    pub labels: Vec<RoiLabel>,
}

impl LabelCollection {
    /// Tag every polygon with the chip id and a shared timestamp.
    pub fn new(chip_id: ChipId, crs: Crs, polygons: Vec<Polygon>, timestamp: Timestamp) -> Self {
        let labels = polygons
            .into_iter()
            .map(|geometry| RoiLabel {
                chip_id: chip_id.clone(),
                geometry,
                timestamp,
            })
            .collect();
        Self {
            chip_id,
            crs,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// GeoJSON FeatureCollection with a named `crs` member.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .labels
            .iter()
            .map(|label| {
                json!({
                    "type": "Feature",
                    "properties": {
                        "chip_id": label.chip_id.to_json(),
                        "timestamp": label.timestamp.to_rfc3339(),
                    },
                    "geometry": label.geometry.to_geojson(),
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "crs": {
                "type": "name",
                "properties": { "name": self.crs.urn() },
            },
            "features": features,
        })
    }
}
