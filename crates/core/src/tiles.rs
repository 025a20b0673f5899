//! Slippy-map tile indexing.
//!
//! The world is split into `2^zoom × 2^zoom` tiles per zoom level on the
//! spherical Mercator projection, addressed by `(zoom, x, y)` with `y`
//! growing southwards.

use std::f64::consts::PI;

use serde::Serialize;

use crate::crs::MAX_MERCATOR_LATITUDE;
use crate::error::CoreError;
use crate::geometry::Bounds;

/// Highest zoom level accepted; keeps `2^zoom` comfortably inside `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Zoom level at which imagery tiles are prefetched.
pub const DEFAULT_PREFETCH_ZOOM: u8 = 21;

/// A tile address in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

fn validate_zoom(zoom: u8) -> Result<(), CoreError> {
    if zoom > MAX_ZOOM {
        return Err(CoreError::Validation(format!(
            "zoom must be between 0 and {MAX_ZOOM}, got {zoom}"
        )));
    }
    Ok(())
}

/// Tile containing the point `(lat, lon)` at `zoom`.
///
/// Latitude is clamped to the Mercator limit so the poles never reach the
/// `ln(tan + sec)` singularity; indices are clamped to the grid so that
/// `lon = 180` lands in the last column.
pub fn point_to_tile(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoreError> {
    validate_zoom(zoom)?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(CoreError::Validation(format!(
            "non-finite coordinate: lat {lat}, lon {lon}"
        )));
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(CoreError::Validation(format!(
            "coordinate out of range: lat {lat}, lon {lon}"
        )));
    }

    let n = f64::from(1u32 << zoom);
    let max_index = (1u32 << zoom) - 1;
    let lat_rad = lat
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    Ok(TileCoord::new(
        zoom,
        (x.max(0.0) as u32).min(max_index),
        (y.max(0.0) as u32).min(max_index),
    ))
}

/// Every tile covering `bbox` (`min_x`/`max_x` = longitude, `min_y`/`max_y`
/// = latitude) at `zoom`.
///
/// Ordered with `x` in the outer loop and `y` in the inner loop, both
/// ascending.
pub fn bbox_to_tiles(bbox: &Bounds, zoom: u8) -> Result<Vec<TileCoord>, CoreError> {
    if bbox.min_x > bbox.max_x || bbox.min_y > bbox.max_y {
        return Err(CoreError::Validation(format!(
            "inverted bounding box ({}, {}, {}, {})",
            bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
        )));
    }
    let north_west = point_to_tile(bbox.max_y, bbox.min_x, zoom)?;
    let south_east = point_to_tile(bbox.min_y, bbox.max_x, zoom)?;

    let tiles = (north_west.x..=south_east.x)
        .flat_map(|x| (north_west.y..=south_east.y).map(move |y| TileCoord::new(zoom, x, y)))
        .collect();
    Ok(tiles)
}

/// WGS84 bounds of a tile (inverse of [`point_to_tile`]).
pub fn tile_bounds(tile: TileCoord) -> Bounds {
    let n = 2f64.powi(i32::from(tile.z));
    let lon = |x: f64| x / n * 360.0 - 180.0;
    let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();

    let x = f64::from(tile.x);
    let y = f64::from(tile.y);
    Bounds::new(lon(x), lat(y + 1.0), lon(x + 1.0), lat(y))
}

/// Expand a tile URL template.
///
/// Recognized placeholders: `{year}`, `{z}`, `{x}`, `{y}`.
pub fn tile_url(template: &str, year: u16, tile: TileCoord) -> String {
    template
        .replace("{year}", &year.to_string())
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}
