use std::path::PathBuf;

use chiplabel_core::crs::{Crs, DEFAULT_DISPLAY_EPSG, DEFAULT_STORAGE_EPSG};
use chiplabel_core::tiles::DEFAULT_PREFETCH_ZOOM;
use chiplabel_store::labels::DEFAULT_OUTPUTS_DIR;
use chiplabel_store::tracker::DEFAULT_TRACKER_FILE;

use crate::session::LatLon;

/// Zoom the map jumps to when a chip is displayed.
pub const DEFAULT_CHIP_ZOOM: u8 = 20;

/// Map centre before the first chip is shown (Worcester, MA).
pub const DEFAULT_CENTER: LatLon = LatLon {
    lat: 42.251504,
    lon: -71.823585,
};

/// Imagery years with a tile layer each.
pub const DEFAULT_TILE_YEARS: &[u16] = &[2019, 2021, 2023];

pub const DEFAULT_TILE_URL_TEMPLATE: &str =
    "http://localhost:8600/static/public/{year}/tiles/{z}/{x}/{y}.png";

/// Tile imagery settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TileConfig {
    /// URL template with `{year}`, `{z}`, `{x}`, `{y}` placeholders.
    pub url_template: String,
    pub years: Vec<u16>,
    /// Zoom at which chip tiles are prefetched.
    pub prefetch_zoom: u8,
    /// Lowest zoom at which the imagery layers are shown.
    pub min_zoom: u8,
    /// The only zoom the tile server renders natively.
    pub native_zoom: u8,
    pub attribution: String,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL_TEMPLATE.to_string(),
            years: DEFAULT_TILE_YEARS.to_vec(),
            prefetch_zoom: DEFAULT_PREFETCH_ZOOM,
            min_zoom: 19,
            native_zoom: 21,
            attribution: "MassGIS".to_string(),
        }
    }
}

/// Queue manager configuration.
///
/// The tracker lives at `<data_dir>/<tracker_file>` and label files under
/// `<data_dir>/<outputs_dir>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub data_dir: PathBuf,
    pub tracker_file: String,
    pub outputs_dir: String,
    /// CRS of tracker bboxes and saved labels.
    pub storage_crs: Crs,
    /// CRS the map widget displays and draws in.
    pub display_crs: Crs,
    pub chip_zoom: u8,
    pub default_center: LatLon,
    pub tiles: TileConfig,
}

impl QueueConfig {
    /// Defaults rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tracker_file: DEFAULT_TRACKER_FILE.to_string(),
            outputs_dir: DEFAULT_OUTPUTS_DIR.to_string(),
            storage_crs: Crs::Utm {
                zone: 19,
                datum: chiplabel_core::crs::UtmDatum::Nad83_2011,
            },
            display_crs: Crs::WebMercator,
            chip_zoom: DEFAULT_CHIP_ZOOM,
            default_center: DEFAULT_CENTER,
            tiles: TileConfig::default(),
        }
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.data_dir.join(&self.tracker_file)
    }

    pub fn outputs_path(&self) -> PathBuf {
        self.data_dir.join(&self.outputs_dir)
    }
}
