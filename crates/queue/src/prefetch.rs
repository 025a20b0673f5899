//! Imagery tile layers and prefetch URL generation.

use chiplabel_core::error::CoreError;
use chiplabel_core::geometry::Bounds;
use chiplabel_core::tiles::{bbox_to_tiles, tile_url, TileCoord};
use serde::Serialize;

use crate::config::TileConfig;

/// One imagery layer offered to the map widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub name: String,
    pub year: u16,
    /// Template with `{year}` filled in; `{z}/{x}/{y}` are left for the map
    /// client.
    pub url_template: String,
    pub attribution: String,
    pub min_zoom: u8,
    pub min_native_zoom: u8,
    pub max_native_zoom: u8,
}

/// One layer per configured year, in configuration order.
pub fn tile_layers(config: &TileConfig) -> Vec<TileLayer> {
    config
        .years
        .iter()
        .map(|&year| TileLayer {
            name: format!("{year} Orthos"),
            year,
            url_template: config.url_template.replace("{year}", &year.to_string()),
            attribution: config.attribution.clone(),
            min_zoom: config.min_zoom,
            min_native_zoom: config.native_zoom,
            max_native_zoom: config.native_zoom,
        })
        .collect()
}

/// Fully expanded tile URLs covering `bounds` (WGS84) for every year.
///
/// Grouped by year; within a year tiles follow [`bbox_to_tiles`] order.
pub fn prefetch_urls(config: &TileConfig, bounds: &Bounds) -> Result<Vec<String>, CoreError> {
    let tiles: Vec<TileCoord> = bbox_to_tiles(bounds, config.prefetch_zoom)?;
    let urls = config
        .years
        .iter()
        .flat_map(|&year| {
            tiles
                .iter()
                .map(move |&tile| tile_url(&config.url_template, year, tile))
        })
        .collect();
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip_bounds() -> Bounds {
        Bounds::new(-71.8240, 42.2513, -71.8232, 42.2518)
    }

    #[test]
    fn one_layer_per_year() {
        let layers = tile_layers(&TileConfig::default());
        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["2019 Orthos", "2021 Orthos", "2023 Orthos"]);
        assert_eq!(
            layers[1].url_template,
            "http://localhost:8600/static/public/2021/tiles/{z}/{x}/{y}.png"
        );
        assert_eq!(layers[0].attribution, "MassGIS");
        assert_eq!(layers[0].min_zoom, 19);
        assert_eq!(layers[0].max_native_zoom, 21);
    }

    #[test]
    fn prefetch_covers_every_year() {
        let config = TileConfig::default();
        let tiles = bbox_to_tiles(&chip_bounds(), config.prefetch_zoom).unwrap();
        let urls = prefetch_urls(&config, &chip_bounds()).unwrap();

        assert_eq!(urls.len(), tiles.len() * config.years.len());
        assert!(urls[0].contains("/2019/tiles/21/"));
        assert!(urls.last().unwrap().contains("/2023/tiles/21/"));
        assert!(urls.iter().all(|u| !u.contains('{')), "placeholders left in {urls:?}");
    }

    #[test]
    fn prefetch_with_no_years_is_empty() {
        let config = TileConfig {
            years: Vec::new(),
            ..TileConfig::default()
        };
        assert!(prefetch_urls(&config, &chip_bounds()).unwrap().is_empty());
    }
}
