use std::path::PathBuf;
use std::str::FromStr;

use chiplabel_core::crs::Crs;
use chiplabel_core::error::CoreError;
use chiplabel_core::tiles::MAX_ZOOM;
use chiplabel_queue::config::{TileConfig, DEFAULT_CHIP_ZOOM};
use chiplabel_queue::{LatLon, QueueConfig};

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{var}: {source}")]
    Crs {
        var: &'static str,
        #[source]
        source: CoreError,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Tracker, label output, CRS and imagery settings.
    pub queue: QueueConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                 |
    /// |------------------------|-----------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                               |
    /// | `PORT`                 | `3000`                                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                 |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                    |
    /// | `DATA_DIR`             | `.`                                     |
    /// | `TRACKER_FILE`         | `chip_tracker.csv`                      |
    /// | `OUTPUTS_DIR`          | `outputs`                               |
    /// | `STORAGE_EPSG`         | `6348`                                  |
    /// | `DISPLAY_EPSG`         | `3857`                                  |
    /// | `TILE_URL_TEMPLATE`    | `http://localhost:8600/static/public/{year}/tiles/{z}/{x}/{y}.png` |
    /// | `TILE_YEARS`           | `2019,2021,2023`                        |
    /// | `PREFETCH_ZOOM`        | `21`                                    |
    /// | `CHIP_ZOOM`            | `20`                                    |
    /// | `DEFAULT_CENTER`       | `42.251504,-71.823585` (lat,lon)        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PORT", "a valid port number", 3000u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs =
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "a whole number of seconds", 30u64)?;

        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| ".".into()));
        let mut queue = QueueConfig::new(data_dir);
        if let Some(file) = lookup("TRACKER_FILE") {
            queue.tracker_file = file;
        }
        if let Some(dir) = lookup("OUTPUTS_DIR") {
            queue.outputs_dir = dir;
        }

        queue.storage_crs = parse_crs(&lookup, "STORAGE_EPSG", queue.storage_crs)?;
        queue.display_crs = parse_crs(&lookup, "DISPLAY_EPSG", queue.display_crs)?;
        queue.chip_zoom = parse_zoom(&lookup, "CHIP_ZOOM", DEFAULT_CHIP_ZOOM)?;

        let defaults = TileConfig::default();
        queue.tiles = TileConfig {
            url_template: lookup("TILE_URL_TEMPLATE").unwrap_or(defaults.url_template),
            years: parse_years(&lookup, defaults.years)?,
            prefetch_zoom: parse_zoom(&lookup, "PREFETCH_ZOOM", defaults.prefetch_zoom)?,
            ..defaults
        };

        if let Some(value) = lookup("DEFAULT_CENTER") {
            queue.default_center = parse_center(&value).ok_or(ConfigError::Invalid {
                var: "DEFAULT_CENTER",
                expected: "'lat,lon' in degrees",
                value,
            })?;
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            queue,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
        None => Ok(default),
    }
}

fn parse_zoom(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u8,
) -> Result<u8, ConfigError> {
    let zoom = parse_var(lookup, var, "a zoom level between 0 and 30", default)?;
    if zoom > MAX_ZOOM {
        return Err(ConfigError::Invalid {
            var,
            expected: "a zoom level between 0 and 30",
            value: zoom.to_string(),
        });
    }
    Ok(zoom)
}

fn parse_crs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Crs,
) -> Result<Crs, ConfigError> {
    let code = parse_var(lookup, var, "an EPSG code", default.epsg())?;
    Crs::from_epsg(code).map_err(|source| ConfigError::Crs { var, source })
}

fn parse_years(
    lookup: &impl Fn(&str) -> Option<String>,
    default: Vec<u16>,
) -> Result<Vec<u16>, ConfigError> {
    let Some(value) = lookup("TILE_YEARS") else {
        return Ok(default);
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|year| year.parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::Invalid {
            var: "TILE_YEARS",
            expected: "a comma-separated list of years",
            value,
        })
}

fn parse_center(value: &str) -> Option<LatLon> {
    let (lat, lon) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
    valid.then_some(LatLon { lat, lon })
}
