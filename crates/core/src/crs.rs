//! Coordinate reference systems and point transforms.
//!
//! Supported systems:
//!
//! | EPSG            | System                                   |
//! |-----------------|------------------------------------------|
//! | 4326            | WGS84 geographic (lon, lat degrees)      |
//! | 3857            | Web Mercator (metres, spherical)         |
//! | 32601–32660     | WGS84 / UTM zones 1N–60N                 |
//! | 26901–26923     | NAD83 / UTM zones 1N–23N                 |
//! | 6330–6348       | NAD83(2011) / UTM zones 1N–19N           |
//!
//! [`Crs`] is the typed EPSG front end; the projection math is `proj4rs`.
//! NAD83 realizations carry only the GRS80 ellipsoid and no datum shift, so
//! they are treated as coincident with WGS84.

use proj4rs::Proj;

use crate::error::CoreError;
use crate::geometry::Point;

pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Storage CRS of the chip tracker and label files: NAD83(2011) / UTM 19N.
pub const DEFAULT_STORAGE_EPSG: u32 = 6348;

/// CRS the map widget draws in.
pub const DEFAULT_DISPLAY_EPSG: u32 = EPSG_WEB_MERCATOR;

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_DEFINITION: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// Geodetic datum of a UTM system; selects the EPSG code range and ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtmDatum {
    Wgs84,
    Nad83,
    Nad83_2011,
}

impl UtmDatum {
    fn proj_parameter(self) -> &'static str {
        match self {
            Self::Wgs84 => "+datum=WGS84",
            Self::Nad83 | Self::Nad83_2011 => "+ellps=GRS80",
        }
    }
}

/// A coordinate reference system the service can transform between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Wgs84,
    WebMercator,
    /// Northern-hemisphere UTM zone.
    Utm { zone: u8, datum: UtmDatum },
}

impl Crs {
    /// Resolve an EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, CoreError> {
        match code {
            EPSG_WGS84 => Ok(Self::Wgs84),
            EPSG_WEB_MERCATOR | 900_913 => Ok(Self::WebMercator),
            32_601..=32_660 => Ok(Self::Utm {
                zone: (code - 32_600) as u8,
                datum: UtmDatum::Wgs84,
            }),
            26_901..=26_923 => Ok(Self::Utm {
                zone: (code - 26_900) as u8,
                datum: UtmDatum::Nad83,
            }),
            6_330..=6_348 => Ok(Self::Utm {
                zone: (code - 6_329) as u8,
                datum: UtmDatum::Nad83_2011,
            }),
            other => Err(CoreError::UnsupportedCrs(other)),
        }
    }

    /// The EPSG code of this system.
    pub fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => EPSG_WGS84,
            Self::WebMercator => EPSG_WEB_MERCATOR,
            Self::Utm { zone, datum } => {
                let zone = u32::from(zone);
                match datum {
                    UtmDatum::Wgs84 => 32_600 + zone,
                    UtmDatum::Nad83 => 26_900 + zone,
                    UtmDatum::Nad83_2011 => 6_329 + zone,
                }
            }
        }
    }

    /// OGC URN as written in a GeoJSON `crs` member.
    pub fn urn(self) -> String {
        match self {
            Self::Wgs84 => "urn:ogc:def:crs:OGC:1.3:CRS84".to_string(),
            other => format!("urn:ogc:def:crs:EPSG::{}", other.epsg()),
        }
    }

    /// Geographic systems take and return degrees; `proj4rs` works in radians.
    pub fn is_geographic(self) -> bool {
        matches!(self, Self::Wgs84)
    }

    /// PROJ.4 definition string.
    pub fn proj_definition(self) -> String {
        match self {
            Self::Wgs84 => WGS84_DEFINITION.to_string(),
            Self::WebMercator => WEB_MERCATOR_DEFINITION.to_string(),
            Self::Utm { zone, datum } => format!(
                "+proj=utm +zone={zone} {} +units=m +no_defs",
                datum.proj_parameter()
            ),
        }
    }

    fn to_proj(self) -> Result<Proj, CoreError> {
        Proj::from_proj_string(&self.proj_definition())
            .map_err(|_| CoreError::UnsupportedCrs(self.epsg()))
    }
}

/// A prepared transform between two systems, going through WGS84.
///
/// Build once per geometry; every call to [`apply`](Reprojector::apply)
/// reuses the parsed projections.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    source: Proj,
    geographic: Proj,
    target: Proj,
}

impl Reprojector {
    pub fn new(from: Crs, to: Crs) -> Result<Self, CoreError> {
        Ok(Self {
            from,
            to,
            source: from.to_proj()?,
            geographic: Crs::Wgs84.to_proj()?,
            target: to.to_proj()?,
        })
    }

    pub fn from_crs(&self) -> Crs {
        self.from
    }

    pub fn to_crs(&self) -> Crs {
        self.to
    }

    /// Transform one point.
    pub fn apply(&self, point: Point) -> Result<Point, CoreError> {
        ensure_finite(point)?;
        if self.from == self.to {
            return Ok(point);
        }

        let lon_lat = if self.from.is_geographic() {
            point
        } else {
            let (lon, lat) = self.project(&self.source, &self.geographic, (point.x, point.y))?;
            Point::new(lon.to_degrees(), lat.to_degrees())
        };
        if !(-90.0..=90.0).contains(&lon_lat.y) || !(-180.0..=180.0).contains(&lon_lat.x) {
            return Err(CoreError::Validation(format!(
                "geographic coordinate out of range: lon {}, lat {}",
                lon_lat.x, lon_lat.y
            )));
        }
        if self.to.is_geographic() {
            return Ok(lon_lat);
        }

        let lat = match self.to {
            Crs::WebMercator => lon_lat.y.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE),
            _ => lon_lat.y,
        };
        let (x, y) = self.project(
            &self.geographic,
            &self.target,
            (lon_lat.x.to_radians(), lat.to_radians()),
        )?;
        Ok(Point::new(x, y))
    }

    fn project(&self, src: &Proj, dst: &Proj, xy: (f64, f64)) -> Result<(f64, f64), CoreError> {
        let mut point = (xy.0, xy.1, 0.0);
        proj4rs::transform::transform(src, dst, &mut point).map_err(|e| {
            CoreError::Validation(format!(
                "cannot transform ({}, {}) from EPSG:{} to EPSG:{}: {e}",
                xy.0,
                xy.1,
                self.from.epsg(),
                self.to.epsg()
            ))
        })?;
        Ok((point.0, point.1))
    }
}

fn ensure_finite(point: Point) -> Result<(), CoreError> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "non-finite coordinate ({}, {})",
            point.x, point.y
        )))
    }
}
