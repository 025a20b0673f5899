//! Polygon geometry and the tracker's coordinate-list encoding.
//!
//! The tracker stores each chip boundary as a bracketed list of
//! coordinate pairs, e.g. `[(278412.5, 4681120.0), (278612.5, 4681120.0), ...]`.
//! [`parse_coordinate_list`] decodes that format strictly: anything that is
//! not a list of numeric pairs is rejected with
//! [`CoreError::MalformedGeometry`].

use std::collections::HashSet;

use geo::{Area, BoundingRect, Centroid, Coord, Intersects, LineString, Rect};
use serde::{Deserialize, Serialize};

use crate::crs::{Crs, Reprojector};
use crate::error::CoreError;
use crate::types::ChipId;

/// Minimum number of distinct vertices in a polygon ring.
pub const MIN_POLYGON_VERTICES: usize = 3;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// A 2D coordinate. For geographic CRSs `x` is longitude and `y` latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Bit pattern key for exact-equality hashing; `-0.0` folds onto `0.0`.
    fn key(self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

/// Axis-aligned bounding box `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// True when the boxes overlap or touch.
    pub fn intersects(&self, other: &Bounds) -> bool {
        Rect::from(*self).intersects(&Rect::from(*other))
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl From<Bounds> for Rect<f64> {
    fn from(b: Bounds) -> Self {
        Rect::new(
            Coord {
                x: b.min_x,
                y: b.min_y,
            },
            Coord {
                x: b.max_x,
                y: b.max_y,
            },
        )
    }
}

/// A simple polygon described by its exterior ring.
///
/// Backed by a [`geo::Polygon`], which keeps the ring closed. A trailing
/// input vertex equal to the first one is dropped before closing.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    inner: geo::Polygon<f64>,
}

impl Polygon {
    /// Build a polygon, validating vertex count and finiteness.
    pub fn new(mut exterior: Vec<Point>) -> Result<Self, String> {
        if exterior.len() > 1 && exterior.first() == exterior.last() {
            exterior.pop();
        }
        if let Some(p) = exterior.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(format!("non-finite coordinate ({}, {})", p.x, p.y));
        }
        let distinct: HashSet<(u64, u64)> = exterior.iter().map(|p| p.key()).collect();
        if distinct.len() < MIN_POLYGON_VERTICES {
            return Err(format!(
                "polygon needs at least {MIN_POLYGON_VERTICES} distinct vertices, got {}",
                distinct.len()
            ));
        }
        let ring: LineString<f64> = exterior.into_iter().map(Coord::from).collect();
        Ok(Self {
            inner: geo::Polygon::new(ring, Vec::new()),
        })
    }

    /// Exterior ring without the closing vertex.
    pub fn exterior(&self) -> Vec<Point> {
        let coords = &self.inner.exterior().0;
        coords[..coords.len().saturating_sub(1)]
            .iter()
            .map(|c| Point::from(*c))
            .collect()
    }

    /// Exterior ring with the first vertex repeated at the end.
    pub fn closed_ring(&self) -> Vec<Point> {
        self.inner.exterior().coords().map(|c| Point::from(*c)).collect()
    }

    pub fn bounds(&self) -> Bounds {
        // `new` guarantees at least three vertices.
        self.inner
            .bounding_rect()
            .map(Bounds::from)
            .unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Signed area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        self.inner.signed_area()
    }

    /// Area-weighted centroid. Zero-area rings fall back to the centroid of
    /// the ring's line work.
    pub fn centroid(&self) -> Point {
        match self.inner.centroid() {
            Some(c) => Point::new(c.x(), c.y()),
            None => {
                let b = self.bounds();
                Point::new((b.min_x + b.max_x) / 2.0, (b.min_y + b.max_y) / 2.0)
            }
        }
    }

    /// Reproject every vertex from `from` to `to`.
    pub fn reproject(&self, from: Crs, to: Crs) -> Result<Polygon, CoreError> {
        if from == to {
            return Ok(self.clone());
        }
        self.reproject_with(&Reprojector::new(from, to)?)
    }

    /// Reproject with a prepared transform.
    pub fn reproject_with(&self, reprojector: &Reprojector) -> Result<Polygon, CoreError> {
        let exterior = self
            .exterior()
            .into_iter()
            .map(|p| reprojector.apply(p))
            .collect::<Result<Vec<_>, _>>()?;
        Polygon::new(exterior).map_err(|reason| {
            CoreError::Validation(format!(
                "polygon degenerated reprojecting EPSG:{} to EPSG:{}: {reason}",
                reprojector.from_crs().epsg(),
                reprojector.to_crs().epsg()
            ))
        })
    }

    /// GeoJSON geometry object (`{"type": "Polygon", "coordinates": [...]}`).
    pub fn to_geojson(&self) -> serde_json::Value {
        let ring: Vec<[f64; 2]> = self.closed_ring().iter().map(|p| [p.x, p.y]).collect();
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [ring],
        })
    }

    /// Decode a GeoJSON geometry object.
    ///
    /// Returns `Ok(None)` for well-formed geometries of another type, which
    /// callers skip. Only the exterior ring of a polygon is kept.
    pub fn from_geojson(geometry: &serde_json::Value) -> Result<Option<Polygon>, CoreError> {
        let geo_type = geometry
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::Validation("geometry.type is required".to_string()))?;
        if geo_type != "Polygon" {
            return Ok(None);
        }
        let exterior = geometry
            .get("coordinates")
            .and_then(|c| c.as_array())
            .and_then(|rings| rings.first())
            .and_then(|ring| ring.as_array())
            .ok_or_else(|| {
                CoreError::Validation("Polygon geometry has no exterior ring".to_string())
            })?;
        let points = exterior
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let pair = position.as_array().filter(|a| a.len() >= 2);
                match pair.map(|a| (a[0].as_f64(), a[1].as_f64())) {
                    Some((Some(x), Some(y))) => Ok(Point::new(x, y)),
                    _ => Err(CoreError::Validation(format!(
                        "Polygon position {i} is not a numeric [x, y] pair"
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Polygon::new(points)
            .map(Some)
            .map_err(|reason| CoreError::Validation(format!("Invalid polygon: {reason}")))
    }
}

/// Extract every polygon from a GeoJSON FeatureCollection, a single Feature,
/// or a bare geometry. Non-polygon features are ignored.
pub fn polygons_from_geojson(value: &serde_json::Value) -> Result<Vec<Polygon>, CoreError> {
    match value.get("type").and_then(|v| v.as_str()) {
        Some("FeatureCollection") => {
            let features = value
                .get("features")
                .and_then(|f| f.as_array())
                .ok_or_else(|| {
                    CoreError::Validation("FeatureCollection.features must be an array".into())
                })?;
            let mut polygons = Vec::with_capacity(features.len());
            for feature in features {
                polygons.extend(polygons_from_geojson(feature)?);
            }
            Ok(polygons)
        }
        Some("Feature") => match value.get("geometry") {
            Some(serde_json::Value::Null) | None => Ok(Vec::new()),
            Some(geometry) => Ok(Polygon::from_geojson(geometry)?.into_iter().collect()),
        },
        Some(_) => Ok(Polygon::from_geojson(value)?.into_iter().collect()),
        None => Err(CoreError::Validation(
            "GeoJSON object is missing 'type'".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Coordinate-list encoding
// ---------------------------------------------------------------------------

/// Parse a tracker bbox string such as `"[(x1, y1), (x2, y2), ...]"`.
///
/// Pairs may be written as tuples or as two-element lists; a trailing comma
/// is accepted after the last pair and inside a pair.
pub fn parse_coordinate_list(chip_id: &ChipId, input: &str) -> Result<Polygon, CoreError> {
    let malformed = |reason: String| CoreError::MalformedGeometry {
        chip_id: chip_id.clone(),
        reason,
    };
    let points = CoordinateScanner::new(input).parse_list().map_err(malformed)?;
    Polygon::new(points).map_err(malformed)
}

/// Format a polygon back into the tracker's coordinate-list encoding.
pub fn format_coordinate_list(polygon: &Polygon) -> String {
    let pairs: Vec<String> = polygon
        .closed_ring()
        .iter()
        .map(|p| format!("({}, {})", format_float(p.x), format_float(p.y)))
        .collect();
    format!("[{}]", pairs.join(", "))
}

/// Shortest round-trip float text, always carrying a fractional part.
fn format_float(v: f64) -> String {
    let text = v.to_string();
    if text.contains(['.', 'e', 'E']) || !v.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Hand-rolled recursive-descent scanner over the coordinate-list grammar.
///
/// ```text
/// list  := '[' ( pair ( ',' pair )* ','? )? ']'
/// pair  := ( '(' | '[' ) number ',' number ','? ( ')' | ']' )
/// ```
struct CoordinateScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CoordinateScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_list(mut self) -> Result<Vec<Point>, String> {
        self.skip_ws();
        self.expect(b'[')?;
        let mut points = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b'(') | Some(b'[') => {
                    points.push(self.parse_pair()?);
                    self.skip_ws();
                    match self.peek() {
                        Some(b',') => self.pos += 1,
                        Some(b']') => {}
                        other => return Err(self.unexpected(other, "',' or ']'")),
                    }
                }
                other => return Err(self.unexpected(other, "'(' or ']'")),
            }
        }
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(format!("trailing characters at offset {}", self.pos));
        }
        Ok(points)
    }

    fn parse_pair(&mut self) -> Result<Point, String> {
        let close = match self.peek() {
            Some(b'(') => b')',
            _ => b']',
        };
        self.pos += 1;
        let x = self.parse_number()?;
        self.skip_ws();
        self.expect(b',')?;
        let y = self.parse_number()?;
        self.skip_ws();
        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_ws();
        }
        match self.peek() {
            Some(c) if c == close => {
                self.pos += 1;
                Ok(Point::new(x, y))
            }
            other => Err(self.unexpected(other, &format!("'{}'", close as char))),
        }
    }

    fn parse_number(&mut self) -> Result<f64, String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E' | b'_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| format!("invalid text at offset {start}"))?;
        if text.is_empty() {
            return Err(self.unexpected(self.peek(), "a number"));
        }
        // `_` digit separators are accepted in stored data; the float parser rejects them.
        let cleaned = text.replace('_', "");
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid number '{text}' at offset {start}"))
    }

    fn expect(&mut self, want: u8) -> Result<(), String> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            other => Err(self.unexpected(other, &format!("'{}'", want as char))),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn unexpected(&self, found: Option<u8>, wanted: &str) -> String {
        match found {
            Some(c) => format!(
                "expected {wanted} at offset {}, found '{}'",
                self.pos,
                c.escape_ascii()
            ),
            None => format!("expected {wanted}, found end of input"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
