//! Coordinate Reference System codes, axis order and the one reprojection
//! the client performs (geographic <-> Web Mercator).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Extent, OgcError, OgcResult};

/// Half the circumference of the Web Mercator sphere, in meters.
const WEB_MERCATOR_MAX: f64 = 20037508.342789244;

/// Web Mercator latitude limit in degrees.
const WEB_MERCATOR_MAX_LAT: f64 = 85.05112877980659;

/// An EPSG coordinate reference system code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrsCode(pub u32);

impl CrsCode {
    pub const WGS84: CrsCode = CrsCode(4326);
    pub const WEB_MERCATOR: CrsCode = CrsCode(3857);

    /// Parse a CRS string as found in requests and capabilities documents.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "CRS:84" (EPSG:4326 with lon/lat axis order)
    /// - "EPSG:900913" (legacy Web Mercator)
    /// - "urn:ogc:def:crs:EPSG::3857"
    pub fn from_wms_string(s: &str) -> OgcResult<Self> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CRS:84" => return Ok(CrsCode::WGS84),
            "EPSG:900913" => return Ok(CrsCode::WEB_MERCATOR),
            _ => {}
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .ok_or_else(|| OgcError::UnsupportedCrs(s.to_string()))?;

        code.parse()
            .map(CrsCode)
            .map_err(|_| OgcError::UnsupportedCrs(s.to_string()))
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self.0, 4326 | 4269 | 4258 | 4283)
    }

    /// Axis order of BBOX values for the given service version.
    ///
    /// WMS 1.3.0 uses the declared axis order of the CRS, which is lat/lon
    /// for the EPSG geographic systems. Earlier versions are always x/y.
    pub fn axis_order(&self, version: &str) -> AxisOrder {
        if version_at_least(version, (1, 3)) && self.is_geographic() {
            AxisOrder::LatLon
        } else {
            AxisOrder::XY
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl Default for CrsCode {
    fn default() -> Self {
        CrsCode::WGS84
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}

/// Compare a dotted version string against a (major, minor) pair.
pub fn version_at_least(version: &str, min: (u32, u32)) -> bool {
    let mut parts = version.trim().split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= min
}

/// Reproject an extent between EPSG:4326 and EPSG:3857.
///
/// Identity when both codes are equal. Latitudes beyond the Web Mercator
/// limit are clamped.
pub fn reproject_extent(extent: &Extent, from: CrsCode, to: CrsCode) -> OgcResult<Extent> {
    if from == to {
        return Ok(*extent);
    }

    match (from, to) {
        (CrsCode::WGS84, CrsCode::WEB_MERCATOR) => {
            let (min_x, min_y) = lonlat_to_mercator(extent.min_x, extent.min_y);
            let (max_x, max_y) = lonlat_to_mercator(extent.max_x, extent.max_y);
            Ok(Extent::new(min_x, min_y, max_x, max_y))
        }
        (CrsCode::WEB_MERCATOR, CrsCode::WGS84) => {
            let (min_x, min_y) = mercator_to_lonlat(extent.min_x, extent.min_y);
            let (max_x, max_y) = mercator_to_lonlat(extent.max_x, extent.max_y);
            Ok(Extent::new(min_x, min_y, max_x, max_y))
        }
        _ => Err(OgcError::UnsupportedCrs(format!(
            "no transformation from {} to {}",
            from, to
        ))),
    }
}

fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = lon * WEB_MERCATOR_MAX / 180.0;
    let y = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
        * WEB_MERCATOR_MAX
        / std::f64::consts::PI;
    (x, y)
}

fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 180.0 / WEB_MERCATOR_MAX;
    let lat = (2.0 * (y * std::f64::consts::PI / WEB_MERCATOR_MAX).exp().atan()
        - std::f64::consts::FRAC_PI_2)
        .to_degrees();
    (lon, lat)
}
