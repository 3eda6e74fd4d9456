//! Extent (bounding box) types and validation.

use serde::{Deserialize, Serialize};

use crate::crs::AxisOrder;
use crate::{OgcError, OgcResult};

/// A geographic or projected extent, `[minX, minY, maxX, maxY]`.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Create an extent from corner coordinates without validating it.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create an extent, rejecting inverted or non-finite corners.
    pub fn try_new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> OgcResult<Self> {
        let extent = Self::new(min_x, min_y, max_x, max_y);
        extent.validate()?;
        Ok(extent)
    }

    /// Parse a BBOX parameter string: "minx,miny,maxx,maxy"
    pub fn from_wms_string(s: &str) -> OgcResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(OgcError::MalformedExtent(format!(
                "{}. Expected 'minx,miny,maxx,maxy'",
                s
            )));
        }

        let mut coords = [0.0f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| OgcError::MalformedExtent(format!("invalid number '{}'", part)))?;
        }

        Self::try_new(coords[0], coords[1], coords[2], coords[3])
    }

    /// Check the ordering invariant `min <= max` on both axes.
    ///
    /// Extents wrapping the antimeridian are not supported and fail here.
    pub fn validate(&self) -> OgcResult<()> {
        check_extent(&self.to_array())
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Serialize for a BBOX query parameter in the given axis order.
    pub fn to_wms_string(&self, axis_order: AxisOrder) -> String {
        let [a, b, c, d] = match axis_order {
            AxisOrder::XY => [self.min_x, self.min_y, self.max_x, self.max_y],
            AxisOrder::LatLon => [self.min_y, self.min_x, self.max_y, self.max_x],
        };
        format!("{},{},{},{}", a, b, c, d)
    }
}

impl TryFrom<[f64; 4]> for Extent {
    type Error = OgcError;

    fn try_from(value: [f64; 4]) -> OgcResult<Self> {
        Self::try_new(value[0], value[1], value[2], value[3])
    }
}

/// Validate a raw `[minX, minY, maxX, maxY]` tuple.
pub fn check_extent(extent: &[f64; 4]) -> OgcResult<()> {
    let [min_x, min_y, max_x, max_y] = *extent;

    if extent.iter().any(|v| !v.is_finite()) {
        return Err(OgcError::MalformedExtent(format!(
            "non-finite coordinate in {:?}",
            extent
        )));
    }
    if min_x > max_x {
        return Err(OgcError::MalformedExtent(format!(
            "minX {} is greater than maxX {}",
            min_x, max_x
        )));
    }
    if min_y > max_y {
        return Err(OgcError::MalformedExtent(format!(
            "minY {} is greater than maxY {}",
            min_y, max_y
        )));
    }
    Ok(())
}
