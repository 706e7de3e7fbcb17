//! Compass bearings
//!
//! Traversal and segment enrichment only care about direction at octant
//! resolution. Raw bearings are computed on the sphere with `geo`'s
//! [`Haversine`] initial bearing and then folded into one of the eight 45°
//! sectors centred on the compass points.

use super::GeometryError;
use geo::{Bearing as _, Haversine, LineString, Point};
use serde::{Deserialize, Serialize};

/// Direction of travel at compass-octant resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Bearing {
    #[default]
    Unknown,
    NB,
    EB,
    SB,
    WB,
    NEB,
    NWB,
    SEB,
    SWB,
}

impl Bearing {
    /// Fold a bearing in degrees (any range, clockwise from north) into an octant
    pub fn from_degrees(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Bearing::Unknown;
        }
        let normalized = degrees.rem_euclid(360.0);
        let sector = ((normalized + 22.5) / 45.0).floor() as u8 % 8;
        match sector {
            0 => Bearing::NB,
            1 => Bearing::NEB,
            2 => Bearing::EB,
            3 => Bearing::SEB,
            4 => Bearing::SB,
            5 => Bearing::SWB,
            6 => Bearing::WB,
            _ => Bearing::NWB,
        }
    }

    /// Centre of the octant in degrees, `None` for `Unknown`
    pub fn degrees(&self) -> Option<f64> {
        match self {
            Bearing::Unknown => None,
            Bearing::NB => Some(0.0),
            Bearing::NEB => Some(45.0),
            Bearing::EB => Some(90.0),
            Bearing::SEB => Some(135.0),
            Bearing::SB => Some(180.0),
            Bearing::SWB => Some(225.0),
            Bearing::WB => Some(270.0),
            Bearing::NWB => Some(315.0),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Bearing::Unknown => Bearing::Unknown,
            Bearing::NB => Bearing::SB,
            Bearing::SB => Bearing::NB,
            Bearing::EB => Bearing::WB,
            Bearing::WB => Bearing::EB,
            Bearing::NEB => Bearing::SWB,
            Bearing::SWB => Bearing::NEB,
            Bearing::NWB => Bearing::SEB,
            Bearing::SEB => Bearing::NWB,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Bearing::Unknown
    }
}

/// Initial great-circle bearing from `from` to `to` in degrees `[0, 360)`
///
/// Returns `None` when both points coincide.
pub fn bearing_degrees(from: Point<f64>, to: Point<f64>) -> Option<f64> {
    if from == to {
        return None;
    }
    Some(Haversine.bearing(from, to).rem_euclid(360.0))
}

/// Octant from `from` towards `to`
pub fn to_bearing(from: Point<f64>, to: Point<f64>) -> Bearing {
    bearing_degrees(from, to)
        .map(Bearing::from_degrees)
        .unwrap_or(Bearing::Unknown)
}

/// Direction of travel past `to` when standing at `from`
///
/// Travel is taken to run at right angles to the offset between the point and
/// the reference, rotated clockwise.
pub fn to_perpendicular_bearing(from: Point<f64>, to: Point<f64>) -> Bearing {
    bearing_degrees(from, to)
        .map(|deg| Bearing::from_degrees(deg + 90.0))
        .unwrap_or(Bearing::Unknown)
}

/// True when the octant from `from` to `to` equals `bearing`
pub fn is_matching_bearings(from: Point<f64>, to: Point<f64>, bearing: Bearing) -> bool {
    bearing.is_known() && to_bearing(from, to) == bearing
}

/// Direction of a line from its first to its last coordinate
pub fn line_bearing(line: &LineString<f64>) -> Result<Bearing, GeometryError> {
    let first = line.0.first().ok_or(GeometryError::Empty)?;
    let last = line.0.last().ok_or(GeometryError::Empty)?;
    bearing_degrees(Point::from(*first), Point::from(*last))
        .map(Bearing::from_degrees)
        .ok_or(GeometryError::DegenerateLine)
}
