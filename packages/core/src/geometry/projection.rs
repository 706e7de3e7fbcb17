//! Web mercator reprojection
//!
//! Metric work (buffering) happens in EPSG:3857 and results are brought back
//! to EPSG:4326. Both ends are described with proj strings so no EPSG
//! database is needed at runtime.

use super::GeometryError;
use geo::{Coord, LineString, MapCoords, Point, Polygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

const PSEUDO_MERCATOR: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs";

/// Round trip between WGS84 degrees and web mercator meters
pub struct WebMercator {
    geographic: Proj,
    mercator: Proj,
}

impl WebMercator {
    pub fn new() -> Result<Self, GeometryError> {
        Ok(Self {
            geographic: Proj::from_proj_string(WGS84).map_err(GeometryError::projection)?,
            mercator: Proj::from_proj_string(PSEUDO_MERCATOR).map_err(GeometryError::projection)?,
        })
    }

    /// Degrees to mercator meters
    pub fn to_meters(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        let mut xyz = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.mercator, &mut xyz).map_err(GeometryError::projection)?;
        Ok(Coord { x: xyz.0, y: xyz.1 })
    }

    /// Mercator meters back to degrees
    pub fn to_degrees(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        let mut xyz = (coord.x, coord.y, 0.0);
        transform(&self.mercator, &self.geographic, &mut xyz).map_err(GeometryError::projection)?;
        Ok(Coord {
            x: xyz.0.to_degrees(),
            y: xyz.1.to_degrees(),
        })
    }

    pub fn project_point(&self, point: Point<f64>) -> Result<Point<f64>, GeometryError> {
        point.try_map_coords(|c| self.to_meters(c))
    }

    pub fn project_line(&self, line: &LineString<f64>) -> Result<LineString<f64>, GeometryError> {
        line.try_map_coords(|c| self.to_meters(c))
    }

    pub fn unproject_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, GeometryError> {
        polygon.try_map_coords(|c| self.to_degrees(c))
    }
}
