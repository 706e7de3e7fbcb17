//! Buffering and polygon union
//!
//! Inputs are reprojected to web mercator, buffered there with `geo`'s
//! round-joined, round-capped buffer and brought back to WGS84. Widths are
//! mercator meters, so on the ground they shrink with latitude the same way
//! any web-map overlay does.

use super::{GeometryError, WebMercator};
use geo::{Area, BooleanOps, Buffer, LineString, MultiPolygon, Point, Polygon};

/// Circular buffer of `radius_m` meters around `point`
pub fn buffer_point(point: Point<f64>, radius_m: f64) -> Result<Polygon<f64>, GeometryError> {
    let mercator = WebMercator::new()?;
    let buffered = mercator.project_point(point)?.buffer(radius_m);
    outline(&mercator, buffered)
}

/// Corridor buffer of `half_width_m` meters on each side of `line`
///
/// A line with a single distinct location degrades to a point buffer.
pub fn buffer_line(line: &LineString<f64>, half_width_m: f64) -> Result<Polygon<f64>, GeometryError> {
    let first = *line.0.first().ok_or(GeometryError::Empty)?;
    if line.coords().all(|c| *c == first) {
        return buffer_point(Point::from(first), half_width_m);
    }

    let mercator = WebMercator::new()?;
    let buffered = mercator.project_line(line)?.buffer(half_width_m);
    outline(&mercator, buffered)
}

/// Union of any number of polygons
pub fn union_polygons(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    let mut iter = polygons.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(vec![]);
    };
    iter.fold(MultiPolygon::new(vec![first.clone()]), |acc, next| {
        acc.union(&MultiPolygon::new(vec![next.clone()]))
    })
}

/// Largest part of a mercator buffer, in degrees
fn outline(mercator: &WebMercator, buffered: MultiPolygon<f64>) -> Result<Polygon<f64>, GeometryError> {
    let largest = buffered
        .0
        .into_iter()
        .max_by(|a, b| {
            a.unsigned_area()
                .partial_cmp(&b.unsigned_area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(GeometryError::Empty)?;
    mercator.unproject_polygon(&largest)
}
