//! Distances, centroids and trip-point sampling

use super::{GeometryError, METERS_PER_FOOT};
use geo::{Centroid, Distance, Haversine, InterpolatePoint, LineString, Point, Polygon};

/// Great-circle distance in meters
pub fn distance_meters(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b)
}

/// Area centroid of a polygon
pub fn centroid(polygon: &Polygon<f64>) -> Option<Point<f64>> {
    polygon.centroid()
}

/// A sample taken along a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripPoint {
    /// Distance from the start of the line in feet
    pub distance_feet: i32,
    pub point: Point<f64>,
}

/// Sample `line` every `spacing_feet`, starting with the first coordinate
pub fn trip_points(line: &LineString<f64>, spacing_feet: f64) -> Result<Vec<TripPoint>, GeometryError> {
    let first = *line.0.first().ok_or(GeometryError::Empty)?;
    if !(spacing_feet.is_finite() && spacing_feet > 0.0) {
        return Err(GeometryError::invalid_coordinate(format!(
            "trip point spacing must be positive, got {spacing_feet}"
        )));
    }

    let spacing_m = spacing_feet * METERS_PER_FOOT;
    let mut samples = Vec::new();
    let mut next_at = 0.0_f64;
    let mut travelled = 0.0_f64;
    let mut step = 0;

    for segment in line.lines() {
        let (start, end) = segment.points();
        let length = Haversine.distance(start, end);

        while next_at <= travelled + length {
            samples.push(TripPoint {
                distance_feet: (step as f64 * spacing_feet).round() as i32,
                point: Haversine.point_at_distance_between(start, end, next_at - travelled),
            });
            step += 1;
            next_at = step as f64 * spacing_m;
        }
        travelled += length;
    }

    if samples.is_empty() {
        samples.push(TripPoint {
            distance_feet: 0,
            point: Point::from(first),
        });
    }

    Ok(samples)
}
