//! Geometry Module
//!
//! Pure functions over `geo` primitives used by type enrichment and traversal:
//!
//! - [`buffer`] - circular and corridor buffers measured in feet or miles
//! - [`bearing`] - compass octants, opposite and perpendicular bearings
//! - [`projection`] - WGS84 to web mercator round trip used for buffering
//! - [`measure`] - spherical distance, centroids and trip-point sampling
//!
//! All coordinates are `[longitude, latitude]` in WGS84 degrees. Buffers are
//! built in EPSG:3857 through `proj4rs`; distances and sampling run on the
//! sphere with `geo`'s haversine measures.

pub mod bearing;
pub mod buffer;
mod error;
pub mod measure;
pub mod projection;

pub use bearing::Bearing;
pub use buffer::{buffer_line, buffer_point, union_polygons};
pub use error::GeometryError;
pub use measure::{centroid, distance_meters, trip_points, TripPoint};
pub use projection::WebMercator;

/// Meters in one international foot
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Meters in one statute mile
pub const METERS_PER_MILE: f64 = 1609.344;

/// Convert feet to meters
pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

/// Convert statute miles to meters
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}
