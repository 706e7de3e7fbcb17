//! Spatial Data Structures
//!
//! GeoJSON-shaped features stored on entity nodes. Coordinates are
//! `[longitude, latitude]` pairs and every feature carries a `properties` bag
//! of domain back-references (owning intersection, bearing, origin and
//! destination, speed limit, phase and trip-point arrays).
//!
//! Features convert to `geo` primitives for computation and to
//! `geojson::Geometry` for exchange with other GIS tooling.

use crate::geometry::{Bearing, GeometryError, TripPoint};
use geo::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared shape of an entity type's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeoSpatialType {
    #[default]
    None,
    Point,
    LineString,
    Polygon,
    Circle,
}

/// A trip-point sample: distance along the line and the `[lon, lat]` position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPointLocation {
    pub distance: i32,
    pub point: [f64; 2],
}

impl From<TripPoint> for TripPointLocation {
    fn from(sample: TripPoint) -> Self {
        Self {
            distance: sample.distance_feet,
            point: [sample.point.x(), sample.point.y()],
        }
    }
}

/// Detector wired to a phase
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorModel {
    pub number: Option<i32>,
    pub channel: Option<i32>,
}

/// Signal phase served by an approach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseModel {
    pub number: Option<i32>,
    pub movement: Option<String>,
    pub lanes: Option<i32>,
    #[serde(default)]
    pub detectors: Vec<DetectorModel>,
}

impl Default for PhaseModel {
    fn default() -> Self {
        Self {
            number: Some(2),
            movement: Some("Thru".to_string()),
            lanes: Some(1),
            detectors: Vec::new(),
        }
    }
}

/// Domain back-references attached to a feature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonProperties {
    pub intersection: Option<Uuid>,
    pub bearing: Option<Bearing>,
    pub origin: Option<Uuid>,
    pub destination: Option<Uuid>,
    pub speed_limit: Option<f64>,
    pub phases: Option<Vec<PhaseModel>>,
    pub trip_point_locations: Option<Vec<TripPointLocation>>,
    pub intersections: Option<Vec<Uuid>>,
}

fn default_properties() -> Option<GeoJsonProperties> {
    Some(GeoJsonProperties::default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonPointFeature {
    #[serde(rename = "type", default = "point_type")]
    pub feature_type: GeoSpatialType,
    pub coordinates: Option<Vec<f64>>,
    #[serde(default = "default_properties")]
    pub properties: Option<GeoJsonProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonLineStringFeature {
    #[serde(rename = "type", default = "line_string_type")]
    pub feature_type: GeoSpatialType,
    pub coordinates: Option<Vec<Vec<f64>>>,
    #[serde(default = "default_properties")]
    pub properties: Option<GeoJsonProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonPolygonFeature {
    #[serde(rename = "type", default = "polygon_type")]
    pub feature_type: GeoSpatialType,
    pub coordinates: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(default = "default_properties")]
    pub properties: Option<GeoJsonProperties>,
}

fn point_type() -> GeoSpatialType {
    GeoSpatialType::Point
}

fn line_string_type() -> GeoSpatialType {
    GeoSpatialType::LineString
}

fn polygon_type() -> GeoSpatialType {
    GeoSpatialType::Polygon
}

/// Geometry slot of an entity node
///
/// Only the feature matching `geometry_type` is meaningful, but derived
/// features (such as the centroid point of an Intersection polygon) live
/// alongside the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonGeometry {
    #[serde(rename = "type")]
    pub geometry_type: GeoSpatialType,
    pub radius: Option<f64>,
    pub point: Option<GeoJsonPointFeature>,
    pub line_string: Option<GeoJsonLineStringFeature>,
    pub polygon: Option<GeoJsonPolygonFeature>,
}

impl Default for GeoJsonGeometry {
    fn default() -> Self {
        Self {
            geometry_type: GeoSpatialType::Point,
            radius: None,
            point: None,
            line_string: None,
            polygon: None,
        }
    }
}

fn to_coord(pair: &[f64]) -> Result<Coord<f64>, GeometryError> {
    match pair {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(GeometryError::invalid_coordinate(format!("{pair:?}"))),
        _ => Err(GeometryError::invalid_coordinate(format!(
            "expected at least 2 values, got {}",
            pair.len()
        ))),
    }
}

fn to_ring(coords: &[Vec<f64>]) -> Result<LineString<f64>, GeometryError> {
    coords
        .iter()
        .map(|c| to_coord(c))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, GeometryError> {
    let (exterior, holes) = rings.split_first().ok_or(GeometryError::Empty)?;
    if exterior.is_empty() {
        return Err(GeometryError::Empty);
    }
    let interiors = holes
        .iter()
        .map(|ring| to_ring(ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to_ring(exterior)?, interiors))
}

fn from_ring(ring: &LineString<f64>) -> Vec<Vec<f64>> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

impl GeoJsonPointFeature {
    pub fn new(point: Point<f64>) -> Self {
        Self {
            feature_type: GeoSpatialType::Point,
            coordinates: Some(vec![point.x(), point.y()]),
            properties: default_properties(),
        }
    }

    pub fn to_point(&self) -> Result<Point<f64>, GeometryError> {
        let coords = self.coordinates.as_deref().ok_or(GeometryError::Empty)?;
        to_coord(coords).map(Point::from)
    }

    pub fn properties_mut(&mut self) -> &mut GeoJsonProperties {
        self.properties.get_or_insert_with(GeoJsonProperties::default)
    }

    pub fn intersection(&self) -> Option<Uuid> {
        self.properties.as_ref().and_then(|p| p.intersection)
    }
}

impl GeoJsonLineStringFeature {
    pub fn new(line: &LineString<f64>) -> Self {
        Self {
            feature_type: GeoSpatialType::LineString,
            coordinates: Some(from_ring(line)),
            properties: default_properties(),
        }
    }

    pub fn to_line_string(&self) -> Result<LineString<f64>, GeometryError> {
        let coords = self.coordinates.as_deref().ok_or(GeometryError::Empty)?;
        if coords.is_empty() {
            return Err(GeometryError::Empty);
        }
        to_ring(coords)
    }

    pub fn properties_mut(&mut self) -> &mut GeoJsonProperties {
        self.properties.get_or_insert_with(GeoJsonProperties::default)
    }

    pub fn intersection(&self) -> Option<Uuid> {
        self.properties.as_ref().and_then(|p| p.intersection)
    }
}

impl GeoJsonPolygonFeature {
    pub fn new(polygon: &Polygon<f64>) -> Self {
        let mut rings = vec![from_ring(polygon.exterior())];
        rings.extend(polygon.interiors().iter().map(from_ring));
        Self {
            feature_type: GeoSpatialType::Polygon,
            coordinates: Some(rings),
            properties: default_properties(),
        }
    }

    /// First ring is the exterior, any further rings are holes
    pub fn to_polygon(&self) -> Result<Polygon<f64>, GeometryError> {
        let rings = self.coordinates.as_deref().ok_or(GeometryError::Empty)?;
        to_polygon(rings)
    }

    pub fn properties_mut(&mut self) -> &mut GeoJsonProperties {
        self.properties.get_or_insert_with(GeoJsonProperties::default)
    }

    pub fn intersection(&self) -> Option<Uuid> {
        self.properties.as_ref().and_then(|p| p.intersection)
    }
}

impl GeoJsonGeometry {
    pub fn point(point: Point<f64>) -> Self {
        Self {
            geometry_type: GeoSpatialType::Point,
            point: Some(GeoJsonPointFeature::new(point)),
            ..Default::default()
        }
    }

    pub fn line_string(line: &LineString<f64>) -> Self {
        Self {
            geometry_type: GeoSpatialType::LineString,
            line_string: Some(GeoJsonLineStringFeature::new(line)),
            ..Default::default()
        }
    }

    pub fn polygon(polygon: &Polygon<f64>) -> Self {
        Self {
            geometry_type: GeoSpatialType::Polygon,
            polygon: Some(GeoJsonPolygonFeature::new(polygon)),
            ..Default::default()
        }
    }

    /// Intersection stamped on any of the features
    pub fn intersection(&self) -> Option<Uuid> {
        self.point
            .as_ref()
            .and_then(GeoJsonPointFeature::intersection)
            .or_else(|| {
                self.line_string
                    .as_ref()
                    .and_then(GeoJsonLineStringFeature::intersection)
            })
            .or_else(|| self.polygon.as_ref().and_then(GeoJsonPolygonFeature::intersection))
    }

    /// Location used for proximity searches
    pub fn location(&self) -> Option<Point<f64>> {
        self.point.as_ref().and_then(|p| p.to_point().ok())
    }

    /// Export the primary feature as a `geojson::Geometry`
    pub fn to_geojson(&self) -> Option<geojson::Geometry> {
        let value = match self.geometry_type {
            GeoSpatialType::Point | GeoSpatialType::Circle => {
                let point = self.point.as_ref()?.to_point().ok()?;
                geojson::Value::from(&point)
            }
            GeoSpatialType::LineString => {
                let line = self.line_string.as_ref()?.to_line_string().ok()?;
                geojson::Value::from(&line)
            }
            GeoSpatialType::Polygon => {
                let polygon = self.polygon.as_ref()?.to_polygon().ok()?;
                geojson::Value::from(&polygon)
            }
            GeoSpatialType::None => return None,
        };
        Some(geojson::Geometry::new(value))
    }

    /// Import a point, linestring or polygon `geojson::Geometry`
    pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Self, GeometryError> {
        match &geometry.value {
            geojson::Value::Point(position) => {
                Ok(Self::point(Point::from(to_coord(position)?)))
            }
            geojson::Value::LineString(positions) => Ok(Self::line_string(&to_ring(positions)?)),
            geojson::Value::Polygon(rings) => Ok(Self::polygon(&to_polygon(rings)?)),
            _ => Err(GeometryError::invalid_coordinate(
                "only Point, LineString and Polygon geometries are supported",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    #[test]
    fn test_feature_json_shape() {
        let feature = GeoJsonPointFeature::new(point!(x: -111.89, y: 40.76));
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -111.89);
        assert!(json["properties"].is_object());
    }

    #[test]
    fn test_missing_type_uses_feature_default() {
        let feature: GeoJsonLineStringFeature =
            serde_json::from_str(r#"{"coordinates":[[0.0,0.0],[1.0,1.0]]}"#).unwrap();
        assert_eq!(feature.feature_type, GeoSpatialType::LineString);
        assert!(feature.properties.is_some());
        assert_eq!(feature.to_line_string().unwrap().0.len(), 2);
    }

    #[test]
    fn test_short_coordinate_is_rejected() {
        let feature = GeoJsonPointFeature {
            coordinates: Some(vec![1.0]),
            ..GeoJsonPointFeature::new(point!(x: 0.0, y: 0.0))
        };
        assert!(matches!(
            feature.to_point(),
            Err(GeometryError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_polygon_keeps_holes() {
        let with_hole = Polygon::new(
            line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 0.0)],
            vec![line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 1.5), (x: 1.0, y: 1.0)]],
        );
        let feature = GeoJsonPolygonFeature::new(&with_hole);
        assert_eq!(feature.coordinates.as_ref().unwrap().len(), 2);
        assert_eq!(feature.to_polygon().unwrap(), with_hole);
    }

    #[test]
    fn test_geometry_intersection_prefers_point() {
        let id = Uuid::new_v4();
        let mut geometry = GeoJsonGeometry::polygon(&polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        assert_eq!(geometry.intersection(), None);
        if let Some(polygon) = geometry.polygon.as_mut() {
            polygon.properties_mut().intersection = Some(id);
        }
        assert_eq!(geometry.intersection(), Some(id));
    }

    #[test]
    fn test_geojson_interop() {
        let geometry = GeoJsonGeometry::line_string(&line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        let exported = geometry.to_geojson().unwrap();
        assert!(matches!(exported.value, geojson::Value::LineString(_)));
        let imported = GeoJsonGeometry::from_geojson(&exported).unwrap();
        assert_eq!(imported.geometry_type, GeoSpatialType::LineString);
        assert_eq!(imported.line_string.unwrap().coordinates, geometry.line_string.unwrap().coordinates);

        let multi = geojson::Geometry::new(geojson::Value::MultiPoint(vec![vec![0.0, 0.0]]));
        assert!(GeoJsonGeometry::from_geojson(&multi).is_err());
    }
}
