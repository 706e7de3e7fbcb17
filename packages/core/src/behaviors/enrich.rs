//! Per-type geometry enrichment
//!
//! Derived geometry is never trusted from callers. Every add and update runs
//! the node through [`enrich`], which recomputes the geofence and stamps the
//! domain back-references on the node's features according to its kind:
//!
//! - **Point** kinds (Signal, Environmental Sensor, Rsu): 100 ft circular
//!   geofence, point stamped with the intersection.
//! - **LineString** kinds (Approach, Street Segment, Speed Segment): 36.7 ft
//!   corridor geofence, line stamped with the intersection and bearing.
//!   Street Segments also get a destination and trip points every 50 ft,
//!   Speed Segments an origin/destination pair and the other Speed Segments
//!   their geofence crosses.
//! - **Polygon** kinds (Intersection, Detector): centroid point, polygon used
//!   as the geofence.
//!
//! A node missing the geometry its kind needs comes back unchanged.

use super::EntityKind;
use crate::db::{EntityCollection, GeoQuery, NodeFilter};
use crate::geometry::{bearing::line_bearing, buffer_line, buffer_point, centroid, feet_to_meters, trip_points};
use crate::models::{EntityNode, GeoJsonPointFeature, GeoJsonPolygonFeature, TripPointLocation};
use anyhow::Result;
use uuid::Uuid;

/// Geofence radius around point devices
pub const POINT_GEOFENCE_RADIUS_FEET: f64 = 100.0;

/// Half-width of the geofence along line features
pub const LINE_GEOFENCE_HALF_WIDTH_FEET: f64 = 36.7;

/// Spacing of trip points sampled along street segments
pub const TRIP_POINT_SPACING_FEET: f64 = 50.0;

/// Recompute derived geometry for `node` as `kind`
///
/// `nodes` is only consulted for Speed Segments.
pub async fn enrich(
    kind: EntityKind,
    mut node: EntityNode,
    intersection: Option<Uuid>,
    nodes: &dyn EntityCollection,
) -> Result<EntityNode> {
    match kind {
        EntityKind::System | EntityKind::Corridor => {}
        EntityKind::Signal | EntityKind::Ess | EntityKind::Rsu => enrich_point(&mut node, intersection),
        EntityKind::Approach => {
            enrich_line(&mut node, intersection);
        }
        EntityKind::StreetSegment => {
            if enrich_line(&mut node, intersection) {
                enrich_street_segment(&mut node);
            }
        }
        EntityKind::SpeedSegment => {
            if enrich_line(&mut node, intersection) {
                enrich_speed_segment(&mut node, nodes).await?;
            }
        }
        EntityKind::Intersection => {
            let own = node.id;
            if enrich_polygon(&mut node, own) {
                if let Some(polygon) = node.geometry.polygon.as_mut() {
                    polygon.properties_mut().intersection = Some(own);
                }
            }
        }
        EntityKind::Detector => {
            let own = node.id;
            let parent = node.parent;
            if enrich_polygon(&mut node, own) {
                if let Some(polygon) = node.geometry.polygon.as_mut() {
                    let properties = polygon.properties_mut();
                    properties.intersection = intersection;
                    properties.destination = Some(parent);
                }
            }
        }
    }
    Ok(node)
}

fn enrich_point(node: &mut EntityNode, intersection: Option<Uuid>) {
    let Some(feature) = node.geometry.point.as_mut() else {
        return;
    };
    let Ok(point) = feature.to_point() else {
        return;
    };
    let Ok(fence) = buffer_point(point, feet_to_meters(POINT_GEOFENCE_RADIUS_FEET)) else {
        return;
    };
    feature.properties_mut().intersection = intersection;
    node.geo_fence = Some(GeoJsonPolygonFeature::new(&fence));
}

/// Shared line handling; false when the node has no usable line
fn enrich_line(node: &mut EntityNode, intersection: Option<Uuid>) -> bool {
    let Some(feature) = node.geometry.line_string.as_mut() else {
        return false;
    };
    let Ok(line) = feature.to_line_string() else {
        return false;
    };
    let Ok(fence) = buffer_line(&line, feet_to_meters(LINE_GEOFENCE_HALF_WIDTH_FEET)) else {
        return false;
    };

    let properties = feature.properties_mut();
    properties.intersection = intersection;
    if let Ok(bearing) = line_bearing(&line) {
        properties.bearing = Some(bearing);
    }
    node.geo_fence = Some(GeoJsonPolygonFeature::new(&fence));
    true
}

fn enrich_street_segment(node: &mut EntityNode) {
    let parent = node.parent;
    let Some(feature) = node.geometry.line_string.as_mut() else {
        return;
    };
    let samples = feature
        .to_line_string()
        .and_then(|line| trip_points(&line, TRIP_POINT_SPACING_FEET))
        .unwrap_or_default();

    let properties = feature.properties_mut();
    properties.destination = Some(parent);
    properties.trip_point_locations = Some(samples.into_iter().map(TripPointLocation::from).collect());
}

async fn enrich_speed_segment(node: &mut EntityNode, nodes: &dyn EntityCollection) -> Result<()> {
    let origin = node.parents.first().copied();
    let destination = node.parents.last().copied();
    let own = node.id;

    let Some(feature) = node.geometry.line_string.as_mut() else {
        return Ok(());
    };
    let Ok(line) = feature.to_line_string() else {
        return Ok(());
    };

    let filter = NodeFilter::TypeName(EntityKind::SpeedSegment.name().to_string()).and(NodeFilter::not_deleted());
    let crossing = nodes
        .geo_fence_intersecting(&GeoQuery::LineString(line), &filter)
        .await?;

    let properties = feature.properties_mut();
    properties.origin = origin;
    properties.destination = destination;
    properties.intersections = Some(crossing.iter().map(|n| n.id).filter(|id| *id != own).collect());
    Ok(())
}

/// Shared polygon handling; false when the node has no usable polygon
fn enrich_polygon(node: &mut EntityNode, own: Uuid) -> bool {
    let Some(feature) = node.geometry.polygon.as_ref() else {
        return false;
    };
    let Ok(polygon) = feature.to_polygon() else {
        return false;
    };
    let Some(center) = centroid(&polygon) else {
        return false;
    };

    let mut point = GeoJsonPointFeature::new(center);
    point.properties_mut().intersection = Some(own);
    node.geometry.point = Some(point);
    node.geo_fence = Some(GeoJsonPolygonFeature::new(&polygon));
    true
}
