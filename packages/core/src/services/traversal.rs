//! Upstream and downstream intersection traversal
//!
//! Resolves an anchor Intersection and a direction of travel from a query
//! point, then hops from intersection to intersection along that direction.
//! Unresolvable geometry yields an empty result rather than an error.

use super::{EntityService, EntityServiceError};
use crate::behaviors::EntityKind;
use crate::db::NodeFilter;
use crate::geometry::{
    bearing::{to_bearing, to_perpendicular_bearing},
    miles_to_meters, Bearing,
};
use crate::models::EntityNode;
use geo::Point;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Downstream,
    Upstream,
}

impl Direction {
    fn orient(self, bearing: Bearing) -> Bearing {
        match self {
            Direction::Downstream => bearing,
            Direction::Upstream => bearing.opposite(),
        }
    }
}

impl EntityService {
    /// The anchor intersection followed by up to `hops` intersections ahead
    pub async fn get_downstream_intersections(
        &self,
        point: Point<f64>,
        hops: usize,
    ) -> Result<Vec<EntityNode>, EntityServiceError> {
        self.traverse(point, hops, Direction::Downstream).await
    }

    /// Up to `hops` intersections behind the anchor, anchor excluded
    pub async fn get_upstream_intersections(
        &self,
        point: Point<f64>,
        hops: usize,
    ) -> Result<Vec<EntityNode>, EntityServiceError> {
        self.traverse(point, hops, Direction::Upstream).await
    }

    async fn traverse(
        &self,
        point: Point<f64>,
        hops: usize,
        direction: Direction,
    ) -> Result<Vec<EntityNode>, EntityServiceError> {
        let Some((anchor, bearing)) = self.resolve_anchor(point).await? else {
            tracing::debug!(?direction, "No anchor intersection for point");
            return Ok(Vec::new());
        };
        let bearing = direction.orient(bearing);
        if !bearing.is_known() {
            tracing::debug!(?direction, anchor = %anchor.id, "Traversal bearing unknown");
            return Ok(match direction {
                Direction::Downstream => vec![anchor],
                Direction::Upstream => Vec::new(),
            });
        }

        let mut visited = HashSet::from([anchor.id]);
        let mut path = Vec::with_capacity(hops + 1);
        let mut current = anchor.clone();
        if direction == Direction::Downstream {
            path.push(anchor);
        }

        for _ in 0..hops {
            match self.next_intersection(&current, bearing, &visited).await? {
                Some(next) => {
                    visited.insert(next.id);
                    path.push(next.clone());
                    current = next;
                }
                None => break,
            }
        }
        Ok(path)
    }

    /// Anchor intersection and the raw (downstream) bearing for a point
    async fn resolve_anchor(&self, point: Point<f64>) -> Result<Option<(EntityNode, Bearing)>, EntityServiceError> {
        let fences = self.store.query_intersecting_geo_fences(point).await?;

        let intersection_type = EntityKind::Intersection.name();
        if let Some(anchor) = fences.iter().find(|n| n.type_name() == intersection_type) {
            let Some(center) = anchor.geometry.location() else {
                return Ok(None);
            };
            let bearing = to_perpendicular_bearing(point, center);
            return Ok(Some((anchor.clone(), bearing)));
        }

        let segment_type = EntityKind::StreetSegment.name();
        if let Some(segment) = fences.iter().find(|n| n.type_name() == segment_type) {
            let Some(line) = segment.geometry.line_string.as_ref() else {
                return Ok(None);
            };
            let Some(anchor_id) = line.intersection() else {
                return Ok(None);
            };
            let bearing = line
                .properties
                .as_ref()
                .and_then(|p| p.bearing)
                .unwrap_or_default();
            return Ok(self
                .store
                .get_by_id(anchor_id)
                .await?
                .filter(|n| !n.is_deleted)
                .map(|anchor| (anchor, bearing)));
        }

        let nearest = self
            .intersections_near(point, self.config.fallback_radius_miles)
            .await?
            .into_iter()
            .next();
        Ok(nearest.and_then(|anchor| {
            let center = anchor.geometry.location()?;
            let bearing = to_bearing(point, center);
            Some((anchor, bearing))
        }))
    }

    async fn next_intersection(
        &self,
        current: &EntityNode,
        bearing: Bearing,
        visited: &HashSet<Uuid>,
    ) -> Result<Option<EntityNode>, EntityServiceError> {
        let Some(from) = current.geometry.location() else {
            return Ok(None);
        };
        let candidates = self
            .intersections_near(from, self.config.hop_radius_miles)
            .await?;

        Ok(candidates.into_iter().find(|candidate| {
            !visited.contains(&candidate.id)
                && candidate
                    .geometry
                    .location()
                    .is_some_and(|to| to_bearing(from, to) == bearing)
        }))
    }

    async fn intersections_near(&self, point: Point<f64>, miles: f64) -> Result<Vec<EntityNode>, EntityServiceError> {
        let filter = NodeFilter::TypeName(EntityKind::Intersection.name().to_string()).and(NodeFilter::not_deleted());
        Ok(self
            .store
            .collection()
            .near(point, miles_to_meters(miles), &filter)
            .await?)
    }
}
