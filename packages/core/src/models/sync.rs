//! Sync payloads
//!
//! Externally sourced corridor and intersection definitions. Records are
//! matched to existing nodes by the string form of their numeric external id.

use super::{EntityNode, GeoJsonPointFeature};
use crate::behaviors::EntityKind;
use geo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Controller type stamped on nodes created from intersection records
pub const SYNCED_CONTROLLER_TYPE: &str = "SPAT";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySync {
    #[serde(default)]
    pub external_system_id: Uuid,
    #[serde(default)]
    pub corridors: Vec<CorridorSyncModel>,
    #[serde(default)]
    pub intersections: Vec<SpatIntersectionModel>,
}

impl EntitySync {
    pub fn is_empty(&self) -> bool {
        self.corridors.is_empty() && self.intersections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorSyncModel {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_deleted: bool,
    /// External ids of member intersections, in corridor order
    #[serde(default)]
    pub intersections: Vec<i64>,
}

impl CorridorSyncModel {
    pub fn external_id(&self) -> String {
        self.id.to_string()
    }

    /// Position of an intersection external id in corridor order
    pub fn position_of(&self, external_id: &str) -> Option<usize> {
        let id: i64 = external_id.parse().ok()?;
        self.intersections.iter().position(|i| *i == id)
    }

    /// The listed intersections found in `candidates`, in corridor order
    pub fn ordered_members(&self, candidates: &[EntityNode]) -> Vec<EntityNode> {
        let mut members: Vec<(usize, &EntityNode)> = candidates
            .iter()
            .filter_map(|node| {
                let external = node.external_id.as_deref()?;
                self.position_of(external).map(|pos| (pos, node))
            })
            .collect();
        members.sort_by_key(|(pos, _)| *pos);
        members.into_iter().map(|(_, node)| node.clone()).collect()
    }

    pub fn to_new_node(&self) -> EntityNode {
        EntityNode {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            external_id: Some(self.external_id()),
            entity_type: EntityKind::Corridor.type_id(),
            is_leaf: false,
            ..Default::default()
        }
    }

    /// Copy the synced fields onto an existing node
    ///
    /// The deleted flag is not copied; deletion goes through the service.
    pub fn apply_to(&self, node: &mut EntityNode) {
        node.name = self.name.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatIntersectionModel {
    pub id: Uuid,
    pub clarity_id: Option<i64>,
    pub spat_id: Option<i32>,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub controller_type: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl SpatIntersectionModel {
    pub fn external_id(&self) -> Option<String> {
        self.clarity_id.map(|id| id.to_string())
    }

    fn location(&self) -> Option<Point<f64>> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    /// New Signal node for a first-seen intersection
    ///
    /// A `0, 0` location is treated as unset.
    pub fn to_new_node(&self) -> EntityNode {
        let mut node = EntityNode {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            controller_type: Some(SYNCED_CONTROLLER_TYPE.to_string()),
            external_id: self.external_id(),
            id_mapping: self.spat_id,
            entity_type: EntityKind::Signal.type_id(),
            ..Default::default()
        };
        if let Some(point) = self.location().filter(|p| p.x() != 0.0 && p.y() != 0.0) {
            node.geometry.point = Some(GeoJsonPointFeature::new(point));
        }
        node
    }

    /// Copy the synced fields onto an existing node
    ///
    /// The deleted flag is not copied; deletion goes through the service.
    pub fn apply_to(&self, node: &mut EntityNode) {
        node.name = self.name.clone();
        node.description = self.description.clone().unwrap_or_default();
        node.id_mapping = self.spat_id;
        if let Some(point) = self.location() {
            node.geometry.point = Some(GeoJsonPointFeature::new(point));
        }
    }
}
