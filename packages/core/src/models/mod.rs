//! Data Models
//!
//! This module contains the data structures of the entity tree:
//!
//! - `EntityNode` - authoritative node document with geometry and tree links
//! - `Entity` - child summary embedded in a parent's `children`
//! - `EntityNodeProjection` - read-side tree view addressed by instance id
//! - `EntityType` - persisted type descriptor
//! - Spatial features and sync payloads
//!
//! Documents serialize with camelCase keys so stored JSON stays compatible
//! with other consumers of the same collection.

mod entity;
mod entity_node;
mod entity_type;
mod projection;
mod spatial;
mod sync;

pub use entity::{Entity, EntityTypeId, Jurisdiction};
pub use entity_node::{expandable_instance_ids, summaries_to_projections, EntityNode, InstanceId};
pub use entity_type::{EntityType, EntityTypeSection};
pub use projection::EntityNodeProjection;
pub use spatial::{
    DetectorModel, GeoJsonGeometry, GeoJsonLineStringFeature, GeoJsonPointFeature,
    GeoJsonPolygonFeature, GeoJsonProperties, GeoSpatialType, PhaseModel, TripPointLocation,
};
pub use sync::{CorridorSyncModel, EntitySync, SpatIntersectionModel, SYNCED_CONTROLLER_TYPE};
