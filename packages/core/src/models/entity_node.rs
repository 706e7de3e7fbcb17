//! Entity Node Data Structures
//!
//! [`EntityNode`] is the authoritative document for one entity in the tree.
//!
//! # Tree Representation
//!
//! The tree is stored denormalized:
//!
//! - `parent` is the primary parent (`Uuid::nil()` for roots)
//! - `parents` lists every parent the node is linked under, including copies
//! - `children` embeds an [`Entity`] summary of every child
//!
//! A node appearing under several parents is addressed per occurrence by an
//! [`InstanceId`] of the form `"{parent}_{node}"`.

use super::{
    Entity, EntityNodeProjection, EntityTypeId, GeoJsonGeometry, GeoJsonPolygonFeature,
    Jurisdiction,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

fn default_version() -> i32 {
    -1
}

fn default_true() -> bool {
    true
}

/// Authoritative entity document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNode {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_deleted: bool,
    /// Informational counter, never used for concurrency control
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(rename = "type", default)]
    pub entity_type: EntityTypeId,
    pub jurisdiction: Option<Jurisdiction>,
    #[serde(default)]
    pub is_copy: bool,
    #[serde(default = "default_true")]
    pub is_leaf: bool,

    /// Primary parent, `Uuid::nil()` for roots
    #[serde(default)]
    pub parent: Uuid,
    #[serde(default)]
    pub parents: Vec<Uuid>,

    #[serde(default)]
    pub geometry: GeoJsonGeometry,
    /// Derived containment polygon, recomputed on every add and update
    pub geo_fence: Option<GeoJsonPolygonFeature>,

    /// Key of the record in the system this node was synced from
    pub external_id: Option<String>,
    /// Primary street name
    pub primary: Option<String>,
    /// Secondary street name
    pub secondary: Option<String>,
    /// Day-of-week bitmask
    pub active_days: Option<i32>,
    /// Numeric id used by field devices
    pub id_mapping: Option<i32>,
    pub controller_type: Option<String>,

    #[serde(default)]
    pub children: Vec<Entity>,
}

impl Default for EntityNode {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            description: String::new(),
            is_deleted: false,
            version: default_version(),
            entity_type: EntityTypeId::default(),
            jurisdiction: None,
            is_copy: false,
            is_leaf: true,
            parent: Uuid::nil(),
            parents: Vec::new(),
            geometry: GeoJsonGeometry::default(),
            geo_fence: None,
            external_id: None,
            primary: None,
            secondary: None,
            active_days: None,
            id_mapping: None,
            controller_type: None,
            children: Vec::new(),
        }
    }
}

impl EntityNode {
    /// Create a node with a fresh id
    pub fn new(entity_type: EntityTypeId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            entity_type,
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_nil()
    }

    pub fn type_name(&self) -> &str {
        &self.entity_type.name
    }

    /// Summary embedded in a parent's `children`
    ///
    /// A node flagged as non-leaf stays non-leaf; a leaf-flagged node is only
    /// reported as a leaf when it has no embedded children at all.
    pub fn to_entity(&self) -> Entity {
        Entity {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            is_deleted: self.is_deleted,
            version: self.version,
            entity_type: self.entity_type.clone(),
            jurisdiction: self.jurisdiction.clone(),
            is_copy: self.is_copy,
            is_leaf: self.is_leaf && self.children.is_empty(),
        }
    }

    /// Read view of this node as it appears under `parent`
    pub fn to_projection(&self, parent: Uuid) -> EntityNodeProjection {
        EntityNodeProjection {
            id: self.id,
            instance_id: InstanceId::new(parent, self.id).to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            entity_type: self.entity_type.clone(),
            jurisdiction: self.jurisdiction.clone(),
            is_copy: self.is_copy,
            is_leaf: self.is_leaf,
            is_deleted: self.is_deleted,
            version: self.version,
            parent: self.parent,
            children: summaries_to_projections(&self.children, self.id),
        }
    }

    /// Children that count towards leaf status
    pub fn active_children(&self) -> impl Iterator<Item = &Entity> {
        self.children.iter().filter(|c| !c.is_deleted)
    }
}

impl Entity {
    /// Shallow projection of a child summary under `parent`
    pub fn to_projection(&self, parent: Uuid) -> EntityNodeProjection {
        EntityNodeProjection {
            id: self.id,
            instance_id: InstanceId::new(parent, self.id).to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            entity_type: self.entity_type.clone(),
            jurisdiction: self.jurisdiction.clone(),
            is_copy: self.is_copy,
            is_leaf: self.is_leaf,
            is_deleted: self.is_deleted,
            version: self.version,
            parent,
            children: Vec::new(),
        }
    }

    /// Minimal node document for this summary under `parent`
    pub fn to_entity_node(&self, parent: Uuid) -> EntityNode {
        EntityNode {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            entity_type: self.entity_type.clone(),
            jurisdiction: self.jurisdiction.clone(),
            is_copy: self.is_copy,
            is_leaf: self.is_leaf,
            is_deleted: self.is_deleted,
            version: self.version,
            parent,
            ..Default::default()
        }
    }
}

/// Non-deleted summaries projected under `parent`
pub fn summaries_to_projections(children: &[Entity], parent: Uuid) -> Vec<EntityNodeProjection> {
    children
        .iter()
        .filter(|c| !c.is_deleted)
        .map(|c| c.to_projection(parent))
        .collect()
}

/// Instance ids of every non-leaf node, used to request a fully expanded tree
pub fn expandable_instance_ids(nodes: &[EntityNode]) -> Vec<InstanceId> {
    nodes
        .iter()
        .filter(|n| !n.is_leaf)
        .map(|n| InstanceId::new(n.parent, n.id))
        .collect()
}

/// One occurrence of a node under a specific parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstanceId {
    pub parent: Uuid,
    pub node: Uuid,
}

impl InstanceId {
    pub fn new(parent: Uuid, node: Uuid) -> Self {
        Self { parent, node }
    }

    /// Parse `"{parent}_{node}"`
    ///
    /// A bare id is read as a root occurrence. Anything else resolves to
    /// nil ids rather than failing.
    pub fn parse(value: &str) -> Self {
        let parts: Vec<&str> = value.split('_').collect();
        if parts.len() == 2 {
            if let (Ok(parent), Ok(node)) = (Uuid::parse_str(parts[0]), Uuid::parse_str(parts[1])) {
                return Self { parent, node };
            }
        } else if let Some(Ok(node)) = parts.first().map(|p| Uuid::parse_str(p)) {
            return Self {
                parent: Uuid::nil(),
                node,
            };
        }
        Self::default()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.parent, self.node)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
