//! Entity type descriptors
//!
//! [`EntityType`] is the persisted, serializable form of a type definition.
//! The live catalog that produces these lives in [`crate::behaviors`].

use super::GeoSpatialType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UI section shown when editing an entity of a given type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeSection {
    pub id: Uuid,
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub sections: Vec<EntityTypeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityType {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub system_type: bool,
    pub visible: bool,
    pub copyable: bool,
    pub movable: bool,
    pub spatial_type: Option<GeoSpatialType>,
    #[serde(default)]
    pub sections: Vec<EntityTypeSection>,
    /// Type ids that may be nested under this type
    #[serde(default)]
    pub children: Vec<Uuid>,
}

impl EntityType {
    pub fn allows_child(&self, type_id: Uuid) -> bool {
        self.children.contains(&type_id)
    }
}
