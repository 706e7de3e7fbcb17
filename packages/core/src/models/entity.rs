//! Entity summaries
//!
//! An [`Entity`] is the lightweight record a parent embeds in its `children`
//! list for every child. It carries only the fields needed to render a tree
//! level without loading each child document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_version() -> i32 {
    -1
}

fn default_true() -> bool {
    true
}

/// Snapshot of an entity type reference (id plus display name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeId {
    pub id: Uuid,
    pub name: String,
}

impl EntityTypeId {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Owning jurisdiction of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    pub id: Uuid,
    pub name: String,
}

/// Child summary embedded in a parent's `children`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(rename = "type", default)]
    pub entity_type: EntityTypeId,
    pub jurisdiction: Option<Jurisdiction>,
    #[serde(default)]
    pub is_copy: bool,
    #[serde(default = "default_true")]
    pub is_leaf: bool,
}

impl Default for Entity {
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
        }
    }
}
