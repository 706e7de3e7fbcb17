//! Entity type registry
//!
//! Live lookup over the code-defined catalog plus the enrichment entry point
//! used by the entity service. Construction through [`EntityTypeRegistry::connect`]
//! reconciles the persisted catalog so stored descriptors always match code.

use super::{enrich, EntityKind};
use crate::db::{EntityCollection, TypeCatalogStore};
use crate::models::{EntityNode, EntityType};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct EntityTypeRegistry {
    types: HashMap<Uuid, EntityType>,
    nodes: Arc<dyn EntityCollection>,
}

impl EntityTypeRegistry {
    /// Build the registry without touching the persisted catalog
    pub fn new(nodes: Arc<dyn EntityCollection>) -> Self {
        let types = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind.id(), kind.entity_type()))
            .collect();
        Self { types, nodes }
    }

    /// Build the registry and upsert every type into `catalog`
    pub async fn connect(nodes: Arc<dyn EntityCollection>, catalog: &dyn TypeCatalogStore) -> Result<Self> {
        let registry = Self::new(nodes);
        registry.reconcile(catalog).await?;
        Ok(registry)
    }

    /// Overwrite the persisted catalog with the code-defined one
    ///
    /// Returns how many types were newly inserted.
    pub async fn reconcile(&self, catalog: &dyn TypeCatalogStore) -> Result<usize> {
        let mut inserted = 0;
        for entity_type in self.get_all() {
            let name = entity_type.name.clone();
            if catalog
                .upsert_type(entity_type.clone())
                .await
                .with_context(|| format!("Failed to register entity type {name}"))?
            {
                inserted += 1;
            }
        }
        tracing::info!(
            inserted,
            total = self.types.len(),
            "Entity type catalog reconciled"
        );
        Ok(inserted)
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<&EntityType> {
        self.types.get(&id)
    }

    /// Every type, in catalog order
    pub fn get_all(&self) -> Vec<&EntityType> {
        EntityKind::ALL
            .iter()
            .filter_map(|kind| self.types.get(&kind.id()))
            .collect()
    }

    /// Types that list `type_id` among their legal children
    pub fn get_parent_types_by_type_id(&self, type_id: Uuid) -> Vec<&EntityType> {
        self.get_all()
            .into_iter()
            .filter(|t| t.allows_child(type_id))
            .collect()
    }

    pub fn kind_of(&self, type_id: Uuid) -> Option<EntityKind> {
        EntityKind::from_type_id(type_id)
    }

    /// Unknown types count as visible
    pub fn is_visible(&self, type_id: Uuid) -> bool {
        self.get_by_id(type_id).map(|t| t.visible).unwrap_or(true)
    }

    /// Run the node through its type's enrichment rule
    ///
    /// Nodes of an unregistered type are returned unchanged.
    pub async fn modify_by_type(&self, node: EntityNode, intersection: Option<Uuid>) -> Result<EntityNode> {
        match self.kind_of(node.entity_type.id) {
            Some(kind) => enrich(kind, node, intersection, self.nodes.as_ref()).await,
            None => {
                tracing::debug!(
                    type_id = %node.entity_type.id,
                    "No enrichment rule for unregistered type"
                );
                Ok(node)
            }
        }
    }
}
