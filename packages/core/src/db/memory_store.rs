//! In-memory collection backend
//!
//! Keeps documents in insertion order behind a `tokio::sync::RwLock`. Every
//! update holds the write lock for its whole read-modify-write, which gives
//! the same per-document atomicity a document database provides. Used as the
//! default backend and as the test double for the service layer.

use super::collection::{geo_fence_intersects, nearest_first, GeoQuery, NodeFilter, NodeUpdate, UpdateResult};
use super::{EntityCollection, TypeCatalogStore};
use crate::models::{EntityNode, EntityType};
use anyhow::{bail, Result};
use async_trait::async_trait;
use geo::Point;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryCollection {
    nodes: RwLock<Vec<EntityNode>>,
    types: RwLock<Vec<EntityType>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl EntityCollection for MemoryCollection {
    async fn insert(&self, node: EntityNode) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        if nodes.iter().any(|n| n.id == node.id) {
            bail!("Duplicate key: entity {} already exists", node.id);
        }
        nodes.push(node);
        Ok(())
    }

    async fn replace(&self, node: EntityNode) -> Result<UpdateResult> {
        let mut nodes = self.nodes.write().await;
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => {
                let modified = *existing != node;
                *existing = node;
                Ok(UpdateResult {
                    matched: 1,
                    modified: u64::from(modified),
                })
            }
            None => Ok(UpdateResult::none()),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        let mut nodes = self.nodes.write().await;
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        Ok(nodes.len() != before)
    }

    async fn find(&self, filter: &NodeFilter) -> Result<Vec<EntityNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.iter().filter(|n| filter.matches(n)).cloned().collect())
    }

    async fn update_one(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult> {
        let mut nodes = self.nodes.write().await;
        match nodes.iter_mut().find(|n| filter.matches(n)) {
            Some(node) => Ok(UpdateResult {
                matched: 1,
                modified: u64::from(update.apply(node)),
            }),
            None => Ok(UpdateResult::none()),
        }
    }

    async fn update_many(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult> {
        let mut nodes = self.nodes.write().await;
        let mut result = UpdateResult::none();
        for node in nodes.iter_mut().filter(|n| filter.matches(n)) {
            result.matched += 1;
            if update.apply(node) {
                result.modified += 1;
            }
        }
        Ok(result)
    }

    async fn distinct_type_names(&self, filter: &NodeFilter) -> Result<Vec<String>> {
        let nodes = self.nodes.read().await;
        let names: BTreeSet<String> = nodes
            .iter()
            .filter(|n| filter.matches(n))
            .map(|n| n.entity_type.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn near(
        &self,
        center: Point<f64>,
        max_distance_m: f64,
        filter: &NodeFilter,
    ) -> Result<Vec<EntityNode>> {
        let nodes = self.nodes.read().await;
        Ok(nearest_first(
            nodes.iter().filter(|n| filter.matches(n)),
            center,
            max_distance_m,
        ))
    }

    async fn geo_fence_intersecting(&self, query: &GeoQuery, filter: &NodeFilter) -> Result<Vec<EntityNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .iter()
            .filter(|n| filter.matches(n) && geo_fence_intersects(n, query))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TypeCatalogStore for MemoryCollection {
    async fn get_type(&self, id: Uuid) -> Result<Option<EntityType>> {
        Ok(self.types.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn list_types(&self) -> Result<Vec<EntityType>> {
        Ok(self.types.read().await.clone())
    }

    async fn upsert_type(&self, entity_type: EntityType) -> Result<bool> {
        let mut types = self.types.write().await;
        match types.iter_mut().find(|t| t.id == entity_type.id) {
            Some(existing) => {
                *existing = entity_type;
                Ok(false)
            }
            None => {
                types.push(entity_type);
                Ok(true)
            }
        }
    }
}
