//! External system synchronization
//!
//! Upserts corridor and intersection records keyed by external id. Corridors
//! are applied before intersections, so an intersection first seen in a
//! payload joins its corridors on the following sync.

use super::{EntityService, EntityServiceError};
use crate::behaviors::EntityKind;
use crate::models::{CorridorSyncModel, EntityNode, EntitySync, SpatIntersectionModel};
use std::collections::HashMap;
use uuid::Uuid;

impl EntityService {
    /// Apply an external payload to the tree
    ///
    /// Returns whether the payload carried any records.
    pub async fn sync(&self, sync: &EntitySync) -> Result<bool, EntityServiceError> {
        tracing::info!(
            system = %sync.external_system_id,
            corridors = sync.corridors.len(),
            intersections = sync.intersections.len(),
            "Syncing external entities"
        );

        if !sync.corridors.is_empty() {
            self.sync_corridors(&sync.corridors).await?;
        }
        if !sync.intersections.is_empty() {
            self.sync_intersections(&sync.intersections).await?;
        }
        Ok(!sync.is_empty())
    }

    async fn sync_corridors(&self, corridors: &[CorridorSyncModel]) -> Result<(), EntityServiceError> {
        let corridor_type = EntityKind::Corridor.name();
        let external_ids: Vec<String> = corridors.iter().map(CorridorSyncModel::external_id).collect();
        let existing = by_external_id(
            self.store
                .get_nodes_by_external_ids(&external_ids)
                .await?
                .into_iter()
                .filter(|n| n.type_name() == corridor_type),
        );

        let member_ids: Vec<String> = corridors
            .iter()
            .flat_map(|c| c.intersections.iter().map(i64::to_string))
            .collect();
        let signal_type = EntityKind::Signal.name();
        let members: Vec<EntityNode> = self
            .store
            .get_nodes_by_external_ids(&member_ids)
            .await?
            .into_iter()
            .filter(|n| n.type_name() == signal_type && !n.is_deleted)
            .collect();

        for corridor in corridors {
            let ordered = corridor.ordered_members(&members);
            match existing.get(&corridor.external_id()) {
                None => {
                    if ordered.is_empty() {
                        tracing::debug!(corridor = corridor.id, "Skipping new corridor without known members");
                        continue;
                    }
                    let node = self.add(corridor.to_new_node()).await?;
                    for member in &ordered {
                        self.copy(&member.to_projection(member.parent), node.id).await?;
                    }
                }
                Some(node) if corridor.is_deleted => {
                    self.delete(node.id).await?;
                }
                Some(node) => {
                    let mut node = self.revive(node).await?;
                    corridor.apply_to(&mut node);
                    let node = self.update(node).await?;

                    for member in ordered.iter().filter(|m| !node.children.iter().any(|c| c.id == m.id)) {
                        self.copy(&member.to_projection(member.parent), node.id).await?;
                    }

                    let order: Vec<Uuid> = ordered.iter().map(|m| m.id).collect();
                    let mut uow = self.store.begin();
                    self.store.set_children_order(&mut uow, node.id, order);
                    uow.save_changes().await?;
                }
            }
        }
        Ok(())
    }

    async fn sync_intersections(&self, intersections: &[SpatIntersectionModel]) -> Result<(), EntityServiceError> {
        let external_ids: Vec<String> = intersections
            .iter()
            .filter_map(SpatIntersectionModel::external_id)
            .collect();
        let signal_type = EntityKind::Signal.name();
        let existing = by_external_id(
            self.store
                .get_nodes_by_external_ids(&external_ids)
                .await?
                .into_iter()
                .filter(|n| n.type_name() == signal_type),
        );

        for intersection in intersections {
            let Some(external_id) = intersection.external_id() else {
                tracing::debug!(id = %intersection.id, "Skipping intersection without external id");
                continue;
            };
            match existing.get(&external_id) {
                None => {
                    self.add(intersection.to_new_node()).await?;
                }
                Some(node) if intersection.is_deleted => {
                    self.delete(node.id).await?;
                }
                Some(node) => {
                    let mut node = self.revive(node).await?;
                    intersection.apply_to(&mut node);
                    self.update(node).await?;
                }
            }
        }
        Ok(())
    }

    /// Bring back a node the external system lists as active again
    async fn revive(&self, node: &EntityNode) -> Result<EntityNode, EntityServiceError> {
        if node.is_deleted {
            self.restore(node.id).await
        } else {
            Ok(node.clone())
        }
    }
}

fn by_external_id(nodes: impl IntoIterator<Item = EntityNode>) -> HashMap<String, EntityNode> {
    nodes
        .into_iter()
        .filter_map(|n| n.external_id.clone().map(|id| (id, n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCollection;
    use anyhow::Result;
    use std::sync::Arc;

    fn spat(clarity_id: i64, name: &str) -> SpatIntersectionModel {
        SpatIntersectionModel {
            id: Uuid::new_v4(),
            clarity_id: Some(clarity_id),
            spat_id: Some(clarity_id as i32),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_payload_returns_false() -> Result<()> {
        let service = EntityService::new(Arc::new(MemoryCollection::new()));
        assert!(!service.sync(&EntitySync::default()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_intersections_create_update_delete() -> Result<()> {
        let service = EntityService::new(Arc::new(MemoryCollection::new()));
        let payload = EntitySync {
            intersections: vec![spat(10, "First"), spat(11, "Second")],
            ..Default::default()
        };
        assert!(service.sync(&payload).await?);
        assert_eq!(service.get_nodes_by_type("Signal").await?.len(), 2);

        let mut renamed = spat(10, "First Renamed");
        let mut removed = spat(11, "Second");
        removed.is_deleted = true;
        renamed.spat_id = Some(99);
        service
            .sync(&EntitySync {
                intersections: vec![renamed, removed],
                ..Default::default()
            })
            .await?;

        let live = service.get_nodes_by_type("Signal").await?;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].name, "First Renamed");
        assert_eq!(live[0].id_mapping, Some(99));
        Ok(())
    }

    #[tokio::test]
    async fn test_active_record_restores_deleted_node() -> Result<()> {
        let service = EntityService::new(Arc::new(MemoryCollection::new()));
        let payload = EntitySync {
            intersections: vec![spat(20, "Back Again")],
            ..Default::default()
        };
        service.sync(&payload).await?;
        let signal = service.get_nodes_by_type("Signal").await?.remove(0);
        service.delete(signal.id).await?;

        service.sync(&payload).await?;
        let stored = service.get_by_id(signal.id).await?.expect("signal");
        assert!(!stored.is_deleted);
        let root = service.get_by_id(stored.parent).await?.expect("root");
        assert!(!root.is_leaf);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_corridor_without_members_is_skipped() -> Result<()> {
        let service = EntityService::new(Arc::new(MemoryCollection::new()));
        let payload = EntitySync {
            corridors: vec![CorridorSyncModel {
                id: 7,
                name: "Empty".to_string(),
                is_deleted: false,
                intersections: vec![1, 2],
            }],
            ..Default::default()
        };
        assert!(service.sync(&payload).await?);
        assert!(service.get_nodes_by_type("Corridor").await?.is_empty());
        Ok(())
    }
}
