//! Tests for TreeStore

#[cfg(test)]
mod tests {
    use crate::behaviors::EntityKind;
    use crate::db::{DatabaseError, MemoryCollection, MoveDirection, TreeStore};
    use crate::models::{EntityNode, GeoJsonGeometry, GeoJsonPolygonFeature, InstanceId};
    use anyhow::Result;
    use geo::{point, polygon};
    use std::sync::Arc;
    use uuid::Uuid;

    fn store() -> TreeStore {
        TreeStore::new(Arc::new(MemoryCollection::new()))
    }

    async fn create(store: &TreeStore, parent: Uuid, kind: EntityKind, name: &str) -> Result<EntityNode> {
        let mut node = EntityNode::new(kind.type_id(), name);
        let mut uow = store.begin();
        store.create(&mut uow, parent, &mut node);
        uow.save_changes().await?;
        Ok(node)
    }

    #[tokio::test]
    async fn test_create_links_parent_and_child() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let corridor = create(&store, root.id, EntityKind::Corridor, "Main St").await?;

        assert!(root.parents.is_empty());
        assert_eq!(corridor.version, 1);
        assert_eq!(corridor.parents, vec![root.id]);

        let root = store.get_by_id(root.id).await?.expect("root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].id, corridor.id);
        assert!(!root.children[0].is_copy);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_under_missing_parent_fails_commit() -> Result<()> {
        let store = store();
        let mut node = EntityNode::new(EntityKind::Signal.type_id(), "Orphan");
        let mut uow = store.begin();
        store.create(&mut uow, Uuid::new_v4(), &mut node);

        let err = uow.save_changes().await.unwrap_err();
        assert!(matches!(err, DatabaseError::CommitFailed { applied: 1, total: 2, .. }));
        // the insert already ran
        assert!(store.get_by_id(node.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_patches_every_parent_summary() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;
        let mut signal = create(&store, a.id, EntityKind::Signal, "Signal").await?;
        store.copy(&signal.to_projection(a.id), b.id).await?;

        signal = store.get_by_id(signal.id).await?.expect("signal");
        signal.name = "Renamed".to_string();
        let mut uow = store.begin();
        store.edit(&mut uow, &signal);
        uow.save_changes().await?;

        for parent in [a.id, b.id] {
            let parent = store.get_by_id(parent).await?.expect("parent");
            assert_eq!(parent.children[0].name, "Renamed");
        }
        let b = store.get_by_id(b.id).await?.expect("b");
        assert!(b.children[0].is_copy);
        Ok(())
    }

    #[tokio::test]
    async fn test_hard_delete_pulls_from_parents() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let corridor = create(&store, root.id, EntityKind::Corridor, "A").await?;

        let mut uow = store.begin();
        store.delete(&mut uow, corridor.id);
        uow.save_changes().await?;

        assert!(store.get_by_id(corridor.id).await?.is_none());
        assert!(store.get_by_id(root.id).await?.expect("root").children.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore_flip_summary() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let mut corridor = create(&store, root.id, EntityKind::Corridor, "A").await?;

        let mut uow = store.begin();
        store.soft_delete(&mut uow, &mut corridor);
        uow.save_changes().await?;
        assert!(store.get_by_id(root.id).await?.expect("root").children[0].is_deleted);
        assert_eq!(store.get_all_deleted().await?.len(), 1);

        let mut uow = store.begin();
        store.restore(&mut uow, &mut corridor);
        uow.save_changes().await?;
        assert!(!store.get_by_id(root.id).await?.expect("root").children[0].is_deleted);
        assert!(store.get_all_deleted().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_move_node_repoints_parent() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;
        let signal = create(&store, a.id, EntityKind::Signal, "Signal").await?;

        let moved = store.move_node(&signal.to_projection(a.id), b.id).await?;
        assert_eq!(moved.parent, b.id);

        let a = store.get_by_id(a.id).await?.expect("a");
        let b = store.get_by_id(b.id).await?.expect("b");
        let signal = store.get_by_id(signal.id).await?.expect("signal");
        assert!(a.children.is_empty());
        assert_eq!(b.children[0].id, signal.id);
        assert_eq!(signal.parent, b.id);
        assert!(signal.parents.contains(&b.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_move_onto_copy_parent_clears_copy_flag() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;
        create(&store, b.id, EntityKind::Signal, "First").await?;
        let signal = create(&store, a.id, EntityKind::Signal, "Signal").await?;

        store.copy(&signal.to_projection(a.id), b.id).await?;
        store.move_node(&signal.to_projection(a.id), b.id).await?;

        let b = store.get_by_id(b.id).await?.expect("b");
        let linked: Vec<_> = b.children.iter().filter(|c| c.id == signal.id).collect();
        assert_eq!(linked.len(), 1);
        assert!(!linked[0].is_copy);
        assert_eq!(b.children[1].id, signal.id);
        assert!(store.get_by_id(a.id).await?.expect("a").children.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_move_missing_node_reports_name() -> Result<()> {
        let store = store();
        let ghost = EntityNode::new(EntityKind::Signal.type_id(), "Ghost");
        let err = store
            .move_node(&ghost.to_projection(Uuid::nil()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Entity Ghost couldn't be moved because the entity doesn't exist"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_move_child_swaps_with_neighbor() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;
        let c = create(&store, root.id, EntityKind::Corridor, "C").await?;

        let instance = InstanceId::new(root.id, c.id).to_string();
        let moved = store.move_child(&instance, MoveDirection::Up).await?;
        assert_eq!(moved.map(|p| p.id), Some(c.id));

        let order: Vec<Uuid> = store
            .get_by_id(root.id)
            .await?
            .expect("root")
            .children
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![a.id, c.id, b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_child_at_boundary_is_noop() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;

        store
            .move_child(&InstanceId::new(root.id, a.id).to_string(), MoveDirection::Up)
            .await?;
        store
            .move_child(&InstanceId::new(root.id, b.id).to_string(), MoveDirection::Down)
            .await?;

        let order: Vec<Uuid> = store
            .get_by_id(root.id)
            .await?
            .expect("root")
            .children
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![a.id, b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_child_skips_deleted_sibling() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let mut b = create(&store, root.id, EntityKind::Corridor, "B").await?;
        let c = create(&store, root.id, EntityKind::Corridor, "C").await?;

        let mut uow = store.begin();
        store.soft_delete(&mut uow, &mut b);
        uow.save_changes().await?;

        store
            .move_child(&InstanceId::new(root.id, c.id).to_string(), MoveDirection::Up)
            .await?;
        let order: Vec<Uuid> = store
            .get_by_id(root.id)
            .await?
            .expect("root")
            .children
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![c.id, a.id, b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_children_order() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let a = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let b = create(&store, root.id, EntityKind::Corridor, "B").await?;

        let mut uow = store.begin();
        store.set_children_order(&mut uow, root.id, vec![b.id, a.id]);
        uow.save_changes().await?;

        let root = store.get_by_id(root.id).await?.expect("root");
        assert_eq!(root.children[0].id, b.id);
        assert_eq!(root.children[1].id, a.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_expanded_nodes_require_valid_ids() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        create(&store, root.id, EntityKind::Corridor, "A").await?;

        let instance = InstanceId::new(Uuid::nil(), root.id).to_string();
        let expanded = store.get_expanded_nodes(&[instance.clone()]).await?;
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].children.len(), 1);

        let with_garbage = store
            .get_expanded_nodes(&[instance, "not-an-id".to_string()])
            .await?;
        assert!(with_garbage.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_intersection_parent_via_secondary_parent() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let corridor = create(&store, root.id, EntityKind::Corridor, "A").await?;
        let intersection = create(&store, root.id, EntityKind::Intersection, "1st & Main").await?;
        let signal = create(&store, corridor.id, EntityKind::Signal, "Signal").await?;
        store.copy(&signal.to_projection(corridor.id), intersection.id).await?;

        let signal = store.get_by_id(signal.id).await?.expect("signal");
        let found = store.get_intersection_parent_node(&signal).await?;
        assert_eq!(found.map(|n| n.id), Some(intersection.id));

        let none = store.get_intersection_parent_node(&corridor).await?;
        assert!(none.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_geo_fence_queries_skip_deleted() -> Result<()> {
        let store = store();
        let root = create(&store, Uuid::nil(), EntityKind::System, "System").await?;
        let fence = polygon![
            (x: -105.01, y: 39.99),
            (x: -104.99, y: 39.99),
            (x: -104.99, y: 40.01),
            (x: -105.01, y: 40.01),
        ];

        let mut live = EntityNode::new(EntityKind::Intersection.type_id(), "Live");
        live.geometry = GeoJsonGeometry::polygon(&fence);
        live.geo_fence = Some(GeoJsonPolygonFeature::new(&fence));
        let mut gone = live.clone();
        gone.id = Uuid::new_v4();
        gone.name = "Gone".to_string();
        gone.is_deleted = true;

        let mut uow = store.begin();
        store.create(&mut uow, root.id, &mut live);
        store.create(&mut uow, root.id, &mut gone);
        uow.save_changes().await?;

        let hits = store.query_intersecting_geo_fences(point!(x: -105.0, y: 40.0)).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, live.id);

        let typed = store
            .query_intersecting_geo_fences_by_type(EntityKind::Signal.name(), point!(x: -105.0, y: 40.0))
            .await?;
        assert!(typed.is_empty());
        Ok(())
    }
}
