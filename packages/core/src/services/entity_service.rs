//! Entity Service
//!
//! Orchestrates the type registry and the tree store. Every mutation here is
//! a short sequence of unit-of-work commits:
//!
//! 1. derive geometry through the type registry (never trusting caller
//!    geometry)
//! 2. queue the node write and its parent fan-out on a unit of work, commit
//! 3. re-derive the leaf flag of any parent whose child set changed, commit
//! 4. notify observers
//!
//! A failed commit stops the sequence and is returned as
//! [`EntityServiceError::Commit`]; later steps (leaf maintenance,
//! notifications) are skipped. Nothing is rolled back.
//!
//! # Lifecycle
//!
//! Nodes are created by [`EntityService::add`], changed by update, move and
//! copy, and soft-deleted by [`EntityService::delete`], which cascades to the
//! node's own (non-copy) children first. Soft-deleted nodes can be brought
//! back with [`EntityService::restore`].
//!
//! # Example
//!
//! ```no_run
//! # use entitree_core::behaviors::EntityKind;
//! # use entitree_core::db::MemoryCollection;
//! # use entitree_core::models::EntityNode;
//! # use entitree_core::services::EntityService;
//! # use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let service = EntityService::new(Arc::new(MemoryCollection::new()));
//!
//! // Lands under the default System root, created on first use
//! let corridor = service
//!     .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
//!     .await?;
//! println!("Added {} under {}", corridor.name, corridor.parent);
//! # Ok(())
//! # }
//! ```

use super::{EntityServiceError, EntityUpdates};
use crate::behaviors::{EntityKind, EntityTypeRegistry};
use crate::config::EntityServiceConfig;
use crate::db::{EntityCollection, MoveDirection, TreeStore, TypeCatalogStore};
use crate::models::{EntityNode, EntityNodeProjection};
use futures::future::BoxFuture;
use geo::{LineString, Point};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub struct EntityService {
    pub(super) store: TreeStore,
    pub(super) types: EntityTypeRegistry,
    updates: EntityUpdates,
    pub(super) config: EntityServiceConfig,
}

impl EntityService {
    /// Service over `collection` with default configuration and no observers
    ///
    /// The persisted type catalog is left untouched; use
    /// [`EntityService::connect`] to reconcile it.
    pub fn new(collection: Arc<dyn EntityCollection>) -> Self {
        Self {
            store: TreeStore::new(collection.clone()),
            types: EntityTypeRegistry::new(collection),
            updates: EntityUpdates::new(),
            config: EntityServiceConfig::default(),
        }
    }

    /// Build the service and reconcile the type catalog
    pub async fn connect(
        collection: Arc<dyn EntityCollection>,
        catalog: &dyn TypeCatalogStore,
        config: EntityServiceConfig,
        updates: EntityUpdates,
    ) -> Result<Self, EntityServiceError> {
        let types = EntityTypeRegistry::connect(collection.clone(), catalog).await?;
        Ok(Self {
            store: TreeStore::new(collection),
            types,
            updates,
            config,
        })
    }

    pub fn with_config(mut self, config: EntityServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_updates(mut self, updates: EntityUpdates) -> Self {
        self.updates = updates;
        self
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn types(&self) -> &EntityTypeRegistry {
        &self.types
    }

    pub fn config(&self) -> &EntityServiceConfig {
        &self.config
    }

    //
    // MUTATIONS
    //

    /// Add a node under its own `parent`
    ///
    /// A non-System node without a parent goes under the first root System,
    /// creating one named after `default_root_name` if the tree is empty. If a
    /// node with the same id already exists in that case, it is returned
    /// as-is.
    pub async fn add(&self, node: EntityNode) -> Result<EntityNode, EntityServiceError> {
        let parent = node.parent;
        self.add_under(parent, node).await
    }

    /// Add a node under `parent`
    pub async fn add_under(&self, parent: Uuid, mut node: EntityNode) -> Result<EntityNode, EntityServiceError> {
        let mut parent = parent;
        if parent.is_nil() && node.type_name() != EntityKind::System.name() {
            if let Some(existing) = self.store.get_by_id(node.id).await? {
                return Ok(existing);
            }
            parent = self.default_root().await?.id;
        }

        if !parent.is_nil() && self.store.get_by_id(parent).await?.is_none() {
            return Err(EntityServiceError::node_not_found(parent));
        }

        node.parent = parent;
        if !parent.is_nil() && !node.parents.contains(&parent) {
            node.parents.push(parent);
        }
        let intersection = self.store.get_intersection_parent_node(&node).await?;
        let mut node = self
            .types
            .modify_by_type(node, intersection.map(|i| i.id))
            .await?;

        let mut uow = self.store.begin();
        self.store.create(&mut uow, parent, &mut node);
        uow.save_changes().await?;
        tracing::debug!(entity = %node.id, parent = %parent, "Entity added");

        self.updates.add(self, &node).await?;
        if !parent.is_nil() {
            self.refresh_leaf(parent).await?;
        }
        Ok(node)
    }

    /// Re-derive geometry and persist caller-editable fields
    ///
    /// Structure (parent, parents, children) and lifecycle flags (leaf,
    /// deleted) are kept from the stored document; use move, copy, delete and
    /// restore to change them.
    pub async fn update(&self, node: EntityNode) -> Result<EntityNode, EntityServiceError> {
        let Some(existing) = self.store.get_by_id(node.id).await? else {
            return Err(EntityServiceError::invalid_operation(format!(
                "Entity {} couldn't be updated because the entity doesn't exist",
                node.name
            )));
        };

        let is_leaf = existing.active_children().next().is_none();
        let node = EntityNode {
            is_leaf,
            is_deleted: existing.is_deleted,
            parent: existing.parent,
            parents: existing.parents,
            children: existing.children,
            version: existing.version.max(0) + 1,
            ..node
        };
        let intersection = self.store.get_intersection_parent_node(&node).await?;
        let node = self
            .types
            .modify_by_type(node, intersection.map(|i| i.id))
            .await?;

        let mut uow = self.store.begin();
        self.store.edit(&mut uow, &node);
        uow.save_changes().await?;

        self.updates.update(self, &node).await?;
        Ok(node)
    }

    /// Soft-delete a node and, first, its own non-copy children
    ///
    /// Deleting a node that does not exist, or is already deleted, succeeds.
    pub async fn delete(&self, id: Uuid) -> Result<bool, EntityServiceError> {
        let mut visiting = HashSet::new();
        self.delete_subtree(id, &mut visiting).await
    }

    fn delete_subtree<'a>(
        &'a self,
        id: Uuid,
        visiting: &'a mut HashSet<Uuid>,
    ) -> BoxFuture<'a, Result<bool, EntityServiceError>> {
        Box::pin(async move {
            // cyclic child links
            if !visiting.insert(id) {
                return Ok(true);
            }
            let Some(node) = self.store.get_by_id(id).await? else {
                return Ok(true);
            };
            if node.is_deleted {
                return Ok(true);
            }

            let owned: Vec<Uuid> = node
                .children
                .iter()
                .filter(|c| !c.is_copy && !c.is_deleted)
                .map(|c| c.id)
                .collect();
            for child in owned {
                self.delete_subtree(child, visiting).await?;
            }

            // children rewrote our summaries, reload before writing
            let Some(mut node) = self.store.get_by_id(id).await? else {
                return Ok(true);
            };
            let mut uow = self.store.begin();
            self.store.soft_delete(&mut uow, &mut node);
            uow.save_changes().await?;
            tracing::debug!(entity = %node.id, "Entity soft-deleted");

            self.updates.delete(self, &node).await?;
            if !node.parent.is_nil() {
                self.refresh_leaf(node.parent).await?;
            }
            Ok(true)
        })
    }

    /// Clear the soft-delete flag on a node
    pub async fn restore(&self, id: Uuid) -> Result<EntityNode, EntityServiceError> {
        let mut node = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| EntityServiceError::node_not_found(id))?;
        if !node.is_deleted {
            return Ok(node);
        }

        let mut uow = self.store.begin();
        self.store.restore(&mut uow, &mut node);
        uow.save_changes().await?;

        self.updates.update(self, &node).await?;
        if !node.parent.is_nil() {
            self.refresh_leaf(node.parent).await?;
        }
        Ok(node)
    }

    /// Link `node` under an additional parent
    pub async fn copy(
        &self,
        node: &EntityNodeProjection,
        parent: Uuid,
    ) -> Result<EntityNodeProjection, EntityServiceError> {
        let copied = self.store.copy(node, parent).await?;
        self.refresh_leaf(parent).await?;
        Ok(copied)
    }

    /// Make `new_parent` the node's primary parent
    pub async fn move_node(
        &self,
        node: &EntityNodeProjection,
        new_parent: Uuid,
    ) -> Result<EntityNodeProjection, EntityServiceError> {
        let old_parent = self.store.get_by_id(node.id).await?.map(|n| n.parent);
        let moved = self.store.move_node(node, new_parent).await?;

        if let Some(old_parent) = old_parent.filter(|p| *p != new_parent) {
            if !old_parent.is_nil() {
                self.refresh_leaf(old_parent).await?;
            }
            self.refresh_leaf(new_parent).await?;
        }
        Ok(moved)
    }

    pub async fn move_up(&self, instance_id: &str) -> Result<Option<EntityNodeProjection>, EntityServiceError> {
        Ok(self.store.move_child(instance_id, MoveDirection::Up).await?)
    }

    pub async fn move_down(&self, instance_id: &str) -> Result<Option<EntityNodeProjection>, EntityServiceError> {
        Ok(self.store.move_child(instance_id, MoveDirection::Down).await?)
    }

    /// Persist the parent's leaf flag if its active children say otherwise
    async fn refresh_leaf(&self, parent: Uuid) -> Result<(), EntityServiceError> {
        let Some(mut node) = self.store.get_by_id(parent).await? else {
            return Ok(());
        };
        let is_leaf = node.active_children().next().is_none();
        if node.is_leaf == is_leaf {
            return Ok(());
        }

        node.is_leaf = is_leaf;
        let mut uow = self.store.begin();
        self.store.edit(&mut uow, &node);
        uow.save_changes().await?;

        self.updates.update(self, &node).await
    }

    /// First live root, creating the default one when there is none
    async fn default_root(&self) -> Result<EntityNode, EntityServiceError> {
        if let Some(root) = self.store.find_root_nodes().await?.into_iter().next() {
            return Ok(root);
        }
        self.create_root(&self.config.default_root_name).await
    }

    async fn create_root(&self, name: &str) -> Result<EntityNode, EntityServiceError> {
        let mut root = EntityNode::new(EntityKind::System.type_id(), name);
        let mut uow = self.store.begin();
        self.store.create(&mut uow, Uuid::nil(), &mut root);
        uow.save_changes().await?;
        self.updates.add(self, &root).await?;
        Ok(root)
    }

    //
    // QUERIES
    //

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<EntityNode>, EntityServiceError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_by_ids(ids).await?)
    }

    pub async fn get_types(&self) -> Result<Vec<String>, EntityServiceError> {
        Ok(self.store.get_types().await?)
    }

    pub async fn get_nodes_by_type(&self, type_name: &str) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_nodes_by_type(type_name).await?)
    }

    pub async fn get_nodes_by_types(&self, type_names: &[String]) -> Result<Vec<EntityNodeProjection>, EntityServiceError> {
        Ok(self.store.get_nodes_by_types(type_names).await?)
    }

    /// Live nodes of every type that may contain `type_id`
    pub async fn get_possible_parent_nodes_by_type(
        &self,
        type_id: Uuid,
    ) -> Result<Vec<EntityNodeProjection>, EntityServiceError> {
        let names: Vec<String> = self
            .types
            .get_parent_types_by_type_id(type_id)
            .into_iter()
            .map(|t| t.name.clone())
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }
        self.get_nodes_by_types(&names).await
    }

    pub async fn search(&self, text: &str) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.search(text).await?)
    }

    pub async fn get_all(&self) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_all_deleted(&self) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_all_deleted().await?)
    }

    /// Root Systems, bootstrapping one if the tree has none
    pub async fn get_root_nodes(&self) -> Result<Vec<EntityNodeProjection>, EntityServiceError> {
        let roots = self.store.get_root_nodes().await?;
        if !roots.is_empty() {
            return Ok(roots);
        }

        tracing::info!("No entities found in the database. Adding default system.");
        self.create_root(&self.config.bootstrap_root_name).await?;
        Ok(self.store.get_root_nodes().await?)
    }

    pub async fn get_expanded_nodes(&self, instance_ids: &[String]) -> Result<Vec<EntityNodeProjection>, EntityServiceError> {
        Ok(self.store.get_expanded_nodes(instance_ids).await?)
    }

    pub async fn get_node(&self, instance_id: &str) -> Result<Option<EntityNodeProjection>, EntityServiceError> {
        Ok(self.store.get_node(instance_id).await?)
    }

    pub async fn get_by_intersection_id(&self, intersection: Uuid) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_nodes_by_intersection_id(intersection).await?)
    }

    pub async fn get_by_intersection_id_map(&self, id_mapping: i32) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.get_nodes_by_intersection_id_map(id_mapping).await?)
    }

    pub async fn query_within_radius_miles(&self, point: Point<f64>, miles: f64) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.query_within_radius_miles(point, miles).await?)
    }

    pub async fn query_intersecting_geo_fences(&self, point: Point<f64>) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.query_intersecting_geo_fences(point).await?)
    }

    pub async fn query_intersecting_geo_fences_by_type(
        &self,
        point: Point<f64>,
        type_name: &str,
    ) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self
            .store
            .query_intersecting_geo_fences_by_type(type_name, point)
            .await?)
    }

    pub async fn query_intersecting_by_type(
        &self,
        route: &LineString<f64>,
        type_name: &str,
    ) -> Result<Vec<EntityNode>, EntityServiceError> {
        Ok(self.store.query_intersecting_by_type(type_name, route).await?)
    }

    //
    // VIEW FILTERS
    //

    fn invisible_types(&self) -> HashSet<Uuid> {
        self.types
            .get_all()
            .into_iter()
            .filter(|t| !t.visible)
            .map(|t| t.id)
            .collect()
    }

    /// Drop nodes of invisible types and invisible child summaries
    pub fn remove_invisible_types(&self, nodes: Vec<EntityNode>) -> Vec<EntityNode> {
        let hidden = self.invisible_types();
        nodes
            .into_iter()
            .filter(|n| !hidden.contains(&n.entity_type.id))
            .map(|n| strip_node(n, &hidden))
            .collect()
    }

    /// Drop invisible child summaries from one node
    pub fn remove_invisible_types_from_node(&self, node: EntityNode) -> EntityNode {
        strip_node(node, &self.invisible_types())
    }

    /// Drop projections of invisible types, at every depth
    pub fn remove_invisible_projections(&self, projections: Vec<EntityNodeProjection>) -> Vec<EntityNodeProjection> {
        let hidden = self.invisible_types();
        strip_projections(projections, &hidden)
    }

    /// Drop invisible children, at every depth, from one projection
    pub fn remove_invisible_types_from_projection(&self, mut projection: EntityNodeProjection) -> EntityNodeProjection {
        let hidden = self.invisible_types();
        projection.children = strip_projections(std::mem::take(&mut projection.children), &hidden);
        projection
    }
}

fn strip_node(mut node: EntityNode, hidden: &HashSet<Uuid>) -> EntityNode {
    node.children.retain(|c| !hidden.contains(&c.entity_type.id));
    node
}

fn strip_projections(projections: Vec<EntityNodeProjection>, hidden: &HashSet<Uuid>) -> Vec<EntityNodeProjection> {
    projections
        .into_iter()
        .filter(|p| !hidden.contains(&p.entity_type.id))
        .map(|mut p| {
            p.children = strip_projections(std::mem::take(&mut p.children), hidden);
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCollection;
    use crate::models::{Entity, InstanceId};
    use anyhow::Result;

    fn service() -> EntityService {
        EntityService::new(Arc::new(MemoryCollection::new()))
    }

    #[tokio::test]
    async fn test_add_without_parent_creates_default_root() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;

        let root = service.get_by_id(corridor.parent).await?.expect("root");
        assert_eq!(root.name, "Default System");
        assert_eq!(root.type_name(), "System");
        assert!(root.is_root());
        assert!(!root.is_leaf);
        assert_eq!(root.children.iter().filter(|c| c.id == corridor.id).count(), 1);

        // a second parentless add reuses the root
        let other = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Broadway"))
            .await?;
        assert_eq!(other.parent, root.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_existing_id_without_parent_returns_existing() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;
        let again = service
            .add(EntityNode {
                name: "Changed".to_string(),
                parent: Uuid::nil(),
                ..corridor.clone()
            })
            .await?;
        assert_eq!(again.name, "Main St");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_under_missing_parent() -> Result<()> {
        let service = service();
        let missing = Uuid::new_v4();
        let err = service
            .add_under(missing, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await
            .unwrap_err();
        assert!(matches!(err, EntityServiceError::NodeNotFound { id } if id == missing));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_node_is_descriptive() -> Result<()> {
        let service = service();
        let err = service
            .update(EntityNode::new(EntityKind::Signal.type_id(), "Ghost"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Entity Ghost couldn't be updated because the entity doesn't exist"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_structure_and_bumps_version() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;
        service
            .add_under(corridor.id, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await?;

        let updated = service
            .update(EntityNode {
                name: "Main Street".to_string(),
                children: Vec::new(),
                ..corridor.clone()
            })
            .await?;
        assert_eq!(updated.version, 2);
        assert_eq!(updated.children.len(), 1);

        let root = service.get_by_id(corridor.parent).await?.expect("root");
        assert_eq!(root.children[0].name, "Main Street");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rederives_leaf_flag() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;
        service
            .add_under(corridor.id, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await?;

        let stored = service.get_by_id(corridor.id).await?.expect("corridor");
        let updated = service.update(EntityNode { is_leaf: true, ..stored }).await?;
        assert!(!updated.is_leaf);
        assert!(!service.get_by_id(corridor.id).await?.expect("corridor").is_leaf);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_cannot_soft_delete() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;
        let signal = service
            .add_under(corridor.id, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await?;

        let stored = service.get_by_id(corridor.id).await?.expect("corridor");
        let updated = service.update(EntityNode { is_deleted: true, ..stored }).await?;
        assert!(!updated.is_deleted);

        let corridor = service.get_by_id(corridor.id).await?.expect("corridor");
        assert!(!corridor.is_deleted);
        assert!(!service.get_by_id(signal.id).await?.expect("signal").is_deleted);
        let root = service.get_by_id(corridor.parent).await?.expect("root");
        assert!(root.children.iter().all(|c| !c.is_deleted));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_restore_round_trip() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "Main St"))
            .await?;
        let root_id = corridor.parent;

        assert!(service.delete(corridor.id).await?);
        assert!(service.get_by_id(root_id).await?.expect("root").is_leaf);

        let restored = service.restore(corridor.id).await?;
        assert!(!restored.is_deleted);
        assert!(!service.get_by_id(root_id).await?.expect("root").is_leaf);
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_then_move() -> Result<()> {
        let service = service();
        let a = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "A"))
            .await?;
        let b = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "B"))
            .await?;
        let signal = service
            .add_under(a.id, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await?;

        let copy = service.copy(&signal.to_projection(a.id), b.id).await?;
        assert!(copy.is_copy);
        assert_eq!(copy.instance(), InstanceId::new(b.id, signal.id));
        assert!(!service.get_by_id(b.id).await?.expect("b").is_leaf);

        let c = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "C"))
            .await?;
        service.move_node(&signal.to_projection(a.id), c.id).await?;
        assert!(service.get_by_id(a.id).await?.expect("a").is_leaf);
        assert!(!service.get_by_id(c.id).await?.expect("c").is_leaf);
        Ok(())
    }

    #[tokio::test]
    async fn test_possible_parents() -> Result<()> {
        let service = service();
        let corridor = service
            .add(EntityNode::new(EntityKind::Corridor.type_id(), "A"))
            .await?;
        service
            .add_under(corridor.id, EntityNode::new(EntityKind::Signal.type_id(), "S"))
            .await?;

        let parents = service
            .get_possible_parent_nodes_by_type(EntityKind::Rsu.id())
            .await?;
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].name, "S");
        Ok(())
    }

    #[test]
    fn test_remove_invisible_types() {
        let service = service();
        let speed = EntityNode::new(EntityKind::SpeedSegment.type_id(), "Speed");
        let mut corridor = EntityNode::new(EntityKind::Corridor.type_id(), "A");
        corridor.children.push(Entity {
            id: speed.id,
            entity_type: EntityKind::SpeedSegment.type_id(),
            ..Default::default()
        });

        let visible = service.remove_invisible_types(vec![speed.clone(), corridor.clone()]);
        assert_eq!(visible.len(), 1);
        assert!(visible[0].children.is_empty());

        let mut projection = corridor.to_projection(Uuid::nil());
        let mut child = corridor.to_projection(corridor.id);
        child.children = vec![speed.to_projection(corridor.id)];
        projection.children = vec![child];
        let filtered = service.remove_invisible_types_from_projection(projection);
        assert!(filtered.children[0].children.is_empty());
    }
}
