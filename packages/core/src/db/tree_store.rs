//! Tree Store
//!
//! Persistence operations on the denormalized entity tree.
//!
//! # Architecture
//!
//! Every node document embeds an [`Entity`] summary of each child, and every
//! child lists its parents. A structural change therefore touches more than
//! one document: the node itself plus every parent that embeds it. The
//! mutation methods here never write directly. They queue the primary write
//! and the fan-out writes on a caller-supplied [`UnitOfWork`], and the caller
//! decides when to commit.
//!
//! Fan-out writes that must hit an existing document (adding a child to a
//! parent, repointing a child) fail their command when nothing matched, which
//! fails the commit. Nothing spans documents atomically, so a failed commit
//! can leave a node and its parents' summaries out of step.
//!
//! Reads exclude soft-deleted nodes unless the method says otherwise.

use super::collection::{GeoQuery, NodeFilter, NodeUpdate};
use super::{DatabaseError, EntityCollection, UnitOfWork};
use crate::behaviors::EntityKind;
use crate::geometry::miles_to_meters;
use crate::models::{Entity, EntityNode, EntityNodeProjection, InstanceId};
use anyhow::{Context, Result};
use geo::{LineString, Point};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Direction for [`TreeStore::move_child`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

pub struct TreeStore {
    collection: Arc<dyn EntityCollection>,
}

impl TreeStore {
    pub fn new(collection: Arc<dyn EntityCollection>) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Arc<dyn EntityCollection> {
        &self.collection
    }

    /// Start a unit of work against this store's collection
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new(self.collection.clone())
    }

    //
    // STRUCTURAL MUTATIONS (queued)
    //

    /// Queue insertion of `node` under `parent`
    ///
    /// Sets the primary parent and `version = 1` on `node` immediately and
    /// records `parent` in `parents`. A non-root node is also added to the
    /// parent's children.
    pub fn create(&self, uow: &mut UnitOfWork, parent: Uuid, node: &mut EntityNode) {
        node.parent = parent;
        node.version = 1;
        if !parent.is_nil() && !node.parents.contains(&parent) {
            node.parents.push(parent);
        }

        let document = node.clone();
        uow.add_command(format!("insert {}", node.id), move |c| async move {
            c.insert(document).await
        });

        if !parent.is_nil() {
            let summary = Entity {
                is_copy: false,
                ..node.to_entity()
            };
            self.add_to_parent(uow, parent, summary);
        }
    }

    /// Queue replacement of the node document and patch its summary in every parent
    pub fn edit(&self, uow: &mut UnitOfWork, node: &EntityNode) {
        let document = node.clone();
        let id = node.id;
        uow.add_command(format!("replace {id}"), move |c| async move {
            let result = c.replace(document).await?;
            if result.matched == 0 {
                return Err(DatabaseError::child_not_updated(id).into());
            }
            Ok(())
        });

        let summary = Entity {
            is_leaf: node.is_leaf,
            ..node.to_entity()
        };
        uow.add_command(format!("patch summaries of {id}"), move |c| async move {
            c.update_many(&NodeFilter::HasChild(id), &NodeUpdate::PatchChildSummary(summary))
                .await?;
            Ok(())
        });
    }

    /// Queue hard removal of a node and its summary from every parent
    pub fn delete(&self, uow: &mut UnitOfWork, id: Uuid) {
        uow.add_command(format!("pull {id} from all parents"), move |c| async move {
            c.update_many(&NodeFilter::HasChild(id), &NodeUpdate::PullChild(id))
                .await?;
            Ok(())
        });
        uow.add_command(format!("remove {id}"), move |c| async move {
            c.remove(id).await?;
            Ok(())
        });
    }

    pub fn soft_delete(&self, uow: &mut UnitOfWork, node: &mut EntityNode) {
        node.is_deleted = true;
        self.edit(uow, node);
    }

    pub fn restore(&self, uow: &mut UnitOfWork, node: &mut EntityNode) {
        node.is_deleted = false;
        self.edit(uow, node);
    }

    /// Queue adding `child` to the parent's children (no duplicate ids)
    pub fn add_to_parent(&self, uow: &mut UnitOfWork, parent: Uuid, child: Entity) {
        uow.add_command(format!("add {} to parent {parent}", child.id), move |c| async move {
            let result = c
                .update_one(&NodeFilter::Id(parent), &NodeUpdate::AddChild(child))
                .await?;
            if result.matched == 0 {
                return Err(DatabaseError::parent_not_updated(parent).into());
            }
            Ok(())
        });
    }

    /// Queue replacing the child's summary under `parent`, keeping its position
    fn promote_child(&self, uow: &mut UnitOfWork, parent: Uuid, child: Entity, position: usize) {
        uow.add_command(format!("promote {} under parent {parent}", child.id), move |c| async move {
            let update = NodeUpdate::Combine(vec![
                NodeUpdate::PullChild(child.id),
                NodeUpdate::InsertChildAt { child, position },
            ]);
            let result = c.update_one(&NodeFilter::Id(parent), &update).await?;
            if result.matched == 0 {
                return Err(DatabaseError::parent_not_updated(parent).into());
            }
            Ok(())
        });
    }

    /// Queue recording `parent` on the child's parents (idempotent)
    pub fn add_parent_to_child(&self, uow: &mut UnitOfWork, child: Uuid, parent: Uuid) {
        uow.add_command(format!("add parent {parent} to {child}"), move |c| async move {
            let result = c
                .update_one(&NodeFilter::Id(child), &NodeUpdate::AddParent(parent))
                .await?;
            if result.matched == 0 {
                return Err(DatabaseError::child_not_updated(child).into());
            }
            Ok(())
        });
    }

    /// Queue repointing the child's primary parent
    pub fn move_child_to_parent(&self, uow: &mut UnitOfWork, child: Uuid, parent: Uuid) {
        uow.add_command(format!("move {child} to parent {parent}"), move |c| async move {
            let update = NodeUpdate::Combine(vec![NodeUpdate::AddParent(parent), NodeUpdate::SetParent(parent)]);
            let result = c.update_one(&NodeFilter::Id(child), &update).await?;
            if result.matched == 0 {
                return Err(DatabaseError::child_not_updated(child).into());
            }
            Ok(())
        });
    }

    /// Queue pulling the child's summary out of one parent
    pub fn remove_from_parent(&self, uow: &mut UnitOfWork, child: Uuid, parent: Uuid) {
        uow.add_command(format!("remove {child} from parent {parent}"), move |c| async move {
            let result = c
                .update_one(&NodeFilter::Id(parent), &NodeUpdate::PullChild(child))
                .await?;
            if result.modified == 0 {
                return Err(DatabaseError::parent_not_updated(parent).into());
            }
            Ok(())
        });
    }

    /// Queue reordering of a node's children to follow `ordered`
    ///
    /// Children missing from `ordered` keep their relative order at the front.
    pub fn set_children_order(&self, uow: &mut UnitOfWork, id: Uuid, ordered: Vec<Uuid>) {
        uow.add_command(format!("reorder children of {id}"), move |c| async move {
            let mut node = c
                .find_by_id(id)
                .await?
                .ok_or_else(|| DatabaseError::child_not_updated(id))?;
            node.children.sort_by_key(|child| {
                ordered
                    .iter()
                    .position(|o| *o == child.id)
                    .map(|p| p as i64)
                    .unwrap_or(-1)
            });
            c.replace(node).await?;
            Ok(())
        });
    }

    //
    // SELF-COMMITTING STRUCTURAL OPERATIONS
    //

    /// Link an existing node under an additional parent as a copy
    pub async fn copy(&self, node: &EntityNodeProjection, parent: Uuid) -> Result<EntityNodeProjection, DatabaseError> {
        let existing = self
            .get_by_id(node.id)
            .await?
            .ok_or_else(|| DatabaseError::entity_missing(&node.name, "copied"))?;

        let summary = Entity {
            is_copy: true,
            ..existing.to_entity()
        };

        let mut uow = self.begin();
        self.add_to_parent(&mut uow, parent, summary);
        self.add_parent_to_child(&mut uow, existing.id, parent);
        uow.save_changes().await?;

        let mut projection = existing.to_projection(parent);
        projection.is_copy = true;
        Ok(projection)
    }

    /// Move a node under a new primary parent
    pub async fn move_node(
        &self,
        node: &EntityNodeProjection,
        new_parent: Uuid,
    ) -> Result<EntityNodeProjection, DatabaseError> {
        let existing = self
            .get_by_id(node.id)
            .await?
            .ok_or_else(|| DatabaseError::entity_missing(&node.name, "moved"))?;

        if existing.parent == new_parent {
            return Ok(existing.to_projection(new_parent));
        }

        let summary = Entity {
            is_copy: false,
            ..existing.to_entity()
        };
        let linked_at = self
            .get_by_id(new_parent)
            .await?
            .and_then(|p| p.children.iter().position(|c| c.id == existing.id));

        let mut uow = self.begin();
        match linked_at {
            // already linked as a copy; becomes the primary occurrence in place
            Some(position) => self.promote_child(&mut uow, new_parent, summary, position),
            None => self.add_to_parent(&mut uow, new_parent, summary),
        }
        if !existing.parent.is_nil() {
            self.remove_from_parent(&mut uow, existing.id, existing.parent);
        }
        self.move_child_to_parent(&mut uow, existing.id, new_parent);
        uow.save_changes().await?;

        let moved = self
            .get_by_id(existing.id)
            .await?
            .ok_or_else(|| DatabaseError::entity_missing(&node.name, "moved"))?;
        Ok(moved.to_projection(new_parent))
    }

    /// Swap a node past its nearest non-deleted sibling
    ///
    /// A node already first (up) or last (down) is left where it is.
    pub async fn move_child(
        &self,
        instance_id: &str,
        direction: MoveDirection,
    ) -> Result<Option<EntityNodeProjection>, DatabaseError> {
        let instance = InstanceId::parse(instance_id);
        if instance.node.is_nil() {
            return Ok(None);
        }
        let Some(node) = self.get_by_id(instance.node).await? else {
            return Ok(None);
        };
        let parent = self
            .get_by_id(instance.parent)
            .await?
            .ok_or_else(|| DatabaseError::move_out_of_bounds(&node.name))?;

        let children = &parent.children;
        let index = children
            .iter()
            .position(|c| c.id == node.id)
            .ok_or_else(|| DatabaseError::move_out_of_bounds(&node.name))?;

        let at_boundary = match direction {
            MoveDirection::Up => index == 0,
            MoveDirection::Down => index + 1 >= children.len(),
        };
        if at_boundary {
            return self.get_node(instance_id).await.map_err(DatabaseError::from);
        }

        let target = match direction {
            MoveDirection::Up => (0..index)
                .rev()
                .find(|i| !children[*i].is_deleted)
                .unwrap_or(index - 1),
            MoveDirection::Down => (index + 1..children.len())
                .find(|i| !children[*i].is_deleted)
                .unwrap_or(index + 1),
        };
        if target >= children.len() {
            return Err(DatabaseError::move_out_of_bounds(&node.name));
        }

        let child = children[index].clone();
        let parent_id = parent.id;
        let mut uow = self.begin();
        uow.add_command(format!("reposition {} in {parent_id}", child.id), move |c| async move {
            let update = NodeUpdate::Combine(vec![
                NodeUpdate::PullChild(child.id),
                NodeUpdate::InsertChildAt {
                    child,
                    position: target,
                },
            ]);
            let result = c.update_one(&NodeFilter::Id(parent_id), &update).await?;
            if result.matched == 0 {
                return Err(DatabaseError::parent_not_updated(parent_id).into());
            }
            Ok(())
        });
        uow.save_changes().await?;

        self.get_node(instance_id).await.map_err(DatabaseError::from)
    }

    //
    // READS
    //

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<EntityNode>> {
        self.collection
            .find_by_id(id)
            .await
            .with_context(|| format!("Failed to load entity {id}"))
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::IdIn(ids.to_vec()))
            .await
            .context("Failed to load entities by id")
    }

    /// Distinct type names in use
    pub async fn get_types(&self) -> Result<Vec<String>> {
        self.collection
            .distinct_type_names(&NodeFilter::All)
            .await
            .context("Failed to list entity types in use")
    }

    pub async fn search(&self, text: &str) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::text(text).and(NodeFilter::not_deleted()))
            .await
            .context("Failed to search entities")
    }

    pub async fn get_all(&self) -> Result<Vec<EntityNode>> {
        self.collection.find(&NodeFilter::not_deleted()).await
    }

    pub async fn get_all_deleted(&self) -> Result<Vec<EntityNode>> {
        self.collection.find(&NodeFilter::Deleted(true)).await
    }

    /// Nodes of a type, matched without regard to case
    pub async fn get_nodes_by_type(&self, type_name: &str) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::TypeNameIgnoreCase(type_name.to_string()).and(NodeFilter::not_deleted()))
            .await
    }

    /// Live System documents
    pub async fn find_root_nodes(&self) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::TypeName(EntityKind::System.name().to_string()).and(NodeFilter::not_deleted()))
            .await
    }

    /// Live System nodes as projections
    pub async fn get_root_nodes(&self) -> Result<Vec<EntityNodeProjection>> {
        let roots = self.find_root_nodes().await?;
        Ok(EntityNodeProjection::from_nodes(&roots, &[]))
    }

    /// Materialize the subtrees named by `instance_ids`
    ///
    /// Any instance id that does not name a node yields an empty result.
    pub async fn get_expanded_nodes(&self, instance_ids: &[String]) -> Result<Vec<EntityNodeProjection>> {
        let instances: Vec<InstanceId> = instance_ids.iter().map(|i| InstanceId::parse(i)).collect();
        if instances.is_empty() || instances.iter().any(|i| i.node.is_nil()) {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = instances.iter().map(|i| i.node).collect();
        let nodes = self.get_by_ids(&ids).await?;
        Ok(EntityNodeProjection::from_nodes(&nodes, &instances))
    }

    pub async fn get_nodes_by_types(&self, type_names: &[String]) -> Result<Vec<EntityNodeProjection>> {
        let nodes = self
            .collection
            .find(&NodeFilter::TypeNameIn(type_names.to_vec()).and(NodeFilter::not_deleted()))
            .await?;
        Ok(EntityNodeProjection::from_nodes(&nodes, &[]))
    }

    /// Nodes matched by external id, deleted ones included
    pub async fn get_nodes_by_external_ids(&self, external_ids: &[String]) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::ExternalIdIn(external_ids.to_vec()))
            .await
    }

    /// Nodes whose geometry is stamped with this intersection
    pub async fn get_nodes_by_intersection_id(&self, intersection: Uuid) -> Result<Vec<EntityNode>> {
        self.collection
            .find(&NodeFilter::IntersectionRef(intersection).and(NodeFilter::not_deleted()))
            .await
    }

    /// Nodes belonging to the intersection of the node with this device id mapping
    ///
    /// A Signal resolves through its stamped intersection. Any other type
    /// resolves through its own id.
    pub async fn get_nodes_by_intersection_id_map(&self, id_mapping: i32) -> Result<Vec<EntityNode>> {
        let Some(mapped) = self
            .collection
            .find_one(&NodeFilter::IdMapping(id_mapping).and(NodeFilter::not_deleted()))
            .await?
        else {
            return Ok(Vec::new());
        };

        let intersection = if mapped.type_name() == EntityKind::Signal.name() {
            match mapped.geometry.point.as_ref().and_then(|p| p.intersection()) {
                Some(id) => id,
                None => return Ok(Vec::new()),
            }
        } else {
            mapped.id
        };
        self.get_nodes_by_intersection_id(intersection).await
    }

    /// Projection of one occurrence of a node
    pub async fn get_node(&self, instance_id: &str) -> Result<Option<EntityNodeProjection>> {
        let instance = InstanceId::parse(instance_id);
        if instance.node.is_nil() {
            return Ok(None);
        }
        Ok(self
            .get_by_id(instance.node)
            .await?
            .map(|n| n.to_projection(instance.parent)))
    }

    /// Nearest Intersection ancestor across every recorded parent
    ///
    /// Breadth-first over `parent`/`parents`, nearest level first, with a
    /// visited set so cyclic link data terminates. A node that is itself an
    /// Intersection is its own answer.
    pub async fn get_intersection_parent_node(&self, node: &EntityNode) -> Result<Option<EntityNode>> {
        let intersection = EntityKind::Intersection.name();
        if node.type_name() == intersection {
            return Ok(Some(node.clone()));
        }

        let mut visited: HashSet<Uuid> = HashSet::from([node.id]);
        let mut frontier = parent_links(node);

        while !frontier.is_empty() {
            let level: Vec<Uuid> = frontier
                .drain(..)
                .filter(|id| !id.is_nil() && visited.insert(*id))
                .collect();
            if level.is_empty() {
                break;
            }

            let mut parents = self
                .collection
                .find(&NodeFilter::IdIn(level.clone()).and(NodeFilter::not_deleted()))
                .await?;
            parents.sort_by_key(|p| level.iter().position(|id| *id == p.id));

            if let Some(found) = parents.iter().find(|p| p.type_name() == intersection) {
                return Ok(Some(found.clone()));
            }
            frontier = parents.iter().flat_map(parent_links).collect();
        }

        Ok(None)
    }

    //
    // GEOSPATIAL READS
    //

    /// Live nodes with a point within `miles` of `point`, nearest first
    pub async fn query_within_radius_miles(&self, point: Point<f64>, miles: f64) -> Result<Vec<EntityNode>> {
        self.collection
            .near(point, miles_to_meters(miles), &NodeFilter::not_deleted())
            .await
    }

    /// Live nodes whose geofence contains or touches `point`
    pub async fn query_intersecting_geo_fences(&self, point: Point<f64>) -> Result<Vec<EntityNode>> {
        self.collection
            .geo_fence_intersecting(&GeoQuery::Point(point), &NodeFilter::not_deleted())
            .await
    }

    pub async fn query_intersecting_geo_fences_by_type(
        &self,
        type_name: &str,
        point: Point<f64>,
    ) -> Result<Vec<EntityNode>> {
        self.collection
            .geo_fence_intersecting(
                &GeoQuery::Point(point),
                &NodeFilter::TypeName(type_name.to_string()).and(NodeFilter::not_deleted()),
            )
            .await
    }

    /// Live nodes of a type whose geofence crosses `route`
    pub async fn query_intersecting_by_type(&self, type_name: &str, route: &LineString<f64>) -> Result<Vec<EntityNode>> {
        self.collection
            .geo_fence_intersecting(
                &GeoQuery::LineString(route.clone()),
                &NodeFilter::TypeName(type_name.to_string()).and(NodeFilter::not_deleted()),
            )
            .await
    }
}

fn parent_links(node: &EntityNode) -> Vec<Uuid> {
    let mut links = node.parents.clone();
    if !node.parent.is_nil() && !links.contains(&node.parent) {
        links.insert(0, node.parent);
    }
    links
}
