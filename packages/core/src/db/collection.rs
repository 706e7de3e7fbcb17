//! EntityCollection Trait - Storage Boundary
//!
//! This module defines the `EntityCollection` trait that abstracts the document
//! collection holding `EntityNode` documents. The tree store, the type
//! registry and the entity service only ever talk to storage through it.
//!
//! # Architecture
//!
//! - **Document Model**: One document per node, keyed by node id
//! - **Filters and Updates as Data**: [`NodeFilter`] and [`NodeUpdate`] describe
//!   what to match and how to mutate, so buffered commands can be built ahead
//!   of time and replayed against any backend
//! - **Per-Document Atomicity**: Each matched document is updated atomically;
//!   nothing spans documents
//! - **Two Geospatial Indexes**: `geometry.point` for proximity and `geoFence`
//!   for containment
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and remote backends
//!    share one interface
//! 2. **Shared Evaluation**: `NodeFilter::matches` and `NodeUpdate::apply` are
//!    the reference semantics; backends without native equivalents evaluate
//!    them in process
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context
//!
//! # Examples
//!
//! ```rust,no_run
//! use entitree_core::db::{EntityCollection, MemoryCollection, NodeFilter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let collection: Arc<dyn EntityCollection> = Arc::new(MemoryCollection::new());
//!     let live = collection.find(&NodeFilter::not_deleted()).await?;
//!     println!("{} live nodes", live.len());
//!     Ok(())
//! }
//! ```

use crate::geometry::distance_meters;
use crate::models::{Entity, EntityNode};
use anyhow::Result;
use async_trait::async_trait;
use geo::{Intersects, LineString, Point};
use regex::Regex;
use uuid::Uuid;

/// Outcome of an update against the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Shape to test against stored geofences
#[derive(Debug, Clone, PartialEq)]
pub enum GeoQuery {
    Point(Point<f64>),
    LineString(LineString<f64>),
}

/// Document predicate
#[derive(Debug, Clone)]
pub enum NodeFilter {
    All,
    Id(Uuid),
    IdIn(Vec<Uuid>),
    /// Exact type name
    TypeName(String),
    /// Type name compared without regard to case
    TypeNameIgnoreCase(String),
    TypeNameIn(Vec<String>),
    ExternalIdIn(Vec<String>),
    IdMapping(i32),
    Deleted(bool),
    /// Node embeds a child summary with this id
    HasChild(Uuid),
    /// Any geometry feature is stamped with this intersection
    IntersectionRef(Uuid),
    /// Case-insensitive match over name, description, external id and type name
    Text(Regex),
    And(Vec<NodeFilter>),
}

impl NodeFilter {
    pub fn not_deleted() -> Self {
        NodeFilter::Deleted(false)
    }

    /// Free-text filter; the query is matched literally
    pub fn text(query: &str) -> Self {
        let pattern = format!("(?i){}", regex::escape(query));
        match Regex::new(&pattern) {
            Ok(regex) => NodeFilter::Text(regex),
            // An escaped literal always compiles; fall back to matching nothing.
            Err(_) => NodeFilter::IdIn(Vec::new()),
        }
    }

    pub fn and(self, other: NodeFilter) -> Self {
        match self {
            NodeFilter::All => other,
            NodeFilter::And(mut parts) => {
                parts.push(other);
                NodeFilter::And(parts)
            }
            first => NodeFilter::And(vec![first, other]),
        }
    }

    /// Reference evaluation of the predicate against one document
    pub fn matches(&self, node: &EntityNode) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Id(id) => node.id == *id,
            NodeFilter::IdIn(ids) => ids.contains(&node.id),
            NodeFilter::TypeName(name) => node.entity_type.name == *name,
            NodeFilter::TypeNameIgnoreCase(name) => node.entity_type.name.eq_ignore_ascii_case(name),
            NodeFilter::TypeNameIn(names) => names.iter().any(|n| *n == node.entity_type.name),
            NodeFilter::ExternalIdIn(ids) => node
                .external_id
                .as_ref()
                .map(|e| ids.contains(e))
                .unwrap_or(false),
            NodeFilter::IdMapping(value) => node.id_mapping == Some(*value),
            NodeFilter::Deleted(flag) => node.is_deleted == *flag,
            NodeFilter::HasChild(child) => node.children.iter().any(|c| c.id == *child),
            NodeFilter::IntersectionRef(id) => {
                let geometry = &node.geometry;
                geometry.point.as_ref().and_then(|p| p.intersection()) == Some(*id)
                    || geometry.line_string.as_ref().and_then(|l| l.intersection()) == Some(*id)
                    || geometry.polygon.as_ref().and_then(|p| p.intersection()) == Some(*id)
            }
            NodeFilter::Text(regex) => {
                regex.is_match(&node.name)
                    || regex.is_match(&node.description)
                    || regex.is_match(&node.entity_type.name)
                    || node.external_id.as_deref().map(|e| regex.is_match(e)).unwrap_or(false)
            }
            NodeFilter::And(parts) => parts.iter().all(|p| p.matches(node)),
        }
    }

    /// Id this filter pins down, if it pins exactly one document
    pub fn single_id(&self) -> Option<Uuid> {
        match self {
            NodeFilter::Id(id) => Some(*id),
            NodeFilter::And(parts) => parts.iter().find_map(NodeFilter::single_id),
            _ => None,
        }
    }
}

/// Document mutation
#[derive(Debug, Clone)]
pub enum NodeUpdate {
    /// Append a child summary unless one with the same id is present
    AddChild(Entity),
    /// Remove every child summary with this id
    PullChild(Uuid),
    /// Insert a child summary at a position (clamped to the list length)
    InsertChildAt { child: Entity, position: usize },
    /// Patch the summary fields mirrored from the child document
    PatchChildSummary(Entity),
    /// Append a parent id unless present
    AddParent(Uuid),
    SetParent(Uuid),
    /// Apply several updates to the same document in one step
    Combine(Vec<NodeUpdate>),
}

impl NodeUpdate {
    /// Reference application of the update; returns whether anything changed
    pub fn apply(&self, node: &mut EntityNode) -> bool {
        match self {
            NodeUpdate::AddChild(child) => {
                if node.children.iter().any(|c| c.id == child.id) {
                    return false;
                }
                node.children.push(child.clone());
                true
            }
            NodeUpdate::PullChild(id) => {
                let before = node.children.len();
                node.children.retain(|c| c.id != *id);
                node.children.len() != before
            }
            NodeUpdate::InsertChildAt { child, position } => {
                let position = (*position).min(node.children.len());
                node.children.insert(position, child.clone());
                true
            }
            NodeUpdate::PatchChildSummary(summary) => {
                let mut changed = false;
                for child in node.children.iter_mut().filter(|c| c.id == summary.id) {
                    let patched = Entity {
                        name: summary.name.clone(),
                        description: summary.description.clone(),
                        is_leaf: summary.is_leaf,
                        jurisdiction: summary.jurisdiction.clone(),
                        is_deleted: summary.is_deleted,
                        version: summary.version,
                        ..child.clone()
                    };
                    if *child != patched {
                        *child = patched;
                        changed = true;
                    }
                }
                changed
            }
            NodeUpdate::AddParent(parent) => {
                if node.parents.contains(parent) {
                    return false;
                }
                node.parents.push(*parent);
                true
            }
            NodeUpdate::SetParent(parent) => {
                let changed = node.parent != *parent;
                node.parent = *parent;
                changed
            }
            NodeUpdate::Combine(updates) => updates
                .iter()
                .fold(false, |changed, update| update.apply(node) || changed),
        }
    }
}

/// True when the node's geofence intersects `query`
pub fn geo_fence_intersects(node: &EntityNode, query: &GeoQuery) -> bool {
    let Some(fence) = node.geo_fence.as_ref().and_then(|f| f.to_polygon().ok()) else {
        return false;
    };
    match query {
        GeoQuery::Point(point) => fence.intersects(point),
        GeoQuery::LineString(line) => fence.intersects(line),
    }
}

/// Distance in meters from `center` to the node's point, if it has one
pub fn distance_to(node: &EntityNode, center: Point<f64>) -> Option<f64> {
    node.geometry.location().map(|p| distance_meters(center, p))
}

/// Nodes within `max_distance_m` of `center`, nearest first
pub fn nearest_first<'a>(
    nodes: impl IntoIterator<Item = &'a EntityNode>,
    center: Point<f64>,
    max_distance_m: f64,
) -> Vec<EntityNode> {
    let mut hits: Vec<(f64, &EntityNode)> = nodes
        .into_iter()
        .filter_map(|n| distance_to(n, center).map(|d| (d, n)))
        .filter(|(d, _)| *d <= max_distance_m)
        .collect();
    hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    hits.into_iter().map(|(_, n)| n.clone()).collect()
}

/// Abstraction over the entity document collection
///
/// Implementations must be `Send + Sync` so the collection can be shared
/// behind an `Arc` across tasks.
///
/// # Method Categories
///
/// - **Documents**: insert, replace, remove
/// - **Querying**: find, distinct type names
/// - **Updates**: single and multi-document updates
/// - **Geospatial**: proximity over `geometry.point`, containment over `geoFence`
#[async_trait]
pub trait EntityCollection: Send + Sync {
    /// Insert a new document
    ///
    /// # Errors
    ///
    /// Returns error if a document with the same id already exists.
    async fn insert(&self, node: EntityNode) -> Result<()>;

    /// Replace the document with the same id
    ///
    /// Matches nothing (and changes nothing) if the document does not exist.
    async fn replace(&self, node: EntityNode) -> Result<UpdateResult>;

    /// Delete a document, returning whether it existed
    async fn remove(&self, id: Uuid) -> Result<bool>;

    /// All documents matching `filter`
    async fn find(&self, filter: &NodeFilter) -> Result<Vec<EntityNode>>;

    async fn find_one(&self, filter: &NodeFilter) -> Result<Option<EntityNode>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EntityNode>> {
        self.find_one(&NodeFilter::Id(id)).await
    }

    /// Apply `update` to the first document matching `filter`
    async fn update_one(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult>;

    /// Apply `update` to every document matching `filter`
    async fn update_many(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult>;

    /// Distinct type names among documents matching `filter`, sorted
    async fn distinct_type_names(&self, filter: &NodeFilter) -> Result<Vec<String>>;

    /// Documents whose `geometry.point` lies within `max_distance_m` of `center`
    ///
    /// Results are ordered nearest first, using spherical distance.
    async fn near(
        &self,
        center: Point<f64>,
        max_distance_m: f64,
        filter: &NodeFilter,
    ) -> Result<Vec<EntityNode>>;

    /// Documents whose `geoFence` intersects `query`
    async fn geo_fence_intersecting(&self, query: &GeoQuery, filter: &NodeFilter) -> Result<Vec<EntityNode>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityTypeId, GeoJsonGeometry, GeoJsonPolygonFeature};
    use geo::{line_string, point, polygon};

    fn node(type_name: &str, name: &str) -> EntityNode {
        EntityNode::new(EntityTypeId::new(Uuid::new_v4(), type_name), name)
    }

    #[test]
    fn test_type_name_filters() {
        let signal = node("Signal", "A");
        assert!(NodeFilter::TypeName("Signal".into()).matches(&signal));
        assert!(!NodeFilter::TypeName("signal".into()).matches(&signal));
        assert!(NodeFilter::TypeNameIgnoreCase("sIgNaL".into()).matches(&signal));
        assert!(NodeFilter::TypeNameIn(vec!["Rsu".into(), "Signal".into()]).matches(&signal));
    }

    #[test]
    fn test_text_filter_is_literal_and_case_insensitive() {
        let mut n = node("Signal", "Main St (North)");
        n.description = "by the park".into();
        assert!(NodeFilter::text("main st").matches(&n));
        assert!(NodeFilter::text("(north)").matches(&n));
        assert!(NodeFilter::text("PARK").matches(&n));
        assert!(!NodeFilter::text("main.st").matches(&n));
    }

    #[test]
    fn test_and_combinator() {
        let mut n = node("Signal", "A");
        let filter = NodeFilter::All
            .and(NodeFilter::not_deleted())
            .and(NodeFilter::TypeName("Signal".into()));
        assert!(filter.matches(&n));
        n.is_deleted = true;
        assert!(!filter.matches(&n));
        assert_eq!(NodeFilter::Id(n.id).and(NodeFilter::All).single_id(), Some(n.id));
    }

    #[test]
    fn test_intersection_ref_checks_every_feature() {
        let target = Uuid::new_v4();
        let mut n = node("Approach", "A");
        n.geometry = GeoJsonGeometry::line_string(&line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(!NodeFilter::IntersectionRef(target).matches(&n));
        if let Some(line) = n.geometry.line_string.as_mut() {
            line.properties_mut().intersection = Some(target);
        }
        assert!(NodeFilter::IntersectionRef(target).matches(&n));
    }

    #[test]
    fn test_child_updates() {
        let mut parent = node("Corridor", "P");
        let a = node("Signal", "a").to_entity();
        let b = node("Signal", "b").to_entity();

        assert!(NodeUpdate::AddChild(a.clone()).apply(&mut parent));
        assert!(!NodeUpdate::AddChild(a.clone()).apply(&mut parent));
        assert!(NodeUpdate::InsertChildAt { child: b.clone(), position: 0 }.apply(&mut parent));
        assert_eq!(parent.children[0].id, b.id);

        let move_down = NodeUpdate::Combine(vec![
            NodeUpdate::PullChild(b.id),
            NodeUpdate::InsertChildAt { child: b.clone(), position: 1 },
        ]);
        assert!(move_down.apply(&mut parent));
        assert_eq!(parent.children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);

        assert!(NodeUpdate::PullChild(a.id).apply(&mut parent));
        assert!(!NodeUpdate::PullChild(a.id).apply(&mut parent));
    }

    #[test]
    fn test_patch_child_summary_keeps_copy_flag() {
        let mut parent = node("Corridor", "P");
        let mut child = node("Signal", "before").to_entity();
        child.is_copy = true;
        parent.children.push(child.clone());

        let mut patch = child.clone();
        patch.name = "after".into();
        patch.is_copy = false;
        patch.is_deleted = true;
        assert!(NodeUpdate::PatchChildSummary(patch.clone()).apply(&mut parent));
        assert_eq!(parent.children[0].name, "after");
        assert!(parent.children[0].is_deleted);
        assert!(parent.children[0].is_copy);
        assert!(!NodeUpdate::PatchChildSummary(patch).apply(&mut parent));
    }

    #[test]
    fn test_parent_updates_are_idempotent() {
        let mut n = node("Signal", "A");
        let p = Uuid::new_v4();
        assert!(NodeUpdate::AddParent(p).apply(&mut n));
        assert!(!NodeUpdate::AddParent(p).apply(&mut n));
        assert!(NodeUpdate::SetParent(p).apply(&mut n));
        assert!(!NodeUpdate::SetParent(p).apply(&mut n));
    }

    #[test]
    fn test_geo_helpers() {
        let mut fenced = node("Intersection", "I");
        fenced.geo_fence = Some(GeoJsonPolygonFeature::new(&polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]));
        assert!(geo_fence_intersects(&fenced, &GeoQuery::Point(point!(x: 0.5, y: 0.5))));
        assert!(!geo_fence_intersects(&fenced, &GeoQuery::Point(point!(x: 2.0, y: 2.0))));
        assert!(geo_fence_intersects(
            &fenced,
            &GeoQuery::LineString(line_string![(x: -1.0, y: 0.5), (x: 2.0, y: 0.5)])
        ));

        let mut near = node("Signal", "near");
        near.geometry = GeoJsonGeometry::point(point!(x: 0.0, y: 0.001));
        let mut far = node("Signal", "far");
        far.geometry = GeoJsonGeometry::point(point!(x: 0.0, y: 0.01));
        let unplaced = node("Signal", "unplaced");

        let hits = nearest_first([&far, &unplaced, &near], point!(x: 0.0, y: 0.0), 2_000.0);
        assert_eq!(hits.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(), vec!["near", "far"]);
        assert!(nearest_first([&far], point!(x: 0.0, y: 0.0), 500.0).is_empty());
    }
}
