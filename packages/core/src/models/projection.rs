//! Read-side tree views
//!
//! An [`EntityNodeProjection`] is a node plus its non-deleted children as
//! projections. Children are shallow (built from embedded summaries) unless
//! the caller asked for that occurrence to be expanded, in which case the
//! child's own document is resolved and projected in turn.

use super::{Entity, EntityNode, EntityTypeId, InstanceId, Jurisdiction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNodeProjection {
    pub id: Uuid,
    pub instance_id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub entity_type: EntityTypeId,
    pub jurisdiction: Option<Jurisdiction>,
    pub is_copy: bool,
    pub is_leaf: bool,
    pub is_deleted: bool,
    pub version: i32,
    pub parent: Uuid,
    #[serde(default)]
    pub children: Vec<EntityNodeProjection>,
}

impl EntityNodeProjection {
    pub fn instance(&self) -> InstanceId {
        InstanceId::parse(&self.instance_id)
    }

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
            is_leaf: self.is_leaf,
        }
    }

    /// Project a flat set of node documents into trees
    ///
    /// Roots are the nodes with no primary parent. When the set contains no
    /// root, every node is projected on its own under its primary parent.
    /// `expanded` lists the occurrences whose children should be resolved
    /// from `nodes` instead of shown as summaries.
    pub fn from_nodes(nodes: &[EntityNode], expanded: &[InstanceId]) -> Vec<EntityNodeProjection> {
        if nodes.is_empty() {
            return Vec::new();
        }

        let by_id: HashMap<Uuid, &EntityNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let expanded: HashSet<InstanceId> = expanded.iter().copied().collect();
        let roots: Vec<&EntityNode> = nodes.iter().filter(|n| n.is_root()).collect();

        if roots.is_empty() {
            return nodes.iter().map(|n| n.to_projection(n.parent)).collect();
        }

        let mut path = HashSet::new();
        roots
            .into_iter()
            .filter_map(|root| project_subtree(root.id, Uuid::nil(), &by_id, &expanded, &mut path))
            .collect()
    }
}

fn project_subtree(
    id: Uuid,
    parent: Uuid,
    nodes: &HashMap<Uuid, &EntityNode>,
    expanded: &HashSet<InstanceId>,
    path: &mut HashSet<Uuid>,
) -> Option<EntityNodeProjection> {
    let node = nodes.get(&id)?;
    // A node already on the current path means cyclic parent data.
    if !path.insert(id) {
        return None;
    }

    let mut projection = node.to_projection(parent);
    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if expanded.contains(&InstanceId::new(node.id, child.id)) {
            if let Some(resolved) = project_subtree(child.id, node.id, nodes, expanded, path) {
                if !resolved.is_deleted {
                    children.push(resolved);
                }
            }
        } else if !child.is_deleted {
            children.push(child.to_projection(node.id));
        }
    }
    projection.children = children;

    path.remove(&id);
    Some(projection)
}
