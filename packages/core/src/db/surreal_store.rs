//! SurrealCollection - EntityCollection Implementation for SurrealDB Backend
//!
//! Persists entity node documents and type descriptors in an embedded
//! SurrealDB instance (RocksDB engine).
//!
//! # Storage Layout
//!
//! - `entity_nodes` - one record per node, id `entity_nodes:<uuid>`. The
//!   node's camelCase fields are stored as native fields, with the node id
//!   under `uuid`, an insertion sequence under `seq` and a geometry point
//!   under `location` for proximity queries
//! - `entity_types` - one record per type descriptor, same shape without
//!   `location`
//!
//! # Queries
//!
//! [`NodeFilter`] terms the database can evaluate (ids, type names, external
//! ids, id mappings, the deleted flag and child membership) are translated to
//! a SurrealQL `WHERE` clause. Every result is re-checked with
//! [`NodeFilter::matches`], so terms evaluated only in Rust (intersection
//! references, free text) narrow the result the same way. Results come back
//! in insertion order, as they do from the in-memory backend.
//!
//! # Concurrency
//!
//! Update operations are read-modify-write. A write lock serializes them
//! within the process, which gives per-document atomicity for a single
//! embedded instance.
//!
//! # Examples
//!
//! ```rust,no_run
//! use entitree_core::db::{EntityCollection, NodeFilter, SurrealCollection};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SurrealCollection::new(PathBuf::from("./data/entities.db")).await?;
//!     let types = store.distinct_type_names(&NodeFilter::All).await?;
//!     println!("{types:?}");
//!     Ok(())
//! }
//! ```

use super::collection::{geo_fence_intersects, nearest_first, GeoQuery, NodeFilter, NodeUpdate, UpdateResult};
use super::{EntityCollection, TypeCatalogStore};
use crate::models::{EntityNode, EntityType};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use geo::Point;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use tokio::sync::Mutex;
use uuid::Uuid;

const NODES_TABLE: &str = "entity_nodes";
const TYPES_TABLE: &str = "entity_types";

/// Fields selected back from a stored record
const SELECT_FIELDS: &str = "SELECT * OMIT id, location FROM type::table($table)";

/// A decoded record and its insertion sequence
struct Stored<T> {
    seq: i64,
    document: T,
}

/// Encode a document as a stored record
fn to_record<T: Serialize>(document: &T, id: Uuid, seq: i64) -> Result<Value> {
    let mut record = serde_json::to_value(document).context("Failed to encode document")?;
    let fields = record
        .as_object_mut()
        .context("Document did not encode as an object")?;
    fields.remove("id");
    fields.insert("uuid".to_string(), Value::String(id.to_string()));
    fields.insert("seq".to_string(), Value::from(seq));
    Ok(record)
}

/// Decode a stored record back into its document
fn from_record<T: DeserializeOwned>(mut record: Value) -> Result<Stored<T>> {
    let fields = record
        .as_object_mut()
        .context("Stored record is not an object")?;
    let uuid = fields.remove("uuid").context("Stored record has no uuid")?;
    let seq = fields
        .remove("seq")
        .and_then(|s| s.as_i64())
        .context("Stored record has no sequence")?;
    fields.insert("id".to_string(), uuid);
    let document = serde_json::from_value(record).context("Failed to decode stored record")?;
    Ok(Stored { seq, document })
}

/// Register a query parameter and return its placeholder
fn bind(bindings: &mut Vec<(String, Value)>, value: impl Into<Value>) -> String {
    let name = format!("f{}", bindings.len());
    bindings.push((name.clone(), value.into()));
    format!("${name}")
}

/// SurrealQL condition and bindings for the database-evaluable part of a filter
#[derive(Debug, Default)]
struct Condition {
    clause: Option<String>,
    bindings: Vec<(String, Value)>,
}

impl Condition {
    fn from_filter(filter: &NodeFilter) -> Self {
        let mut bindings = Vec::new();
        let clause = Self::translate(filter, &mut bindings);
        Self { clause, bindings }
    }

    fn translate(filter: &NodeFilter, bindings: &mut Vec<(String, Value)>) -> Option<String> {
        match filter {
            NodeFilter::All | NodeFilter::IntersectionRef(_) | NodeFilter::Text(_) => None,
            NodeFilter::Id(id) => Some(format!("uuid = {}", bind(bindings, id.to_string()))),
            NodeFilter::IdIn(ids) => {
                let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
                Some(format!("uuid INSIDE {}", bind(bindings, ids)))
            }
            NodeFilter::TypeName(name) => Some(format!("`type`.name = {}", bind(bindings, name.clone()))),
            NodeFilter::TypeNameIgnoreCase(name) => Some(format!(
                "string::lowercase(`type`.name) = {}",
                bind(bindings, name.to_lowercase())
            )),
            NodeFilter::TypeNameIn(names) => Some(format!("`type`.name INSIDE {}", bind(bindings, names.clone()))),
            NodeFilter::ExternalIdIn(ids) => Some(format!("externalId INSIDE {}", bind(bindings, ids.clone()))),
            NodeFilter::IdMapping(value) => Some(format!("idMapping = {}", bind(bindings, *value))),
            NodeFilter::Deleted(flag) => Some(format!("isDeleted = {}", bind(bindings, *flag))),
            NodeFilter::HasChild(child) => Some(format!("{} INSIDE children.id", bind(bindings, child.to_string()))),
            NodeFilter::And(parts) => {
                let clauses: Vec<String> = parts
                    .iter()
                    .filter_map(|part| Self::translate(part, bindings))
                    .collect();
                match clauses.len() {
                    0 => None,
                    1 => clauses.into_iter().next(),
                    _ => Some(format!("({})", clauses.join(" AND "))),
                }
            }
        }
    }

    /// `WHERE` text joining this condition with any extra terms
    fn where_sql(&self, extra: &[&str]) -> String {
        let terms: Vec<&str> = self
            .clause
            .as_deref()
            .into_iter()
            .chain(extra.iter().copied())
            .collect();
        if terms.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", terms.join(" AND "))
        }
    }
}

pub struct SurrealCollection {
    db: Arc<Surreal<Db>>,
    write_lock: Mutex<()>,
    next_seq: AtomicI64,
}

impl SurrealCollection {
    /// Open (or create) an embedded RocksDB-backed collection
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database path is invalid
    /// - RocksDB initialization fails
    /// - Table or index definitions fail
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .context("Failed to initialize SurrealDB with RocksDB backend")?;

        db.use_ns("entitree")
            .use_db("entities")
            .await
            .context("Failed to set namespace/database")?;

        let db = Arc::new(db);
        Self::initialize_schema(&db).await?;
        let next_seq = Self::last_seq(&db).await? + 1;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            next_seq: AtomicI64::new(next_seq),
        })
    }

    async fn initialize_schema(db: &Surreal<Db>) -> Result<()> {
        let schema = format!(
            r#"
            DEFINE TABLE IF NOT EXISTS {NODES_TABLE} SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_node_uuid ON {NODES_TABLE} FIELDS uuid UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_node_seq ON {NODES_TABLE} FIELDS seq;
            DEFINE INDEX IF NOT EXISTS idx_node_type ON {NODES_TABLE} FIELDS `type`.name;
            DEFINE INDEX IF NOT EXISTS idx_node_deleted ON {NODES_TABLE} FIELDS isDeleted;
            DEFINE INDEX IF NOT EXISTS idx_node_external ON {NODES_TABLE} FIELDS externalId;
            DEFINE INDEX IF NOT EXISTS idx_node_location ON {NODES_TABLE} FIELDS location;
            DEFINE INDEX IF NOT EXISTS idx_node_fence ON {NODES_TABLE} FIELDS geoFence;
            DEFINE TABLE IF NOT EXISTS {TYPES_TABLE} SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_type_uuid ON {TYPES_TABLE} FIELDS uuid UNIQUE;
            "#
        );
        db.query(schema)
            .await
            .and_then(|r| r.check())
            .context("Failed to define tables and indexes")?;
        Ok(())
    }

    /// Highest sequence already used across both tables, `0` when empty
    async fn last_seq(db: &Surreal<Db>) -> Result<i64> {
        let mut response = db
            .query(format!("SELECT VALUE seq FROM {NODES_TABLE}; SELECT VALUE seq FROM {TYPES_TABLE};"))
            .await
            .context("Failed to read insertion sequence")?;
        let nodes: Vec<i64> = response.take(0).context("Failed to extract node sequence")?;
        let types: Vec<i64> = response.take(1).context("Failed to extract type sequence")?;
        Ok(nodes.into_iter().chain(types).max().unwrap_or(0))
    }

    fn take_seq(&self) -> i64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &'static str,
        condition: &Condition,
        extra: &[&str],
        params: Vec<(String, Value)>,
    ) -> Result<Vec<Stored<T>>> {
        let sql = format!("{SELECT_FIELDS}{} ORDER BY seq;", condition.where_sql(extra));
        let mut query = self.db.query(sql).bind(("table", table));
        for binding in condition.bindings.iter().cloned().chain(params) {
            query = query.bind(binding);
        }
        let mut response = query.await.with_context(|| format!("Failed to query {table}"))?;
        let records: Vec<Value> = response.take(0).context("Failed to extract query results")?;
        records.into_iter().map(from_record).collect()
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &'static str, id: Uuid) -> Result<Option<Stored<T>>> {
        let condition = Condition::from_filter(&NodeFilter::Id(id));
        Ok(self.select(table, &condition, &[], Vec::new()).await?.into_iter().next())
    }

    async fn write<T: Serialize>(&self, table: &'static str, id: Uuid, seq: i64, document: &T) -> Result<()> {
        self.db
            .query("UPSERT type::thing($table, $id) CONTENT $record;")
            .bind(("table", table))
            .bind(("id", id.to_string()))
            .bind(("record", to_record(document, id, seq)?))
            .await
            .and_then(|r| r.check())
            .with_context(|| format!("Failed to write {table} record {id}"))?;
        Ok(())
    }

    async fn write_node(&self, seq: i64, node: &EntityNode) -> Result<()> {
        self.write(NODES_TABLE, node.id, seq, node).await?;
        let location = node.geometry.location().map(|p| vec![p.x(), p.y()]);
        self.db
            .query(
                "UPDATE type::thing($table, $id) SET location = \
                 IF type::is::array($location) THEN type::point($location) ELSE NONE END;",
            )
            .bind(("table", NODES_TABLE))
            .bind(("id", node.id.to_string()))
            .bind(("location", location))
            .await
            .and_then(|r| r.check())
            .with_context(|| format!("Failed to index location of entity {}", node.id))?;
        Ok(())
    }

    /// Nodes the filter matches, in insertion order
    async fn load_nodes(
        &self,
        filter: &NodeFilter,
        extra: &[&str],
        params: Vec<(String, Value)>,
    ) -> Result<Vec<Stored<EntityNode>>> {
        let condition = Condition::from_filter(filter);
        let mut nodes = self.select::<EntityNode>(NODES_TABLE, &condition, extra, params).await?;
        nodes.retain(|stored| filter.matches(&stored.document));
        Ok(nodes)
    }

    async fn update_matching(&self, filter: &NodeFilter, update: &NodeUpdate, limit: Option<usize>) -> Result<UpdateResult> {
        let _guard = self.write_lock.lock().await;
        let mut result = UpdateResult::none();
        let matching = self.load_nodes(filter, &[], Vec::new()).await?;
        for mut stored in matching.into_iter().take(limit.unwrap_or(usize::MAX)) {
            result.matched += 1;
            if update.apply(&mut stored.document) {
                self.write_node(stored.seq, &stored.document).await?;
                result.modified += 1;
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl EntityCollection for SurrealCollection {
    async fn insert(&self, node: EntityNode) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.select_one::<EntityNode>(NODES_TABLE, node.id).await?.is_some() {
            bail!("Duplicate key: entity {} already exists", node.id);
        }
        self.write_node(self.take_seq(), &node).await
    }

    async fn replace(&self, node: EntityNode) -> Result<UpdateResult> {
        let _guard = self.write_lock.lock().await;
        let Some(existing) = self.select_one::<EntityNode>(NODES_TABLE, node.id).await? else {
            return Ok(UpdateResult::none());
        };
        let modified = existing.document != node;
        if modified {
            self.write_node(existing.seq, &node).await?;
        }
        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.select_one::<EntityNode>(NODES_TABLE, id).await?.is_none() {
            return Ok(false);
        }
        self.db
            .query("DELETE type::thing($table, $id);")
            .bind(("table", NODES_TABLE))
            .bind(("id", id.to_string()))
            .await
            .and_then(|r| r.check())
            .with_context(|| format!("Failed to delete entity {id}"))?;
        Ok(true)
    }

    async fn find(&self, filter: &NodeFilter) -> Result<Vec<EntityNode>> {
        Ok(self
            .load_nodes(filter, &[], Vec::new())
            .await?
            .into_iter()
            .map(|stored| stored.document)
            .collect())
    }

    async fn update_one(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult> {
        self.update_matching(filter, update, Some(1)).await
    }

    async fn update_many(&self, filter: &NodeFilter, update: &NodeUpdate) -> Result<UpdateResult> {
        self.update_matching(filter, update, None).await
    }

    async fn distinct_type_names(&self, filter: &NodeFilter) -> Result<Vec<String>> {
        let names: BTreeSet<String> = self
            .find(filter)
            .await?
            .into_iter()
            .map(|n| n.entity_type.name)
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn near(
        &self,
        center: Point<f64>,
        max_distance_m: f64,
        filter: &NodeFilter,
    ) -> Result<Vec<EntityNode>> {
        let params = vec![
            ("center".to_string(), Value::from(vec![center.x(), center.y()])),
            ("max_distance".to_string(), Value::from(max_distance_m)),
        ];
        let nodes: Vec<EntityNode> = self
            .load_nodes(
                filter,
                &[
                    "location != NONE",
                    "geo::distance(location, type::point($center)) <= $max_distance",
                ],
                params,
            )
            .await?
            .into_iter()
            .map(|stored| stored.document)
            .collect();
        Ok(nearest_first(&nodes, center, max_distance_m))
    }

    async fn geo_fence_intersecting(&self, query: &GeoQuery, filter: &NodeFilter) -> Result<Vec<EntityNode>> {
        Ok(self
            .load_nodes(filter, &["geoFence != NONE", "geoFence != NULL"], Vec::new())
            .await?
            .into_iter()
            .map(|stored| stored.document)
            .filter(|n| geo_fence_intersects(n, query))
            .collect())
    }
}

#[async_trait]
impl TypeCatalogStore for SurrealCollection {
    async fn get_type(&self, id: Uuid) -> Result<Option<EntityType>> {
        Ok(self
            .select_one::<EntityType>(TYPES_TABLE, id)
            .await?
            .map(|stored| stored.document))
    }

    async fn list_types(&self) -> Result<Vec<EntityType>> {
        Ok(self
            .select::<EntityType>(TYPES_TABLE, &Condition::default(), &[], Vec::new())
            .await?
            .into_iter()
            .map(|stored| stored.document)
            .collect())
    }

    async fn upsert_type(&self, entity_type: EntityType) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existing = self.select_one::<EntityType>(TYPES_TABLE, entity_type.id).await?;
        let seq = existing.as_ref().map(|stored| stored.seq).unwrap_or_else(|| self.take_seq());
        self.write(TYPES_TABLE, entity_type.id, seq, &entity_type).await?;
        Ok(existing.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityTypeId, GeoJsonGeometry};
    use tempfile::TempDir;

    async fn open() -> Result<(SurrealCollection, TempDir)> {
        let dir = TempDir::new()?;
        let store = SurrealCollection::new(dir.path().join("entities.db")).await?;
        Ok((store, dir))
    }

    fn node(name: &str) -> EntityNode {
        EntityNode::new(EntityTypeId::new(Uuid::new_v4(), "Corridor"), name)
    }

    fn names(nodes: &[EntityNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_results_keep_insertion_order() -> Result<()> {
        let (store, _dir) = open().await?;
        let mut ids = Vec::new();
        for name in ["C", "A", "B", "D"] {
            let n = node(name);
            ids.push(n.id);
            store.insert(n).await?;
        }
        assert_eq!(names(&store.find(&NodeFilter::All).await?), ["C", "A", "B", "D"]);

        // rewriting a document keeps its place
        let renamed = EntityNode {
            name: "C2".to_string(),
            ..store.find_by_id(ids[0]).await?.expect("first")
        };
        store.replace(renamed).await?;
        assert_eq!(names(&store.find(&NodeFilter::All).await?), ["C2", "A", "B", "D"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_select_natively_stored_fields() -> Result<()> {
        let (store, _dir) = open().await?;
        let signal_type = crate::behaviors::EntityKind::Signal.type_id();
        let child = node("Child");
        let parent = EntityNode {
            children: vec![child.to_entity()],
            ..node("Parent")
        };
        let signal = EntityNode {
            external_id: Some("ext-7".to_string()),
            id_mapping: Some(42),
            ..EntityNode::new(signal_type.clone(), "Signal")
        };
        let deleted = EntityNode {
            is_deleted: true,
            ..EntityNode::new(signal_type.clone(), "Gone")
        };
        for n in [parent.clone(), child.clone(), signal.clone(), deleted.clone()] {
            store.insert(n).await?;
        }

        let by_type = NodeFilter::TypeName(signal_type.name.clone());
        assert_eq!(names(&store.find(&by_type).await?), ["Signal", "Gone"]);
        assert_eq!(
            names(&store.find(&by_type.clone().and(NodeFilter::not_deleted())).await?),
            ["Signal"]
        );
        assert_eq!(
            names(&store.find(&NodeFilter::ExternalIdIn(vec!["ext-7".to_string()])).await?),
            ["Signal"]
        );
        assert_eq!(names(&store.find(&NodeFilter::IdMapping(42)).await?), ["Signal"]);
        assert_eq!(names(&store.find(&NodeFilter::HasChild(child.id)).await?), ["Parent"]);
        assert_eq!(
            names(&store.find(&NodeFilter::IdIn(vec![deleted.id, parent.id])).await?),
            ["Parent", "Gone"]
        );
        assert_eq!(
            names(&store.find(&NodeFilter::TypeNameIgnoreCase("SIGNAL".to_string())).await?),
            ["Signal", "Gone"]
        );
        assert_eq!(
            names(&store.find(&NodeFilter::text("sign").and(NodeFilter::not_deleted())).await?),
            ["Signal"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_near_uses_stored_location() -> Result<()> {
        let (store, _dir) = open().await?;
        let far = EntityNode {
            geometry: GeoJsonGeometry::point(Point::new(-105.0, 40.01)),
            ..node("Far")
        };
        let close = EntityNode {
            geometry: GeoJsonGeometry::point(Point::new(-105.0, 40.0001)),
            ..node("Close")
        };
        store.insert(far).await?;
        store.insert(close).await?;
        store.insert(node("Nowhere")).await?;

        let center = Point::new(-105.0, 40.0);
        assert_eq!(names(&store.near(center, 5_000.0, &NodeFilter::All).await?), ["Close", "Far"]);
        assert_eq!(names(&store.near(center, 100.0, &NodeFilter::All).await?), ["Close"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sequence_survives_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("entities.db");
        {
            let store = SurrealCollection::new(path.clone()).await?;
            store.insert(node("First")).await?;
        }
        let store = SurrealCollection::new(path).await?;
        store.insert(node("Second")).await?;
        assert_eq!(names(&store.find(&NodeFilter::All).await?), ["First", "Second"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_documents_round_trip() -> Result<()> {
        let (store, _dir) = open().await?;
        let a = node("A");
        store.insert(a.clone()).await?;
        assert!(store.insert(a.clone()).await.is_err());

        assert_eq!(store.find_by_id(a.id).await?, Some(a.clone()));

        let renamed = EntityNode {
            name: "A2".to_string(),
            ..a.clone()
        };
        assert_eq!(store.replace(renamed).await?.modified, 1);
        assert_eq!(store.find_by_id(a.id).await?.map(|n| n.name), Some("A2".to_string()));

        assert!(store.remove(a.id).await?);
        assert!(!store.remove(a.id).await?);
        assert!(store.find(&NodeFilter::All).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_child_updates_match_embedded_summaries() -> Result<()> {
        let (store, _dir) = open().await?;
        let parent = node("Parent");
        let child = node("Child");
        store.insert(parent.clone()).await?;

        let result = store
            .update_one(&NodeFilter::Id(parent.id), &NodeUpdate::AddChild(child.to_entity()))
            .await?;
        assert_eq!((result.matched, result.modified), (1, 1));

        let result = store
            .update_many(&NodeFilter::HasChild(child.id), &NodeUpdate::PullChild(child.id))
            .await?;
        assert_eq!((result.matched, result.modified), (1, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_type_catalog() -> Result<()> {
        let (store, _dir) = open().await?;
        let entity_type = crate::behaviors::EntityKind::Signal.entity_type();
        assert!(store.upsert_type(entity_type.clone()).await?);
        assert!(!store.upsert_type(entity_type.clone()).await?);
        assert_eq!(store.get_type(entity_type.id).await?, Some(entity_type));
        assert_eq!(store.list_types().await?.len(), 1);
        Ok(())
    }
}
