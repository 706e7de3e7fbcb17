//! Database Layer
//!
//! This module handles all storage interactions for the entity tree:
//!
//! - [`EntityCollection`] - the document-collection boundary (find, update,
//!   geospatial queries) with reference filter/update semantics
//! - [`MemoryCollection`] - in-process backend, also the test double
//! - `SurrealCollection` - embedded SurrealDB backend (feature `surrealdb`)
//! - [`UnitOfWork`] - deferred, ordered, best-effort command batches
//! - [`TreeStore`] - structural mutations and reads that keep parent-embedded
//!   child summaries in step with the node documents
//! - [`TypeCatalogStore`] - persisted entity type descriptors
//!
//! # Architecture
//!
//! Nodes are stored as self-contained documents. A node's parents embed a
//! summary of it, so one logical change fans out to several documents. None
//! of the backends offer multi-document transactions; the tree store queues
//! every write of a change on one unit of work and commits them in order.

pub mod collection;
mod error;
mod memory_store;
#[cfg(feature = "surrealdb")]
mod surreal_store;
mod tree_store;
mod tree_store_test;
mod type_store;
mod unit_of_work;

pub use collection::{EntityCollection, GeoQuery, NodeFilter, NodeUpdate, UpdateResult};
pub use error::DatabaseError;
pub use memory_store::MemoryCollection;
#[cfg(feature = "surrealdb")]
pub use surreal_store::SurrealCollection;
pub use tree_store::{MoveDirection, TreeStore};
pub use type_store::TypeCatalogStore;
pub use unit_of_work::UnitOfWork;
