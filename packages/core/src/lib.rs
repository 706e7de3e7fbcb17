//! Entitree Core Business Logic Layer
//!
//! This crate maintains a hierarchical tree of traffic-infrastructure entities
//! (systems, corridors, intersections, signals, detectors and road segments)
//! together with the geometry derived for each of them.
//!
//! # Architecture
//!
//! - **Denormalized tree**: every node embeds summaries of its children and
//!   records all of its parents, so a node can appear under several parents
//! - **Code-defined types**: the type catalog lives in code and is reconciled
//!   into the store at startup
//! - **Derived geometry**: geofences, bearings and centroids are recomputed on
//!   every write, never taken from callers
//! - **Pluggable storage**: an in-memory collection for tests and embedded use,
//!   SurrealDB (RocksDB) behind the `surrealdb` feature
//!
//! # Modules
//!
//! - [`models`] - Data structures (EntityNode, Entity, projections, sync payloads)
//! - [`behaviors`] - Entity type catalog and per-type geometry enrichment
//! - [`services`] - EntityService, traversal, sync and update fan-out
//! - [`db`] - Collection abstraction, unit of work and tree store
//! - [`geometry`] - Buffers, bearings and distances
//! - [`config`] - Service and store configuration

pub mod behaviors;
pub mod config;
pub mod db;
pub mod geometry;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use behaviors::{EntityKind, EntityTypeRegistry};
pub use config::{EntityServiceConfig, StoreConfig};
pub use db::{DatabaseError, EntityCollection, MemoryCollection, TreeStore};
pub use models::*;
pub use services::*;
