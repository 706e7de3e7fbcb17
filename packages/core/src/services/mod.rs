//! Business Services
//!
//! This module contains the entity tree business logic:
//!
//! - `EntityService` - add, update, delete, copy and move with leaf maintenance
//! - `traversal` - upstream and downstream intersection traversal
//! - `sync` - ingestion of external corridor and intersection payloads
//! - `EntityUpdates` - ordered observer fan-out after successful mutations
//!
//! Services coordinate between the type registry and the tree store,
//! implementing business rules and orchestrating multi-step commits.

pub mod entity_service;
pub mod entity_updates;
pub mod error;
mod sync;
mod traversal;

pub use entity_service::EntityService;
pub use entity_updates::{BroadcastObserver, EntityEvent, EntityObserver, EntityUpdates, LoggingObserver};
pub use error::EntityServiceError;
