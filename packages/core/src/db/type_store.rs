//! Persisted type catalog
//!
//! Storage for [`EntityType`] descriptors. The code-defined catalog in
//! [`crate::behaviors`] is upserted here at startup, so stored copies only
//! exist for consumers that read types straight from the database.

use crate::models::EntityType;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait TypeCatalogStore: Send + Sync {
    async fn get_type(&self, id: Uuid) -> Result<Option<EntityType>>;

    async fn list_types(&self) -> Result<Vec<EntityType>>;

    /// Insert the type if absent, otherwise overwrite it
    ///
    /// Returns `true` when the type was inserted.
    async fn upsert_type(&self, entity_type: EntityType) -> Result<bool>;
}
