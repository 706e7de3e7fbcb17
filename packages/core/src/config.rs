//! Service configuration
//!
//! Values are read from `ENTITREE_*` environment variables, falling back to
//! the defaults below.

use crate::db::{EntityCollection, MemoryCollection, TypeCatalogStore};
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Tunables for the entity service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityServiceConfig {
    /// Name of the root System created when a node is added to an empty tree
    /// (default: "Default System")
    pub default_root_name: String,
    /// Name of the root System created when the tree is first listed
    /// (default: "System")
    pub bootstrap_root_name: String,
    /// Radius searched for the nearest intersection when a traversal point
    /// matches no geofence (default: 1 mile)
    pub fallback_radius_miles: f64,
    /// Radius searched for the next intersection on each traversal hop
    /// (default: 2 miles)
    pub hop_radius_miles: f64,
}

impl Default for EntityServiceConfig {
    fn default() -> Self {
        Self {
            default_root_name: "Default System".to_string(),
            bootstrap_root_name: "System".to_string(),
            fallback_radius_miles: 1.0,
            hop_radius_miles: 2.0,
        }
    }
}

impl EntityServiceConfig {
    /// Defaults overridden by any `ENTITREE_*` variables that are set and parse
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_root_name: env_string("ENTITREE_DEFAULT_ROOT_NAME").unwrap_or(defaults.default_root_name),
            bootstrap_root_name: env_string("ENTITREE_BOOTSTRAP_ROOT_NAME").unwrap_or(defaults.bootstrap_root_name),
            fallback_radius_miles: env_parse("ENTITREE_FALLBACK_RADIUS_MILES").unwrap_or(defaults.fallback_radius_miles),
            hop_radius_miles: env_parse("ENTITREE_HOP_RADIUS_MILES").unwrap_or(defaults.hop_radius_miles),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StoreConfig {
    #[default]
    Memory,
    /// Embedded SurrealDB at the given RocksDB directory
    #[cfg(feature = "surrealdb")]
    Surreal { path: PathBuf },
}

/// Opened backend: the node collection and the type catalog it also serves
pub struct OpenedStore {
    pub nodes: Arc<dyn EntityCollection>,
    pub types: Arc<dyn TypeCatalogStore>,
}

impl StoreConfig {
    /// `ENTITREE_DB_PATH` selects SurrealDB when the feature is enabled,
    /// otherwise the in-memory backend is used
    pub fn from_env() -> Self {
        match env_string("ENTITREE_DB_PATH").map(PathBuf::from) {
            #[cfg(feature = "surrealdb")]
            Some(path) => StoreConfig::Surreal { path },
            #[cfg(not(feature = "surrealdb"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "ENTITREE_DB_PATH set but the surrealdb feature is disabled; using in-memory store"
                );
                StoreConfig::Memory
            }
            None => StoreConfig::Memory,
        }
    }

    pub async fn open(&self) -> Result<OpenedStore> {
        match self {
            StoreConfig::Memory => {
                let store = Arc::new(MemoryCollection::new());
                Ok(OpenedStore {
                    nodes: store.clone(),
                    types: store,
                })
            }
            #[cfg(feature = "surrealdb")]
            StoreConfig::Surreal { path } => {
                let store = Arc::new(crate::db::SurrealCollection::new(path.clone()).await?);
                tracing::info!(path = %path.display(), "Opened SurrealDB entity store");
                Ok(OpenedStore {
                    nodes: store.clone(),
                    types: store,
                })
            }
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse(key: &str) -> Option<f64> {
    env_string(key).and_then(|v| v.parse().ok())
}
