//! Entity Update Notifications
//!
//! After a node is successfully added, updated or deleted, the entity service
//! fans the change out to every registered [`EntityObserver`].
//!
//! # Delivery
//!
//! Observers run sequentially in registration order and each one is awaited
//! before the next starts. An observer that fails stops the fan-out: the
//! remaining observers are skipped and the failure is returned to the caller
//! as [`EntityServiceError::ObserverFailed`]. The storage change itself has
//! already been committed at that point.
//!
//! # Built-in Observers
//!
//! - [`LoggingObserver`] - writes each change to the `tracing` log
//! - [`BroadcastObserver`] - re-emits changes as [`EntityEvent`]s on a tokio
//!   broadcast channel for any number of subscribers

use super::{EntityService, EntityServiceError};
use crate::models::EntityNode;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Receiver of entity change notifications
#[async_trait]
pub trait EntityObserver: Send + Sync {
    /// Name used in logs and failure messages
    fn name(&self) -> &str;

    async fn on_add(&self, service: &EntityService, node: &EntityNode) -> Result<()>;

    async fn on_update(&self, service: &EntityService, node: &EntityNode) -> Result<()>;

    async fn on_delete(&self, service: &EntityService, node: &EntityNode) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Add,
    Update,
    Delete,
}

/// Ordered list of observers registered at startup
#[derive(Clone, Default)]
pub struct EntityUpdates {
    observers: Vec<Arc<dyn EntityObserver>>,
}

impl EntityUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; it runs after every observer registered before it
    pub fn register(&mut self, observer: Arc<dyn EntityObserver>) {
        self.observers.push(observer);
    }

    pub fn with(mut self, observer: Arc<dyn EntityObserver>) -> Self {
        self.register(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn add(&self, service: &EntityService, node: &EntityNode) -> Result<(), EntityServiceError> {
        self.notify(Change::Add, service, node).await
    }

    pub async fn update(&self, service: &EntityService, node: &EntityNode) -> Result<(), EntityServiceError> {
        self.notify(Change::Update, service, node).await
    }

    pub async fn delete(&self, service: &EntityService, node: &EntityNode) -> Result<(), EntityServiceError> {
        self.notify(Change::Delete, service, node).await
    }

    async fn notify(&self, change: Change, service: &EntityService, node: &EntityNode) -> Result<(), EntityServiceError> {
        for observer in &self.observers {
            let outcome = match change {
                Change::Add => observer.on_add(service, node).await,
                Change::Update => observer.on_update(service, node).await,
                Change::Delete => observer.on_delete(service, node).await,
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    observer = observer.name(),
                    change = ?change,
                    entity = %node.id,
                    "Entity observer failed, skipping remaining observers: {:#}",
                    e
                );
                return Err(EntityServiceError::observer_failed(observer.name(), format!("{e:#}")));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityUpdates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

/// Logs every change at info level
#[derive(Debug, Default)]
pub struct LoggingObserver;

#[async_trait]
impl EntityObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_add(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        tracing::info!("EntityConfigUpdate.Add {} {}", node.id, node.name);
        Ok(())
    }

    async fn on_update(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        tracing::info!("EntityConfigUpdate.Update {} {}", node.id, node.name);
        Ok(())
    }

    async fn on_delete(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        tracing::info!("EntityConfigUpdate.Delete {} {}", node.id, node.name);
        Ok(())
    }
}

/// Entity change as seen by broadcast subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum EntityEvent {
    #[serde(rename = "entity:added")]
    Added(EntityNode),
    #[serde(rename = "entity:updated")]
    Updated(EntityNode),
    #[serde(rename = "entity:deleted")]
    Deleted { id: Uuid },
}

impl EntityEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            EntityEvent::Added(_) => "entity:added",
            EntityEvent::Updated(_) => "entity:updated",
            EntityEvent::Deleted { .. } => "entity:deleted",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            EntityEvent::Added(node) | EntityEvent::Updated(node) => node.id,
            EntityEvent::Deleted { id } => *id,
        }
    }
}

/// Re-emits changes on a broadcast channel
///
/// Sending never fails the fan-out: with no live subscribers the event is
/// dropped, and lagging subscribers see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<EntityEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: EntityEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No subscribers for entity event");
        }
    }
}

#[async_trait]
impl EntityObserver for BroadcastObserver {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn on_add(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        self.emit(EntityEvent::Added(node.clone()));
        Ok(())
    }

    async fn on_update(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        self.emit(EntityEvent::Updated(node.clone()));
        Ok(())
    }

    async fn on_delete(&self, _service: &EntityService, node: &EntityNode) -> Result<()> {
        self.emit(EntityEvent::Deleted { id: node.id });
        Ok(())
    }
}
