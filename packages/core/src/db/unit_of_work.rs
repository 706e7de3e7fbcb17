//! Unit of Work
//!
//! Structural mutations are not applied when they are requested. The tree
//! store appends them to a [`UnitOfWork`] as deferred commands, and nothing
//! touches the collection until [`UnitOfWork::save_changes`] runs them.
//!
//! # Commit Semantics
//!
//! Commands run in the order they were added, one at a time. The first
//! failing command stops the commit and is reported as
//! [`DatabaseError::CommitFailed`]. Commands that already ran stay applied:
//! there is no rollback, and cross-document consistency is best effort.

use super::{DatabaseError, EntityCollection};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

type Command = Box<dyn FnOnce(Arc<dyn EntityCollection>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Buffer of deferred storage commands
pub struct UnitOfWork {
    collection: Arc<dyn EntityCollection>,
    commands: Vec<(String, Command)>,
}

impl UnitOfWork {
    pub fn new(collection: Arc<dyn EntityCollection>) -> Self {
        Self {
            collection,
            commands: Vec::new(),
        }
    }

    /// Queue a command; `label` names it in commit failure messages
    pub fn add_command<F, Fut>(&mut self, label: impl Into<String>, command: F)
    where
        F: FnOnce(Arc<dyn EntityCollection>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.commands
            .push((label.into(), Box::new(move |collection| Box::pin(command(collection)))));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every queued command, stopping at the first failure
    ///
    /// Returns the number of commands applied. An empty unit of work commits
    /// trivially.
    pub async fn save_changes(&mut self) -> Result<usize, DatabaseError> {
        let commands = std::mem::take(&mut self.commands);
        let total = commands.len();

        for (applied, (label, command)) in commands.into_iter().enumerate() {
            if let Err(e) = command(self.collection.clone()).await {
                tracing::warn!(
                    command = %label,
                    applied,
                    total,
                    "Unit of work commit failed: {:#}",
                    e
                );
                return Err(DatabaseError::commit_failed(
                    applied,
                    total,
                    format!("{label}: {e:#}"),
                ));
            }
        }

        tracing::debug!(total, "Unit of work committed");
        Ok(total)
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("commands", &self.commands.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryCollection, NodeFilter};
    use crate::models::{EntityNode, EntityTypeId};
    use anyhow::Result;
    use uuid::Uuid;

    fn node(name: &str) -> EntityNode {
        EntityNode::new(EntityTypeId::new(Uuid::new_v4(), "Signal"), name)
    }

    #[tokio::test]
    async fn test_nothing_applies_before_commit() -> Result<()> {
        let collection = Arc::new(MemoryCollection::new());
        let mut uow = UnitOfWork::new(collection.clone());
        let n = node("A");
        uow.add_command("insert", move |c| async move { c.insert(n).await });

        assert!(collection.is_empty().await);
        assert_eq!(uow.save_changes().await?, 1);
        assert_eq!(collection.len().await, 1);
        assert!(uow.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_stops_commit_without_rollback() -> Result<()> {
        let collection = Arc::new(MemoryCollection::new());
        let mut uow = UnitOfWork::new(collection.clone());
        let first = node("first");
        let last = node("last");
        uow.add_command("insert first", move |c| async move { c.insert(first).await });
        uow.add_command("explode", |_| async { Result::<()>::Err(anyhow::anyhow!("boom")) });
        uow.add_command("insert last", move |c| async move { c.insert(last).await });

        let err = uow.save_changes().await.unwrap_err();
        match err {
            DatabaseError::CommitFailed { applied, total, message } => {
                assert_eq!(applied, 1);
                assert_eq!(total, 3);
                assert!(message.contains("explode"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let names: Vec<String> = collection
            .find(&NodeFilter::All)
            .await?
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["first"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_commit_succeeds() -> Result<()> {
        let mut uow = UnitOfWork::new(Arc::new(MemoryCollection::new()));
        assert_eq!(uow.save_changes().await?, 0);
        Ok(())
    }
}
