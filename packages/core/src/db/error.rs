//! Database Error Types
//!
//! This module defines error types for storage operations, covering backend
//! failures and the structural-invariant violations raised from buffered
//! unit-of-work commands.

use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
///
/// Structural violations are raised from inside a buffered command and fail
/// the whole `save_changes` call that ran it.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open or initialize the backend
    #[error("Failed to initialize database: {0}")]
    InitializationFailed(String),

    /// A parent update matched no document
    #[error("Parent {parent} wasn't updated")]
    ParentNotUpdated { parent: Uuid },

    /// A child update matched no document
    #[error("Child {child} wasn't updated")]
    ChildNotUpdated { child: Uuid },

    /// Move or copy of an entity that no longer exists
    #[error("Entity {name} couldn't be {action} because the entity doesn't exist")]
    EntityMissing { name: String, action: String },

    /// Reorder target fell outside the parent's children
    #[error("Can't move {name} outside bound of the children.")]
    MoveOutOfBounds { name: String },

    /// Any other structural invariant violation
    #[error("Structural constraint violated: {0}")]
    StructuralViolation(String),

    /// A unit-of-work commit stopped at a failing command
    #[error("Commit failed after {applied} of {total} commands: {message}")]
    CommitFailed {
        applied: usize,
        total: usize,
        message: String,
    },

    /// Backend query or write failed
    #[error("Database operation failed: {0}")]
    QueryFailed(String),
}

impl DatabaseError {
    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a parent-not-updated error
    pub fn parent_not_updated(parent: Uuid) -> Self {
        Self::ParentNotUpdated { parent }
    }

    /// Create a child-not-updated error
    pub fn child_not_updated(child: Uuid) -> Self {
        Self::ChildNotUpdated { child }
    }

    /// Create an entity missing error for `action` ("moved", "copied")
    pub fn entity_missing(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self::EntityMissing {
            name: name.into(),
            action: action.into(),
        }
    }

    /// Create a move out of bounds error
    pub fn move_out_of_bounds(name: impl Into<String>) -> Self {
        Self::MoveOutOfBounds { name: name.into() }
    }

    /// Create a structural violation error
    pub fn structural_violation(msg: impl Into<String>) -> Self {
        Self::StructuralViolation(msg.into())
    }

    /// Create a commit failed error
    pub fn commit_failed(applied: usize, total: usize, message: impl Into<String>) -> Self {
        Self::CommitFailed {
            applied,
            total,
            message: message.into(),
        }
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }
}

impl From<anyhow::Error> for DatabaseError {
    fn from(e: anyhow::Error) -> Self {
        Self::QueryFailed(format!("{e:#}"))
    }
}
