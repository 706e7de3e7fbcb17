//! Service Layer Error Types
//!
//! Error types for entity service operations. Not-found and structural
//! failures carry the user-facing message in their `Display`.

use crate::db::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

/// Entity service operation errors
#[derive(Error, Debug)]
pub enum EntityServiceError {
    /// Node not found by id
    #[error("Entity not found: {id}")]
    NodeNotFound { id: Uuid },

    /// Descriptive failure for an operation on a missing or misplaced entity
    #[error("{0}")]
    InvalidOperation(String),

    /// A unit of work failed to commit
    #[error("{0}")]
    Commit(#[from] DatabaseError),

    /// Storage read failed outside a unit of work
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// An update observer failed; observers after it were not notified
    #[error("Observer '{observer}' failed: {message}")]
    ObserverFailed { observer: String, message: String },
}

impl EntityServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: Uuid) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Create an observer failed error
    pub fn observer_failed(observer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ObserverFailed {
            observer: observer.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for EntityServiceError {
    fn from(e: anyhow::Error) -> Self {
        Self::QueryFailed(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_errors_keep_database_message() {
        let err: EntityServiceError = DatabaseError::move_out_of_bounds("Signal 4").into();
        assert_eq!(err.to_string(), "Can't move Signal 4 outside bound of the children.");
    }
}
