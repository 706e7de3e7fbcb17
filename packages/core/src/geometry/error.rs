//! Geometry Error Types

use thiserror::Error;

/// Errors raised while deriving geometry
///
/// Callers in the enrichment and traversal paths treat these as data gaps and
/// degrade to an empty result instead of failing the operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Geometry has no coordinates at all
    #[error("Geometry has no coordinates")]
    Empty,

    /// A coordinate pair was malformed (wrong arity or non-finite)
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Line collapses to a single location, so it has no direction
    #[error("Line has no direction: all coordinates are identical")]
    DegenerateLine,

    /// Reprojection between coordinate systems failed
    #[error("Projection failed: {0}")]
    Projection(String),
}

impl GeometryError {
    /// Create an invalid coordinate error
    pub fn invalid_coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(msg.into())
    }

    /// Wrap a reprojection failure
    pub fn projection(err: impl std::fmt::Display) -> Self {
        Self::Projection(err.to_string())
    }
}
