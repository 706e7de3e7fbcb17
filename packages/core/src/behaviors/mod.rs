//! Entity Type Behaviors
//!
//! The type registry for the entity tree:
//!
//! - [`EntityKind`] - tagged union over every node type, with ids, flags and
//!   the capability tags that decide which kinds nest under which
//! - [`enrich`] - per-kind geometry derivation run on every add and update
//! - [`EntityTypeRegistry`] - catalog lookup, parent-type queries and the
//!   startup reconciliation of the persisted catalog
//! - [`sections`] - editing sections attached to each type

mod enrich;
mod kind;
mod registry;
pub mod sections;

pub use enrich::{enrich, LINE_GEOFENCE_HALF_WIDTH_FEET, POINT_GEOFENCE_RADIUS_FEET, TRIP_POINT_SPACING_FEET};
pub use kind::{Capability, EntityKind};
pub use registry::EntityTypeRegistry;
pub use sections::SectionKind;
