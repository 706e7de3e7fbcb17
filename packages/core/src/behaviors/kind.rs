//! Entity kinds
//!
//! The type catalog is code-defined. Every node type the tree knows about is
//! one [`EntityKind`] variant with a fixed id, display name, flags, spatial
//! shape and editing sections. Parent/child legality is declared per kind as
//! a set of [`Capability`] tags ("may live under a System", "may live under
//! an Intersection", ...), and the parent-to-children map is derived from
//! those tags.

use super::sections::{self, SectionKind};
use crate::models::{EntityType, EntityTypeId, GeoSpatialType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    System,
    Corridor,
    Intersection,
    Signal,
    Ess,
    Rsu,
    Approach,
    StreetSegment,
    SpeedSegment,
    Detector,
}

/// "May be nested under ..." tags
///
/// A parent kind accepts exactly one capability. A child kind can carry
/// several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SystemChildren,
    CorridorChildren,
    IntersectionChildren,
    ApproachChildren,
    StreetSegmentChildren,
    SignalChildren,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::System,
        EntityKind::Corridor,
        EntityKind::Intersection,
        EntityKind::Signal,
        EntityKind::Ess,
        EntityKind::Rsu,
        EntityKind::Approach,
        EntityKind::StreetSegment,
        EntityKind::SpeedSegment,
        EntityKind::Detector,
    ];

    pub const fn id(self) -> Uuid {
        Uuid::from_u128(match self {
            EntityKind::System => 0xa7432a6e_1569_42f9_bc7e_10397f65f6b7,
            EntityKind::Corridor => 0x4fcb475e_72a3_4b71_a66d_fa6629129137,
            EntityKind::Intersection => 0x1231b98b_7320_41b6_a857_9c6097b20628,
            EntityKind::Signal => 0x4cbc4cfa_5b47_4f42_acad_dd6f1d6bef2d,
            EntityKind::Ess => 0x37855e7c_0750_4a4f_80bc_3f00c90b15ce,
            EntityKind::Rsu => 0xd5788aa1_95f7_4eb4_9954_6200635dda59,
            EntityKind::Approach => 0x8adb049d_2958_4210_af9c_412ec5c5726e,
            EntityKind::StreetSegment => 0x93963755_19fc_41fb_87af_e8ab2b1965aa,
            EntityKind::SpeedSegment => 0x1313f542_670f_46dd_94ca_179b56240a6e,
            EntityKind::Detector => 0x95b371e8_461f_4c4a_9fda_b743170dfd39,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            EntityKind::System => "System",
            EntityKind::Corridor => "Corridor",
            EntityKind::Intersection => "Intersection",
            EntityKind::Signal => "Signal",
            EntityKind::Ess => "Environmental Sensor",
            EntityKind::Rsu => "Rsu",
            EntityKind::Approach => "Approach",
            EntityKind::StreetSegment => "Street Segment",
            EntityKind::SpeedSegment => "Speed Segment",
            EntityKind::Detector => "Detector",
        }
    }

    /// Type reference as stamped on nodes
    pub fn type_id(self) -> EntityTypeId {
        EntityTypeId::new(self.id(), self.name())
    }

    pub fn from_type_id(id: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn spatial_type(self) -> GeoSpatialType {
        match self {
            EntityKind::System | EntityKind::Corridor => GeoSpatialType::None,
            EntityKind::Signal | EntityKind::Ess | EntityKind::Rsu => GeoSpatialType::Point,
            EntityKind::Approach | EntityKind::StreetSegment | EntityKind::SpeedSegment => {
                GeoSpatialType::LineString
            }
            EntityKind::Intersection | EntityKind::Detector => GeoSpatialType::Polygon,
        }
    }

    pub fn visible(self) -> bool {
        self != EntityKind::SpeedSegment
    }

    pub fn copyable(self) -> bool {
        matches!(self, EntityKind::Signal | EntityKind::Ess)
    }

    pub fn movable(self) -> bool {
        matches!(self, EntityKind::Signal | EntityKind::Ess | EntityKind::Rsu)
    }

    fn sections(self) -> &'static [SectionKind] {
        use SectionKind::*;
        match self {
            EntityKind::System | EntityKind::Corridor => &[Entity],
            EntityKind::Intersection => &[Entity, PrimarySecondaryStreetNames, IdMapping],
            EntityKind::Signal | EntityKind::Detector => &[Entity, IdMapping],
            EntityKind::Ess => &[Entity, Communication, Controller, DeviceManager, FtpCredentials],
            EntityKind::Rsu => &[Entity, SnmpV3],
            EntityKind::Approach => &[Entity, Bearing, Plans],
            EntityKind::StreetSegment => &[Entity, SpeedLimit],
            EntityKind::SpeedSegment => &[Entity, SpeedLimit, SectionKind::SpeedSegment],
        }
    }

    /// Parents this kind may be nested under, as capability tags
    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            EntityKind::System => &[],
            EntityKind::Corridor => &[SystemChildren],
            EntityKind::Intersection => &[SystemChildren, CorridorChildren],
            EntityKind::Signal | EntityKind::Ess => &[SystemChildren, CorridorChildren, IntersectionChildren],
            EntityKind::Rsu => &[IntersectionChildren, SignalChildren],
            EntityKind::Approach => &[IntersectionChildren],
            EntityKind::StreetSegment => &[ApproachChildren],
            EntityKind::SpeedSegment => &[SystemChildren, CorridorChildren],
            EntityKind::Detector => &[StreetSegmentChildren],
        }
    }

    /// Capability a child must carry to be nested under this kind
    pub fn accepts(self) -> Option<Capability> {
        match self {
            EntityKind::System => Some(Capability::SystemChildren),
            EntityKind::Corridor => Some(Capability::CorridorChildren),
            EntityKind::Intersection | EntityKind::SpeedSegment => Some(Capability::IntersectionChildren),
            EntityKind::Approach => Some(Capability::ApproachChildren),
            EntityKind::StreetSegment => Some(Capability::StreetSegmentChildren),
            EntityKind::Signal => Some(Capability::SignalChildren),
            EntityKind::Ess | EntityKind::Rsu | EntityKind::Detector => None,
        }
    }

    /// Kinds that may be nested directly under this one
    pub fn child_kinds(self) -> Vec<EntityKind> {
        let Some(accepted) = self.accepts() else {
            return Vec::new();
        };
        Self::ALL
            .into_iter()
            .filter(|child| child.capabilities().contains(&accepted))
            .collect()
    }

    /// Persistable descriptor for this kind
    pub fn entity_type(self) -> EntityType {
        EntityType {
            id: self.id(),
            name: self.name().to_string(),
            icon: None,
            system_type: true,
            visible: self.visible(),
            copyable: self.copyable(),
            movable: self.movable(),
            spatial_type: Some(self.spatial_type()),
            sections: self.sections().iter().map(|s| sections::section(*s)).collect(),
            children: self.child_kinds().into_iter().map(EntityKind::id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_and_names_are_unique() {
        let ids: HashSet<Uuid> = EntityKind::ALL.iter().map(|k| k.id()).collect();
        let names: HashSet<&str> = EntityKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(ids.len(), EntityKind::ALL.len());
        assert_eq!(names.len(), EntityKind::ALL.len());
        assert_eq!(
            EntityKind::System.id().to_string(),
            "a7432a6e-1569-42f9-bc7e-10397f65f6b7"
        );
    }

    #[test]
    fn test_lookup_round_trips() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_type_id(kind.id()), Some(kind));
            assert_eq!(EntityKind::from_name(&kind.name().to_uppercase()), Some(kind));
        }
        assert_eq!(EntityKind::from_type_id(Uuid::new_v4()), None);
    }

    #[test]
    fn test_capability_wiring() {
        use EntityKind::*;
        let set = |kinds: Vec<EntityKind>| kinds.into_iter().collect::<HashSet<_>>();

        assert_eq!(
            set(System.child_kinds()),
            set(vec![Corridor, Ess, Intersection, Signal, SpeedSegment])
        );
        assert_eq!(set(Corridor.child_kinds()), set(vec![Ess, Intersection, Signal, SpeedSegment]));
        assert_eq!(set(Intersection.child_kinds()), set(vec![Approach, Ess, Signal, Rsu]));
        assert_eq!(set(SpeedSegment.child_kinds()), set(vec![Approach, Ess, Signal, Rsu]));
        assert_eq!(Approach.child_kinds(), vec![StreetSegment]);
        assert_eq!(StreetSegment.child_kinds(), vec![Detector]);
        assert_eq!(Signal.child_kinds(), vec![Rsu]);
        assert!(Detector.child_kinds().is_empty());
    }

    #[test]
    fn test_flags() {
        let invisible: Vec<_> = EntityKind::ALL.into_iter().filter(|k| !k.visible()).collect();
        assert_eq!(invisible, vec![EntityKind::SpeedSegment]);

        let rsu = EntityKind::Rsu.entity_type();
        assert!(rsu.movable && !rsu.copyable && rsu.system_type);
        assert_eq!(rsu.spatial_type, Some(GeoSpatialType::Point));
        assert_eq!(rsu.sections.len(), 2);
        assert_eq!(rsu.sections[1].name, "SNMPv3");
    }
}
