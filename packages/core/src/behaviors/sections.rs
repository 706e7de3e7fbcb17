//! Editing sections shown per entity type

use crate::models::EntityTypeSection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    ActiveDays,
    Communication,
    Controller,
    DeviceManager,
    Entity,
    FtpCredentials,
    IdMapping,
    PrimarySecondaryStreetNames,
    SnmpV3,
    Bearing,
    SpeedLimit,
    SpeedSegment,
    Plans,
}

impl SectionKind {
    pub const fn id(self) -> Uuid {
        Uuid::from_u128(match self {
            SectionKind::ActiveDays => 0x6326ed66_30bf_401c_9301_9775144cf25e,
            SectionKind::Communication => 0x0d55dde1_cfe2_441b_9351_0d4405a69a25,
            SectionKind::Controller => 0x6c74ca50_69ca_4aa1_bfb8_1fbecbb53b88,
            SectionKind::DeviceManager => 0x09e717e0_c78d_46ef_ace9_1710733bc32b,
            SectionKind::Entity => 0xe01326f7_5693_4c3c_964b_4ee57923be6d,
            SectionKind::FtpCredentials => 0x1b5e2856_06af_48e3_aaeb_88ec7019fc66,
            SectionKind::IdMapping => 0xa9af811d_8632_4797_9120_3aa447870edd,
            SectionKind::PrimarySecondaryStreetNames => 0xe1f5b5a5_6733_4f13_ab25_f7a2f290bd15,
            SectionKind::SnmpV3 => 0x2830f4dd_9dc4_492f_804a_070c44f49fac,
            SectionKind::Bearing => 0x446f023a_5d1b_4ed8_a926_b7fa16a1d519,
            SectionKind::SpeedLimit => 0x37a322ec_ba02_4f67_b4b4_8823593900d3,
            SectionKind::SpeedSegment => 0xb82debec_4bed_4a67_a4d1_d8462ca1f3a1,
            SectionKind::Plans => 0xe0ea298f_d473_4cb4_b96d_33bf09191550,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            SectionKind::ActiveDays => "Active Days",
            SectionKind::Communication => "Communication",
            SectionKind::Controller => "Controller",
            SectionKind::DeviceManager => "Device Manager",
            SectionKind::Entity => "Entity",
            SectionKind::FtpCredentials => "FTP Credentials",
            SectionKind::IdMapping => "Id Mapping",
            SectionKind::PrimarySecondaryStreetNames => "Primary Secondary Street Names",
            SectionKind::SnmpV3 => "SNMPv3",
            SectionKind::Bearing => "Bearing",
            SectionKind::SpeedLimit => "Speed Limit",
            SectionKind::SpeedSegment => "Speed Segment",
            SectionKind::Plans => "Plans",
        }
    }
}

const FTP_USERNAME: Uuid = Uuid::from_u128(0x215f0bbe_8e17_4564_83cf_ad758b40bfeb);
const FTP_PASSWORD: Uuid = Uuid::from_u128(0xe5f340aa_f50c_4b71_a06f_ad0a3fcaf688);

/// Section descriptor, with sub-sections where the section has any
pub fn section(kind: SectionKind) -> EntityTypeSection {
    let sections = match kind {
        SectionKind::FtpCredentials => vec![
            leaf(FTP_USERNAME, "Username", false),
            leaf(FTP_PASSWORD, "Password", false),
        ],
        _ => Vec::new(),
    };
    EntityTypeSection {
        id: kind.id(),
        name: kind.name().to_string(),
        enabled: true,
        sections,
    }
}

fn leaf(id: Uuid, name: &str, enabled: bool) -> EntityTypeSection {
    EntityTypeSection {
        id,
        name: name.to_string(),
        enabled,
        sections: Vec::new(),
    }
}
