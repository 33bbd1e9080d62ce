//! Binary file formats read and written by the import stages

pub mod codec;
pub mod crc;
pub mod io;
pub mod record;
pub mod varint;

// Stage inputs
pub mod coords;
pub mod distribution;
pub mod raw_routes;
pub mod raw_ways;
pub mod turn_restrictions;

// Stage outputs
pub mod address;
pub mod areas;
pub mod idmap;
pub mod ways;

pub use areas::{Area, Ring, RingRole};
pub use coords::{CoordFile, CoordRecord};
pub use distribution::{TypeDistribution, TypeDistributionFile};
pub use idmap::{IdMapEntry, ObjectKind};
pub use io::{FileScanner, FileSummary, FileWriter};
pub use raw_routes::{MemberKind, RouteMember, RouteRelation};
pub use raw_ways::WayFragment;
pub use record::{Record, RecordScanner, RecordWriter};
pub use turn_restrictions::{RestrictionKind, TurnRestriction};
pub use ways::{Way, WayNode};

/// Fixed file names inside the destination directory
pub mod names {
    pub const TYPES: &str = "types.json";
    pub const DISTRIBUTION: &str = "distribution.dat";
    pub const RAW_WAYS: &str = "rawways.dat";
    pub const RAW_TURN_RESTRICTIONS: &str = "rawturnrestr.dat";
    pub const RAW_ROUTES: &str = "rawroutes.dat";
    pub const COORDS: &str = "coord.dat";
    pub const WAY_AREAS: &str = "wayarea.dat";

    pub const WAYS: &str = "wayway.dat";
    pub const TURN_RESTRICTIONS: &str = "turnrestr.dat";
    pub const AREA_INDEX: &str = "areaarea.idx";
    pub const AREAS: &str = "areas.dat";
    pub const AREA_IDMAP: &str = "areas.idmap";
    pub const AREA_ADDRESSES: &str = "areaaddress.dat";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("bad magic: expected 0x{expected:08x}, got 0x{found:08x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported version {found} (expected {expected})")]
    UnsupportedVersion { expected: u16, found: u16 },

    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("varint overflow")]
    VarintOverflow,

    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: u64 },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("checksum mismatch: stored 0x{stored:016x}, computed 0x{computed:016x}")]
    ChecksumMismatch { stored: u64, computed: u64 },
}

impl From<FormatError> for scout_common::Error {
    fn from(err: FormatError) -> Self {
        scout_common::Error::DataIntegrity(err.to_string())
    }
}
