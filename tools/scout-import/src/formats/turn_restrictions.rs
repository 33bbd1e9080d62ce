//! rawturnrestr.dat / turnrestr.dat format - turn restrictions
//!
//! Both files share the record layout. The output file is sorted by
//! (via, from, to) so lookups by via node can binary search.
//!
//! Record (length-prefixed):
//!   kind:       u8  // 0 = forbid (no_*), 1 = allow (only_*)
//!   from_way:   zigzag varint
//!   via_node:   zigzag varint
//!   to_way:     zigzag varint

use scout_common::Result;
use std::path::Path;

use super::codec::{Decoder, Encoder};
use super::io::FileSummary;
use super::raw_ways::{NodeId, WayId};
use super::record::{self, Record};
use super::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RestrictionKind {
    Forbid = 0,
    Allow = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnRestriction {
    pub kind: RestrictionKind,
    pub from: WayId,
    pub via: NodeId,
    pub to: WayId,
}

impl TurnRestriction {
    pub fn forbid(from: WayId, via: NodeId, to: WayId) -> Self {
        Self {
            kind: RestrictionKind::Forbid,
            from,
            via,
            to,
        }
    }

    pub fn allow(from: WayId, via: NodeId, to: WayId) -> Self {
        Self {
            kind: RestrictionKind::Allow,
            from,
            via,
            to,
        }
    }

    /// `way` is this restriction's from or to way
    pub fn involves(&self, way: WayId) -> bool {
        self.from == way || self.to == way
    }

    fn sort_key(&self) -> (NodeId, WayId, WayId, RestrictionKind) {
        (self.via, self.from, self.to, self.kind)
    }
}

impl Record for TurnRestriction {
    const MAGIC: u32 = 0x5455524E; // "TURN"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_u8(self.kind as u8);
        enc.put_signed(self.from);
        enc.put_signed(self.via);
        enc.put_signed(self.to);
    }

    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, FormatError> {
        let kind = match dec.get_u8()? {
            0 => RestrictionKind::Forbid,
            1 => RestrictionKind::Allow,
            other => {
                return Err(FormatError::InvalidValue {
                    field: "restriction kind",
                    value: other as u64,
                })
            }
        };
        Ok(Self {
            kind,
            from: dec.get_signed()?,
            via: dec.get_signed()?,
            to: dec.get_signed()?,
        })
    }
}

/// Write the final restriction file, sorted by (via, from, to)
pub fn write_sorted<P: AsRef<Path>>(
    path: P,
    restrictions: &[TurnRestriction],
) -> Result<FileSummary> {
    let mut sorted = restrictions.to_vec();
    sorted.sort_by_key(TurnRestriction::sort_key);
    record::write_all(path, &sorted)
}

pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<TurnRestriction>> {
    record::read_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_output_sorted_by_via() {
        let tmp = NamedTempFile::new().unwrap();
        let rules = vec![
            TurnRestriction::forbid(5, 30, 6),
            TurnRestriction::allow(1, 10, 2),
            TurnRestriction::forbid(0, 30, 9),
        ];
        write_sorted(tmp.path(), &rules).unwrap();

        let back = read_all(tmp.path()).unwrap();
        let keys: Vec<_> = back.iter().map(|r| (r.via, r.from)).collect();
        assert_eq!(keys, vec![(10, 1), (30, 0), (30, 5)]);
        assert_eq!(back[0].kind, RestrictionKind::Allow);
        record::verify::<TurnRestriction, _>(tmp.path()).unwrap();
    }

    #[test]
    fn test_involves() {
        let r = TurnRestriction::forbid(1, 3, 2);
        assert!(r.involves(1));
        assert!(r.involves(2));
        assert!(!r.involves(3));
    }
}
