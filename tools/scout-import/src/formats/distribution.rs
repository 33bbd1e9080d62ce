//! distribution.dat format - prior object counts per type
//!
//! Record (length-prefixed):
//!   type_id:     varint
//!   way_count:   varint
//!   area_count:  varint

use rustc_hash::FxHashMap;
use scout_common::Result;
use std::path::Path;

use super::codec::{Decoder, Encoder};
use super::record::{self, Record};
use super::FormatError;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDistribution {
    pub type_id: TypeId,
    pub way_count: u64,
    pub area_count: u64,
}

impl Record for TypeDistribution {
    const MAGIC: u32 = 0x54445354; // "TDST"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_varint(self.type_id as u64);
        enc.put_varint(self.way_count);
        enc.put_varint(self.area_count);
    }

    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, FormatError> {
        Ok(Self {
            type_id: dec.get_varint_u16("type id")?,
            way_count: dec.get_varint()?,
            area_count: dec.get_varint()?,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct TypeDistributionFile {
    counts: FxHashMap<TypeId, TypeDistribution>,
}

impl TypeDistributionFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let entries: Vec<TypeDistribution> = record::read_all(path)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries<I: IntoIterator<Item = TypeDistribution>>(entries: I) -> Self {
        Self {
            counts: entries.into_iter().map(|e| (e.type_id, e)).collect(),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut entries: Vec<_> = self.counts.values().copied().collect();
        entries.sort_by_key(|e| e.type_id);
        record::write_all(path, &entries)?;
        Ok(())
    }

    /// Unknown types count as zero
    pub fn way_count(&self, type_id: TypeId) -> u64 {
        self.counts.get(&type_id).map_or(0, |e| e.way_count)
    }

    pub fn area_count(&self, type_id: TypeId) -> u64 {
        self.counts.get(&type_id).map_or(0, |e| e.area_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_counts() {
        let tmp = NamedTempFile::new().unwrap();
        TypeDistributionFile::from_entries([
            TypeDistribution { type_id: 2, way_count: 1_000_000, area_count: 3 },
            TypeDistribution { type_id: 1, way_count: 12, area_count: 0 },
        ])
        .write(tmp.path())
        .unwrap();

        let dist = TypeDistributionFile::load(tmp.path()).unwrap();
        assert_eq!(dist.way_count(2), 1_000_000);
        assert_eq!(dist.area_count(2), 3);
        assert_eq!(dist.way_count(1), 12);
        assert_eq!(dist.way_count(9), 0);
    }
}
