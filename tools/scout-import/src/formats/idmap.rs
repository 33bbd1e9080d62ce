//! areas.idmap format - object id to data file offset
//!
//! Record (length-prefixed, fixed content):
//!   id:      i64
//!   kind:    u8   // 0 = node, 1 = way, 2 = area
//!   offset:  u64  // offset of the record in the data file

use super::codec::{Decoder, Encoder};
use super::record::Record;
use super::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    Node = 0,
    Way = 1,
    Area = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapEntry {
    pub id: i64,
    pub kind: ObjectKind,
    pub offset: u64,
}

impl Record for IdMapEntry {
    const MAGIC: u32 = 0x49444D50; // "IDMP"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_i64(self.id);
        enc.put_u8(self.kind as u8);
        enc.put_u64(self.offset);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let id = dec.get_i64()?;
        let kind = match dec.get_u8()? {
            0 => ObjectKind::Node,
            1 => ObjectKind::Way,
            2 => ObjectKind::Area,
            other => {
                return Err(FormatError::InvalidValue {
                    field: "object kind",
                    value: other as u64,
                })
            }
        };
        Ok(Self {
            id,
            kind,
            offset: dec.get_u64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::record::{read_all, write_all};
    use tempfile::NamedTempFile;

    #[test]
    fn test_idmap_entries() {
        let entries = vec![
            IdMapEntry { id: 4, kind: ObjectKind::Area, offset: 16 },
            IdMapEntry { id: -4, kind: ObjectKind::Way, offset: 1 << 33 },
        ];
        let tmp = NamedTempFile::new().unwrap();
        write_all(tmp.path(), &entries).unwrap();
        assert_eq!(read_all::<IdMapEntry, _>(tmp.path()).unwrap(), entries);
    }
}
