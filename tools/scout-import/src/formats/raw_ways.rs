//! rawways.dat format - way fragments as produced by the parser stage
//!
//! Record (length-prefixed):
//!   id:         zigzag varint
//!   type_id:    varint
//!   flags:      u8      // bit 0 = oneway, bit 1 = area
//!   features:   varint count, (kind u8, string)*
//!   node_count: varint
//!   nodes:      zigzag varint deltas from the previous node id (first from 0)

use super::codec::{Decoder, Encoder};
use super::record::Record;
use super::FormatError;
use crate::features::FeatureValueBuffer;
use crate::types::TypeId;

pub type WayId = i64;
pub type NodeId = i64;

const FLAG_ONEWAY: u8 = 0x01;
const FLAG_AREA: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WayFragment {
    pub id: WayId,
    pub type_id: TypeId,
    pub features: FeatureValueBuffer,
    pub nodes: Vec<NodeId>,
    pub oneway: bool,
    pub is_area: bool,
}

impl WayFragment {
    pub fn new(id: WayId, type_id: TypeId, nodes: Vec<NodeId>) -> Self {
        Self {
            id,
            type_id,
            features: FeatureValueBuffer::new(),
            nodes,
            oneway: false,
            is_area: false,
        }
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// First and last node are the same id
    pub fn is_circular(&self) -> bool {
        self.nodes.len() > 1 && self.nodes.first() == self.nodes.last()
    }

    /// True when `node` is the first or last node
    pub fn terminates_at(&self, node: NodeId) -> bool {
        self.first_node() == Some(node) || self.last_node() == Some(node)
    }
}

impl Record for WayFragment {
    const MAGIC: u32 = 0x52574159; // "RWAY"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_signed(self.id);
        enc.put_varint(self.type_id as u64);

        let mut flags = 0u8;
        if self.oneway {
            flags |= FLAG_ONEWAY;
        }
        if self.is_area {
            flags |= FLAG_AREA;
        }
        enc.put_u8(flags);
        enc.put_features(&self.features);

        enc.put_varint(self.nodes.len() as u64);
        let mut prev = 0i64;
        for &node in &self.nodes {
            enc.put_signed(node.wrapping_sub(prev));
            prev = node;
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let id = dec.get_signed()?;
        let type_id = dec.get_varint_u16("type id")?;
        let flags = dec.get_u8()?;
        let features = dec.get_features()?;

        let count = dec.get_len("node count")?;
        let mut nodes = Vec::with_capacity(count);
        let mut prev = 0i64;
        for _ in 0..count {
            prev = prev.wrapping_add(dec.get_signed()?);
            nodes.push(prev);
        }

        Ok(Self {
            id,
            type_id,
            features,
            nodes,
            oneway: flags & FLAG_ONEWAY != 0,
            is_area: flags & FLAG_AREA != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;
    use crate::formats::record::{read_all, write_all};
    use tempfile::NamedTempFile;

    #[test]
    fn test_fragment_file() {
        let mut a = WayFragment::new(10, 3, vec![5_000_000_001, 5_000_000_000, 7]);
        a.oneway = true;
        a.features.set(FeatureKind::Name, "High Street");
        let mut b = WayFragment::new(-11, 4, vec![1, 2, 3, 1]);
        b.is_area = true;

        let tmp = NamedTempFile::new().unwrap();
        let summary = write_all(tmp.path(), &[a.clone(), b.clone()]).unwrap();
        assert_eq!(summary.count, 2);

        let back: Vec<WayFragment> = read_all(tmp.path()).unwrap();
        assert_eq!(back, vec![a, b]);
        assert!(back[1].is_circular());
        assert!(!back[0].is_circular());
    }

    #[test]
    fn test_endpoints() {
        let way = WayFragment::new(1, 1, vec![4, 5, 6]);
        assert_eq!(way.first_node(), Some(4));
        assert_eq!(way.last_node(), Some(6));
        assert!(way.terminates_at(6));
        assert!(!way.terminates_at(5));
        assert!(!WayFragment::new(2, 1, vec![9]).is_circular());
    }
}
