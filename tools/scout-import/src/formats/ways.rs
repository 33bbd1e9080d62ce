//! wayway.dat format - merged, length-bounded ways with resolved nodes
//!
//! Record (length-prefixed):
//!   id:         zigzag varint
//!   type_id:    varint
//!   flags:      u8      // bit 0 = oneway
//!   features:   varint count, (kind u8, string)*
//!   node_count: varint
//!   nodes:      (id delta zigzag varint, serial varint, lat i32, lon i32)*

use super::codec::{Decoder, Encoder};
use super::raw_ways::{NodeId, WayId};
use super::record::Record;
use super::FormatError;
use crate::features::FeatureValueBuffer;
use crate::geo::GeoCoord;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayNode {
    pub id: NodeId,
    pub serial: u32,
    pub coord: GeoCoord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: WayId,
    pub type_id: TypeId,
    pub features: FeatureValueBuffer,
    pub oneway: bool,
    pub nodes: Vec<WayNode>,
}

impl Way {
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Great-circle length in meters
    pub fn length_m(&self) -> f64 {
        self.nodes
            .windows(2)
            .map(|w| crate::geo::haversine_distance(w[0].coord, w[1].coord))
            .sum()
    }
}

impl Record for Way {
    const MAGIC: u32 = 0x57415957; // "WAYW"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_signed(self.id);
        enc.put_varint(self.type_id as u64);
        enc.put_u8(u8::from(self.oneway));
        enc.put_features(&self.features);

        enc.put_varint(self.nodes.len() as u64);
        let mut prev = 0i64;
        for node in &self.nodes {
            enc.put_signed(node.id.wrapping_sub(prev));
            enc.put_varint(node.serial as u64);
            enc.put_coord(node.coord);
            prev = node.id;
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let id = dec.get_signed()?;
        let type_id = dec.get_varint_u16("type id")?;
        let oneway = dec.get_u8()? & 0x01 != 0;
        let features = dec.get_features()?;

        let count = dec.get_len("node count")?;
        let mut nodes = Vec::with_capacity(count);
        let mut prev = 0i64;
        for _ in 0..count {
            prev = prev.wrapping_add(dec.get_signed()?);
            let serial = dec.get_varint()?;
            let serial = u32::try_from(serial).map_err(|_| FormatError::InvalidValue {
                field: "node serial",
                value: serial,
            })?;
            nodes.push(WayNode {
                id: prev,
                serial,
                coord: dec.get_coord()?,
            });
        }

        Ok(Self {
            id,
            type_id,
            features,
            oneway,
            nodes,
        })
    }
}
