//! wayarea.dat / areas.dat format - areas with their rings
//!
//! wayarea.dat is the input of the area index stage, areas.dat the filtered
//! copy the index points into. Both share the record layout.
//!
//! Record (length-prefixed):
//!   id:         zigzag varint
//!   type_id:    varint
//!   ring_count: varint
//!   rings:
//!     role:       u8    // 0 = master, 1 = outer, 2 = inner
//!     type_id:    varint
//!     features:   varint count, (kind u8, string)*
//!     node_count: varint
//!     nodes:      (serial varint, lat i32, lon i32)*

use super::codec::{Decoder, Encoder};
use super::record::Record;
use super::FormatError;
use crate::features::FeatureValueBuffer;
use crate::geo::{GeoBox, GeoCoord};
use crate::types::TypeId;

pub type AreaId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RingRole {
    /// Attribute carrier of a multipolygon; has no geometry of its own
    Master = 0,
    Outer = 1,
    Inner = 2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingNode {
    /// Non-zero for nodes that carried tags in the source data
    pub serial: u32,
    pub coord: GeoCoord,
}

impl RingNode {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            serial: 0,
            coord: GeoCoord::new(lat, lon),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub role: RingRole,
    pub type_id: TypeId,
    pub features: FeatureValueBuffer,
    pub nodes: Vec<RingNode>,
}

impl Ring {
    pub fn new(role: RingRole, type_id: TypeId, nodes: Vec<RingNode>) -> Self {
        Self {
            role,
            type_id,
            features: FeatureValueBuffer::new(),
            nodes,
        }
    }

    pub fn is_master(&self) -> bool {
        self.role == RingRole::Master
    }

    pub fn bbox(&self) -> Option<GeoBox> {
        GeoBox::from_coords(self.nodes.iter().map(|n| n.coord))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub id: AreaId,
    pub type_id: TypeId,
    pub rings: Vec<Ring>,
}

impl Area {
    /// Area made of a single outer ring carrying the attributes
    pub fn simple(id: AreaId, type_id: TypeId, nodes: Vec<RingNode>) -> Self {
        Self {
            id,
            type_id,
            rings: vec![Ring::new(RingRole::Outer, type_id, nodes)],
        }
    }

    /// Bounding box over all geometry rings; `None` when there is no geometry
    pub fn bbox(&self) -> Option<GeoBox> {
        GeoBox::from_coords(
            self.rings
                .iter()
                .filter(|r| !r.is_master())
                .flat_map(|r| r.nodes.iter().map(|n| n.coord)),
        )
    }

    pub fn geometry_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|r| !r.is_master())
    }

    pub fn node_count(&self) -> usize {
        self.rings.iter().map(|r| r.nodes.len()).sum()
    }
}

impl Record for Area {
    const MAGIC: u32 = 0x41524541; // "AREA"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_signed(self.id);
        enc.put_varint(self.type_id as u64);
        enc.put_varint(self.rings.len() as u64);
        for ring in &self.rings {
            enc.put_u8(ring.role as u8);
            enc.put_varint(ring.type_id as u64);
            enc.put_features(&ring.features);
            enc.put_varint(ring.nodes.len() as u64);
            for node in &ring.nodes {
                enc.put_varint(node.serial as u64);
                enc.put_coord(node.coord);
            }
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let id = dec.get_signed()?;
        let type_id = dec.get_varint_u16("type id")?;
        let ring_count = dec.get_len("ring count")?;

        let mut rings = Vec::with_capacity(ring_count);
        for _ in 0..ring_count {
            let role = match dec.get_u8()? {
                0 => RingRole::Master,
                1 => RingRole::Outer,
                2 => RingRole::Inner,
                other => {
                    return Err(FormatError::InvalidValue {
                        field: "ring role",
                        value: other as u64,
                    })
                }
            };
            let ring_type = dec.get_varint_u16("ring type id")?;
            let features = dec.get_features()?;
            let node_count = dec.get_len("node count")?;
            let mut nodes = Vec::with_capacity(node_count);
            for _ in 0..node_count {
                let serial = dec.get_varint()?;
                let serial = u32::try_from(serial).map_err(|_| FormatError::InvalidValue {
                    field: "node serial",
                    value: serial,
                })?;
                nodes.push(RingNode {
                    serial,
                    coord: dec.get_coord()?,
                });
            }
            rings.push(Ring {
                role,
                type_id: ring_type,
                features,
                nodes,
            });
        }

        Ok(Self { id, type_id, rings })
    }
}
