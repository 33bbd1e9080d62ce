//! areaaddress.dat format - addresses and POIs found while copying areas
//!
//! Debug output only; nothing in the import reads it back.
//!
//! Record (length-prefixed):
//!   offset:      varint   // source offset of the area
//!   area_id:     zigzag varint
//!   type_id:     varint
//!   name:        string
//!   postal_code: string
//!   location:    string
//!   address:     string
//!   node_count:  varint
//!   nodes:       (lat i32, lon i32)*

use super::codec::{Decoder, Encoder};
use super::record::Record;
use super::FormatError;
use crate::geo::GeoCoord;
use crate::types::TypeId;

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub offset: u64,
    pub area_id: i64,
    pub type_id: TypeId,
    pub name: String,
    pub postal_code: String,
    pub location: String,
    pub address: String,
    pub nodes: Vec<GeoCoord>,
}

impl Record for AddressRecord {
    const MAGIC: u32 = 0x41444452; // "ADDR"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_varint(self.offset);
        enc.put_signed(self.area_id);
        enc.put_varint(self.type_id as u64);
        enc.put_str(&self.name);
        enc.put_str(&self.postal_code);
        enc.put_str(&self.location);
        enc.put_str(&self.address);
        enc.put_varint(self.nodes.len() as u64);
        for &coord in &self.nodes {
            enc.put_coord(coord);
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let offset = dec.get_varint()?;
        let area_id = dec.get_signed()?;
        let type_id = dec.get_varint_u16("type id")?;
        let name = dec.get_str()?;
        let postal_code = dec.get_str()?;
        let location = dec.get_str()?;
        let address = dec.get_str()?;
        let count = dec.get_len("node count")?;
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(dec.get_coord()?);
        }
        Ok(Self {
            offset,
            area_id,
            type_id,
            name,
            postal_code,
            location,
            address,
            nodes,
        })
    }
}
