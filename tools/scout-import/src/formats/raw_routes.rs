//! rawroutes.dat format - route relations and their members
//!
//! Record (length-prefixed):
//!   id:           zigzag varint
//!   member_count: varint
//!   members:      (kind u8, ref zigzag varint)*

use super::codec::{Decoder, Encoder};
use super::record::Record;
use super::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MemberKind {
    Node = 0,
    Way = 1,
    Relation = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMember {
    pub kind: MemberKind,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRelation {
    pub id: i64,
    pub members: Vec<RouteMember>,
}

impl RouteRelation {
    pub fn way_members(&self) -> impl Iterator<Item = i64> + '_ {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Way)
            .map(|m| m.id)
    }
}

impl Record for RouteRelation {
    const MAGIC: u32 = 0x52525445; // "RRTE"
    const VERSION: u16 = 1;

    fn encode(&self, enc: &mut Encoder) {
        enc.put_signed(self.id);
        enc.put_varint(self.members.len() as u64);
        for member in &self.members {
            enc.put_u8(member.kind as u8);
            enc.put_signed(member.id);
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, FormatError> {
        let id = dec.get_signed()?;
        let count = dec.get_len("member count")?;
        let mut members = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = match dec.get_u8()? {
                0 => MemberKind::Node,
                1 => MemberKind::Way,
                2 => MemberKind::Relation,
                other => {
                    return Err(FormatError::InvalidValue {
                        field: "member kind",
                        value: other as u64,
                    })
                }
            };
            members.push(RouteMember {
                kind,
                id: dec.get_signed()?,
            });
        }
        Ok(Self { id, members })
    }
}
