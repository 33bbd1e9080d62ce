//! Record encoding helpers
//!
//! Records are built in memory with [`Encoder`] and parsed back with
//! [`Decoder`]. Fixed-width integers are little-endian; counts and ids use
//! varints.

use super::varint;
use super::FormatError;
use crate::features::{FeatureKind, FeatureValueBuffer};
use crate::geo::GeoCoord;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_varint(&mut self, v: u64) {
        varint::encode_u64(v, &mut self.buf);
    }

    pub fn put_signed(&mut self, v: i64) {
        varint::encode_i64(v, &mut self.buf);
    }

    pub fn put_str(&mut self, s: &str) {
        self.put_varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn put_coord(&mut self, c: GeoCoord) {
        let (lat, lon) = c.to_fixed();
        self.put_i32(lat);
        self.put_i32(lon);
    }

    pub fn put_features(&mut self, features: &FeatureValueBuffer) {
        self.put_varint(features.len() as u64);
        for (kind, value) in features.iter() {
            self.put_u8(kind as u8);
            self.put_str(value);
        }
    }
}

pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < n {
            return Err(FormatError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn get_u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn get_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn get_i32(&mut self) -> Result<i32, FormatError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn get_i64(&mut self) -> Result<i64, FormatError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn get_varint(&mut self) -> Result<u64, FormatError> {
        let (value, used) = varint::decode_u64(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn get_signed(&mut self) -> Result<i64, FormatError> {
        let (value, used) = varint::decode_i64(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Varint that must fit a `u16` (type ids)
    pub fn get_varint_u16(&mut self, field: &'static str) -> Result<u16, FormatError> {
        let value = self.get_varint()?;
        u16::try_from(value).map_err(|_| FormatError::InvalidValue { field, value })
    }

    /// Varint used as a length; bounded by the bytes left so corrupt input
    /// can't trigger huge allocations.
    pub fn get_len(&mut self, field: &'static str) -> Result<usize, FormatError> {
        let value = self.get_varint()?;
        if value > self.remaining() as u64 {
            return Err(FormatError::InvalidValue { field, value });
        }
        Ok(value as usize)
    }

    pub fn get_str(&mut self) -> Result<String, FormatError> {
        let len = self.get_len("string length")?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8)
    }

    pub fn get_coord(&mut self) -> Result<GeoCoord, FormatError> {
        let lat = self.get_i32()?;
        let lon = self.get_i32()?;
        Ok(GeoCoord::from_fixed(lat, lon))
    }

    pub fn get_features(&mut self) -> Result<FeatureValueBuffer, FormatError> {
        let count = self.get_len("feature count")?;
        let mut features = FeatureValueBuffer::new();
        for _ in 0..count {
            let raw = self.get_u8()?;
            let kind = FeatureKind::from_u8(raw).ok_or(FormatError::InvalidValue {
                field: "feature kind",
                value: raw as u64,
            })?;
            let value = self.get_str()?;
            features.set(kind, value);
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_record() {
        let features = FeatureValueBuffer::from_pairs([
            (FeatureKind::Name, "Rue de la Loi"),
            (FeatureKind::Layer, "1"),
        ]);

        let mut enc = Encoder::new();
        enc.put_signed(-42);
        enc.put_u16(7);
        enc.put_features(&features);
        enc.put_coord(GeoCoord::new(50.84, 4.37));
        enc.put_varint(1 << 40);

        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_signed().unwrap(), -42);
        assert_eq!(dec.get_u16().unwrap(), 7);
        assert_eq!(dec.get_features().unwrap(), features);
        assert!(dec.get_coord().unwrap().same_fixed(GeoCoord::new(50.84, 4.37)));
        assert_eq!(dec.get_varint().unwrap(), 1 << 40);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_truncated_fixed_width() {
        let mut dec = Decoder::new(&[1, 2, 3]);
        assert!(matches!(
            dec.get_u32(),
            Err(FormatError::Truncated {
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_bogus_length_rejected() {
        let mut enc = Encoder::new();
        enc.put_varint(1_000_000);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.get_str(),
            Err(FormatError::InvalidValue { .. })
        ));
    }
}
