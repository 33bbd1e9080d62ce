//! LEB128 varints, zig-zag for signed values

use super::FormatError;

/// Maximum encoded length of a u64
pub const MAX_VARINT_LEN: usize = 10;

pub fn encode_u64(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn encode_i64(value: i64, out: &mut Vec<u8>) {
    encode_u64(zigzag(value), out);
}

/// Decode from the front of `input`, returning the value and bytes consumed.
pub fn decode_u64(input: &[u8]) -> Result<(u64, usize), FormatError> {
    let mut out = 0u64;
    for (i, &byte) in input.iter().take(MAX_VARINT_LEN).enumerate() {
        let carry = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(FormatError::VarintOverflow);
        }
        out |= carry << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((out, i + 1));
        }
    }
    if input.len() >= MAX_VARINT_LEN {
        Err(FormatError::VarintOverflow)
    } else {
        Err(FormatError::Truncated {
            needed: input.len() + 1,
            available: input.len(),
        })
    }
}

pub fn decode_i64(input: &[u8]) -> Result<(i64, usize), FormatError> {
    let (raw, used) = decode_u64(input)?;
    Ok((unzigzag(raw), used))
}

pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
