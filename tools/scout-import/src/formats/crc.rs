//! CRC-64 body checksums for the import files

use crc::{Crc, CRC_64_GO_ISO};

pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Running checksum over everything written after a file header.
pub struct BodyDigest {
    digest: crc::Digest<'static, u64>,
    bytes: u64,
}

impl BodyDigest {
    pub fn new() -> Self {
        Self {
            digest: CRC64.digest(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
        self.bytes += data.len() as u64;
    }

    /// Number of body bytes seen so far
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn finalize(self) -> u64 {
        self.digest.finalize()
    }
}

impl Default for BodyDigest {
    fn default() -> Self {
        Self::new()
    }
}
