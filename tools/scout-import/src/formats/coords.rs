//! coord.dat format - resolved node coordinates, sorted by node id
//!
//! Body (count fixed-size records, ascending id):
//!   id:        i64
//!   lat:       i32   // 1e-7 degrees
//!   lon:       i32   // 1e-7 degrees
//!   serial:    u32   // 0 = untagged node
//!   reserved:  u32

use memmap2::Mmap;
use parking_lot::Mutex;
use scout_common::{Error, IoContext, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::io::{FileScanner, FileSummary, FileWriter, HEADER_LEN};
use super::raw_ways::NodeId;
use crate::geo::GeoCoord;

const MAGIC: u32 = 0x434F5244; // "CORD"
const VERSION: u16 = 1;
pub const RECORD_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordRecord {
    pub id: NodeId,
    pub serial: u32,
    pub coord: GeoCoord,
}

fn encode_record(rec: &CoordRecord) -> [u8; RECORD_SIZE] {
    let (lat, lon) = rec.coord.to_fixed();
    let mut out = [0u8; RECORD_SIZE];
    out[0..8].copy_from_slice(&rec.id.to_le_bytes());
    out[8..12].copy_from_slice(&lat.to_le_bytes());
    out[12..16].copy_from_slice(&lon.to_le_bytes());
    out[16..20].copy_from_slice(&rec.serial.to_le_bytes());
    out
}

fn decode_record(raw: &[u8]) -> CoordRecord {
    let mut id = [0u8; 8];
    id.copy_from_slice(&raw[0..8]);
    let mut lat = [0u8; 4];
    lat.copy_from_slice(&raw[8..12]);
    let mut lon = [0u8; 4];
    lon.copy_from_slice(&raw[12..16]);
    let mut serial = [0u8; 4];
    serial.copy_from_slice(&raw[16..20]);

    CoordRecord {
        id: i64::from_le_bytes(id),
        serial: u32::from_le_bytes(serial),
        coord: GeoCoord::from_fixed(i32::from_le_bytes(lat), i32::from_le_bytes(lon)),
    }
}

/// Write a coordinate file. Records are sorted by id; duplicate ids keep the
/// first occurrence.
pub fn write<P: AsRef<Path>>(path: P, records: &[CoordRecord]) -> Result<FileSummary> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.id);
    sorted.dedup_by_key(|r| r.id);

    let mut writer = FileWriter::create(path, MAGIC, VERSION, 0)?;
    for rec in &sorted {
        writer.write_fixed(&encode_record(rec))?;
    }
    writer.finish(sorted.len() as u64)
}

enum Backing {
    Mapped(Mmap),
    Stream(Mutex<File>),
}

/// Read-only random access to coord.dat
pub struct CoordFile {
    path: PathBuf,
    count: u64,
    backing: Backing,
}

impl CoordFile {
    /// Open the file, optionally memory mapping it
    pub fn open<P: AsRef<Path>>(path: P, memory_mapped: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let scanner = FileScanner::open(&path, MAGIC, VERSION, 0)?;
        let count = scanner.count();
        drop(scanner);

        let file = File::open(&path).at_path(&path)?;
        let len = file.metadata().at_path(&path)?.len();
        let needed = HEADER_LEN + count * RECORD_SIZE as u64;
        if len < needed {
            return Err(Error::integrity(format!(
                "{}: {} records need {} bytes, file has {}",
                path.display(),
                count,
                needed,
                len
            )));
        }

        let backing = if memory_mapped {
            // The import never writes coord.dat while it is open
            let map = unsafe { Mmap::map(&file) }.at_path(&path)?;
            Backing::Mapped(map)
        } else {
            Backing::Stream(Mutex::new(file))
        };

        Ok(Self {
            path,
            count,
            backing,
        })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_memory_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    fn record_at(&self, index: u64) -> Result<CoordRecord> {
        let offset = HEADER_LEN + index * RECORD_SIZE as u64;
        match &self.backing {
            Backing::Mapped(map) => {
                let start = offset as usize;
                Ok(decode_record(&map[start..start + RECORD_SIZE]))
            }
            Backing::Stream(file) => {
                let mut raw = [0u8; RECORD_SIZE];
                let mut file = file.lock();
                file.seek(SeekFrom::Start(offset)).at_path(&self.path)?;
                file.read_exact(&mut raw).at_path(&self.path)?;
                Ok(decode_record(&raw))
            }
        }
    }

    /// Binary search for one node id
    pub fn get(&self, id: NodeId) -> Result<Option<CoordRecord>> {
        let (mut lo, mut hi) = (0u64, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let rec = self.record_at(mid)?;
            match rec.id.cmp(&id) {
                std::cmp::Ordering::Equal => return Ok(Some(rec)),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn rec(id: NodeId, lat: f64, lon: f64, serial: u32) -> CoordRecord {
        CoordRecord {
            id,
            serial,
            coord: GeoCoord::new(lat, lon),
        }
    }

    #[test]
    fn test_lookup_both_backings() {
        let tmp = NamedTempFile::new().unwrap();
        write(
            tmp.path(),
            &[
                rec(30, 3.0, 3.5, 0),
                rec(10, 1.0, 1.5, 7),
                rec(20, 2.0, 2.5, 0),
                rec(10, 9.0, 9.0, 0),
            ],
        )
        .unwrap();

        for mapped in [false, true] {
            let file = CoordFile::open(tmp.path(), mapped).unwrap();
            assert_eq!(file.len(), 3);
            assert_eq!(file.is_memory_mapped(), mapped);

            let hit = file.get(10).unwrap().unwrap();
            assert_eq!(hit.serial, 7);
            assert!(hit.coord.same_fixed(GeoCoord::new(1.0, 1.5)));
            assert!(file.get(30).unwrap().is_some());
            assert!(file.get(15).unwrap().is_none());
            assert!(file.get(-1).unwrap().is_none());
        }
    }

    #[test]
    fn test_empty_file() {
        let tmp = NamedTempFile::new().unwrap();
        write(tmp.path(), &[]).unwrap();
        let file = CoordFile::open(tmp.path(), false).unwrap();
        assert!(file.is_empty());
        assert!(file.get(1).unwrap().is_none());
    }
}
