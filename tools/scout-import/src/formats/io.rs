//! Sequential writer and positioned scanner shared by every import file
//!
//! Layout (little-endian):
//!
//! Header (16 bytes + optional fixed extra block):
//!   magic:       u32
//!   version:     u16
//!   reserved:    u16
//!   count:       u64   // back-patched by `finish`
//!   extra:       [u8]  // file specific, back-patched through `patch_u64`
//!
//! Body: records, either varint-length-prefixed or fixed size
//!
//! Footer (8 bytes):
//!   body_crc64:  u64

use scout_common::{Error, IoContext, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::crc::{checksum, BodyDigest};
use super::varint;
use super::FormatError;

pub const HEADER_LEN: u64 = 16;
pub const FOOTER_LEN: u64 = 8;
const COUNT_OFFSET: u64 = 8;

/// What a finished file looks like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub count: u64,
    pub body_crc64: u64,
    pub bytes: u64,
}

pub struct FileWriter {
    path: PathBuf,
    inner: BufWriter<File>,
    pos: u64,
    body_start: u64,
    digest: BodyDigest,
    prefix: Vec<u8>,
}

impl FileWriter {
    /// Create the file and write a header with zeroed count and extra block
    pub fn create<P: AsRef<Path>>(
        path: P,
        magic: u32,
        version: u16,
        extra_len: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).at_path(&path)?;
        let mut inner = BufWriter::new(file);

        let mut header = Vec::with_capacity(HEADER_LEN as usize + extra_len);
        header.extend_from_slice(&magic.to_le_bytes());
        header.extend_from_slice(&version.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // reserved
        header.extend_from_slice(&0u64.to_le_bytes()); // count placeholder
        header.resize(HEADER_LEN as usize + extra_len, 0);
        inner.write_all(&header).at_path(&path)?;

        let body_start = header.len() as u64;
        Ok(Self {
            path,
            inner,
            pos: body_start,
            body_start,
            digest: BodyDigest::new(),
            prefix: Vec::with_capacity(varint::MAX_VARINT_LEN),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute offset the next record will be written at
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn body_start(&self) -> u64 {
        self.body_start
    }

    fn write_body(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).at_path(&self.path)?;
        self.digest.update(bytes);
        self.pos += bytes.len() as u64;
        Ok(())
    }

    /// Append a length-prefixed record, returning its offset
    pub fn write_record(&mut self, payload: &[u8]) -> Result<u64> {
        let offset = self.pos;
        self.prefix.clear();
        varint::encode_u64(payload.len() as u64, &mut self.prefix);
        let prefix = std::mem::take(&mut self.prefix);
        let res = self.write_body(&prefix);
        self.prefix = prefix;
        res?;
        self.write_body(payload)?;
        Ok(offset)
    }

    /// Append a fixed-size record, returning its offset
    pub fn write_fixed(&mut self, payload: &[u8]) -> Result<u64> {
        let offset = self.pos;
        self.write_body(payload)?;
        Ok(offset)
    }

    /// Overwrite a u64 in the header area, then return to the end of the body
    pub fn patch_u64(&mut self, at: u64, value: u64) -> Result<()> {
        if at + 8 > self.body_start {
            return Err(Error::integrity(format!(
                "{}: patch at {} outside header",
                self.path.display(),
                at
            )));
        }
        self.inner.seek(SeekFrom::Start(at)).at_path(&self.path)?;
        self.inner
            .write_all(&value.to_le_bytes())
            .at_path(&self.path)?;
        self.inner
            .seek(SeekFrom::Start(self.pos))
            .at_path(&self.path)?;
        Ok(())
    }

    /// Write the CRC footer, patch the record count and flush
    pub fn finish(mut self, count: u64) -> Result<FileSummary> {
        let body_crc64 = std::mem::take(&mut self.digest).finalize();
        self.inner
            .write_all(&body_crc64.to_le_bytes())
            .at_path(&self.path)?;
        let bytes = self.pos + FOOTER_LEN;
        self.patch_u64(COUNT_OFFSET, count)?;
        self.inner.flush().at_path(&self.path)?;

        Ok(FileSummary {
            path: self.path,
            count,
            body_crc64,
            bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version: u16,
    pub count: u64,
    pub extra: Vec<u8>,
}

impl FileHeader {
    /// Read a u64 from the extra block
    pub fn extra_u64(&self, index: usize) -> Result<u64> {
        let start = index * 8;
        let bytes = self
            .extra
            .get(start..start + 8)
            .ok_or_else(|| Error::integrity("header extra block too short"))?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }
}

pub struct FileScanner {
    path: PathBuf,
    inner: BufReader<File>,
    pos: u64,
    body_start: u64,
    body_end: u64,
    header: FileHeader,
}

impl FileScanner {
    pub fn open<P: AsRef<Path>>(
        path: P,
        magic: u32,
        version: u16,
        extra_len: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).at_path(&path)?;
        let len = file.metadata().at_path(&path)?.len();
        let mut inner = BufReader::new(file);

        let body_start = HEADER_LEN + extra_len as u64;
        if len < body_start + FOOTER_LEN {
            return Err(corrupt(
                &path,
                FormatError::Truncated {
                    needed: (body_start + FOOTER_LEN) as usize,
                    available: len as usize,
                },
            ));
        }

        let mut raw = vec![0u8; body_start as usize];
        inner.read_exact(&mut raw).at_path(&path)?;

        let found = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if found != magic {
            return Err(corrupt(
                &path,
                FormatError::BadMagic {
                    expected: magic,
                    found,
                },
            ));
        }
        let found_version = u16::from_le_bytes([raw[4], raw[5]]);
        if found_version != version {
            return Err(corrupt(
                &path,
                FormatError::UnsupportedVersion {
                    expected: version,
                    found: found_version,
                },
            ));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&raw[8..16]);

        let header = FileHeader {
            version: found_version,
            count: u64::from_le_bytes(count),
            extra: raw[HEADER_LEN as usize..].to_vec(),
        };

        Ok(Self {
            path,
            inner,
            pos: body_start,
            body_start,
            body_end: len - FOOTER_LEN,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn count(&self) -> u64 {
        self.header.count
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn body_start(&self) -> u64 {
        self.body_start
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.body_end
    }

    /// Map a decoding failure to an error naming this file
    pub fn corrupt(&self, err: FormatError) -> Error {
        corrupt(&self.path, err)
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos < self.body_start || pos > self.body_end {
            return Err(Error::integrity(format!(
                "{}: offset {} outside body [{}, {})",
                self.path.display(),
                pos,
                self.body_start,
                self.body_end
            )));
        }
        self.inner.seek(SeekFrom::Start(pos)).at_path(&self.path)?;
        self.pos = pos;
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        let start = self.body_start;
        self.seek(start)
    }

    fn read_body(&mut self, buf: &mut [u8]) -> Result<()> {
        let available = self.body_end.saturating_sub(self.pos);
        if (buf.len() as u64) > available {
            return Err(self.corrupt(FormatError::Truncated {
                needed: buf.len(),
                available: available as usize,
            }));
        }
        self.inner.read_exact(buf).at_path(&self.path)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read one length-prefixed record into `buf`
    pub fn read_record(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let mut prefix = [0u8; varint::MAX_VARINT_LEN];
        let mut used = 0;
        loop {
            if used == prefix.len() {
                return Err(self.corrupt(FormatError::VarintOverflow));
            }
            let mut byte = [0u8; 1];
            self.read_body(&mut byte)?;
            prefix[used] = byte[0];
            used += 1;
            if byte[0] & 0x80 == 0 {
                break;
            }
        }
        let (len, _) = varint::decode_u64(&prefix[..used]).map_err(|e| self.corrupt(e))?;
        if len > self.body_end.saturating_sub(self.pos) {
            return Err(self.corrupt(FormatError::InvalidValue {
                field: "record length",
                value: len,
            }));
        }
        buf.resize(len as usize, 0);
        self.read_body(buf)
    }

    pub fn read_fixed(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_body(buf)
    }
}

fn corrupt(path: &Path, err: FormatError) -> Error {
    Error::DataIntegrity(format!("{}: {}", path.display(), err))
}

/// Check magic, version and body checksum of a whole file
pub fn verify<P: AsRef<Path>>(
    path: P,
    magic: u32,
    version: u16,
    extra_len: usize,
) -> Result<FileSummary> {
    let scanner = FileScanner::open(path.as_ref(), magic, version, extra_len)?;
    let count = scanner.count();
    let body_start = scanner.body_start as usize;
    drop(scanner);

    let path = path.as_ref();
    let data = std::fs::read(path).at_path(path)?;
    let footer_at = data.len() - FOOTER_LEN as usize;
    let mut stored = [0u8; 8];
    stored.copy_from_slice(&data[footer_at..]);
    let stored = u64::from_le_bytes(stored);
    let computed = checksum(&data[body_start..footer_at]);

    if stored != computed {
        return Err(corrupt(
            path,
            FormatError::ChecksumMismatch { stored, computed },
        ));
    }

    Ok(FileSummary {
        path: path.to_path_buf(),
        count,
        body_crc64: stored,
        bytes: data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const MAGIC: u32 = 0x54455354; // "TEST"

    #[test]
    fn test_write_scan_and_verify() {
        let tmp = NamedTempFile::new().unwrap();

        let mut writer = FileWriter::create(tmp.path(), MAGIC, 1, 8).unwrap();
        let first = writer.write_record(b"alpha").unwrap();
        let second = writer.write_record(b"").unwrap();
        let third = writer.write_record(&[7u8; 300]).unwrap();
        writer.patch_u64(HEADER_LEN, 99).unwrap();
        let summary = writer.finish(3).unwrap();
        assert_eq!(first, HEADER_LEN + 8);
        assert_eq!(second, first + 6);
        assert_eq!(third, second + 1);
        assert_eq!(summary.count, 3);

        let mut scanner = FileScanner::open(tmp.path(), MAGIC, 1, 8).unwrap();
        assert_eq!(scanner.count(), 3);
        assert_eq!(scanner.header().extra_u64(0).unwrap(), 99);

        let mut buf = Vec::new();
        scanner.read_record(&mut buf).unwrap();
        assert_eq!(buf, b"alpha");
        scanner.read_record(&mut buf).unwrap();
        assert!(buf.is_empty());
        scanner.read_record(&mut buf).unwrap();
        assert_eq!(buf.len(), 300);
        assert!(scanner.at_end());

        scanner.seek(first).unwrap();
        scanner.read_record(&mut buf).unwrap();
        assert_eq!(buf, b"alpha");

        let verified = verify(tmp.path(), MAGIC, 1, 8).unwrap();
        assert_eq!(verified.body_crc64, summary.body_crc64);
    }

    #[test]
    fn test_wrong_magic_is_integrity_error() {
        let tmp = NamedTempFile::new().unwrap();
        FileWriter::create(tmp.path(), MAGIC, 1, 0)
            .unwrap()
            .finish(0)
            .unwrap();

        let err = FileScanner::open(tmp.path(), 0xDEADBEEF, 1, 0).err().unwrap();
        assert!(matches!(err, Error::DataIntegrity(_)));
        let err = FileScanner::open(tmp.path(), MAGIC, 2, 0).err().unwrap();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_corrupted_body_fails_verify() {
        let tmp = NamedTempFile::new().unwrap();
        let mut writer = FileWriter::create(tmp.path(), MAGIC, 1, 0).unwrap();
        writer.write_record(b"payload").unwrap();
        writer.finish(1).unwrap();

        let mut data = std::fs::read(tmp.path()).unwrap();
        data[HEADER_LEN as usize + 2] ^= 0xFF;
        std::fs::write(tmp.path(), &data).unwrap();

        assert!(verify(tmp.path(), MAGIC, 1, 0).is_err());
    }

    #[test]
    fn test_read_past_body_is_truncated() {
        let tmp = NamedTempFile::new().unwrap();
        FileWriter::create(tmp.path(), MAGIC, 1, 0)
            .unwrap()
            .finish(0)
            .unwrap();

        let mut scanner = FileScanner::open(tmp.path(), MAGIC, 1, 0).unwrap();
        let mut buf = Vec::new();
        assert!(scanner.read_record(&mut buf).is_err());
    }
}
