//! Typed record files on top of [`FileWriter`]/[`FileScanner`]

use scout_common::Result;
use std::marker::PhantomData;
use std::path::Path;

use super::codec::{Decoder, Encoder};
use super::io::{self, FileScanner, FileSummary, FileWriter};
use super::FormatError;

/// A value stored as one length-prefixed record of a file with its own magic
pub trait Record: Sized {
    const MAGIC: u32;
    const VERSION: u16;

    fn encode(&self, enc: &mut Encoder);
    fn decode(dec: &mut Decoder<'_>) -> std::result::Result<Self, FormatError>;
}

pub struct RecordWriter<R: Record> {
    file: FileWriter,
    enc: Encoder,
    count: u64,
    _marker: PhantomData<R>,
}

impl<R: Record> RecordWriter<R> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: FileWriter::create(path, R::MAGIC, R::VERSION, 0)?,
            enc: Encoder::new(),
            count: 0,
            _marker: PhantomData,
        })
    }

    /// Append a record and return the offset it was written at
    pub fn append(&mut self, record: &R) -> Result<u64> {
        self.enc.clear();
        record.encode(&mut self.enc);
        let offset = self.file.write_record(self.enc.as_slice())?;
        self.count += 1;
        Ok(offset)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn position(&self) -> u64 {
        self.file.position()
    }

    pub fn finish(self) -> Result<FileSummary> {
        let count = self.count;
        self.file.finish(count)
    }
}

pub struct RecordScanner<R: Record> {
    file: FileScanner,
    buf: Vec<u8>,
    read: u64,
    _marker: PhantomData<R>,
}

impl<R: Record> RecordScanner<R> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: FileScanner::open(path, R::MAGIC, R::VERSION, 0)?,
            buf: Vec::new(),
            read: 0,
            _marker: PhantomData,
        })
    }

    pub fn count(&self) -> u64 {
        self.file.count()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Next record in file order with its offset, `None` after the last one
    pub fn next_record(&mut self) -> Result<Option<(u64, R)>> {
        if self.read >= self.file.count() {
            return Ok(None);
        }
        let offset = self.file.position();
        let record = self.read_current()?;
        self.read += 1;
        Ok(Some((offset, record)))
    }

    /// Random access by offset; does not disturb the sequential count
    pub fn read_at(&mut self, offset: u64) -> Result<R> {
        let resume = self.file.position();
        self.file.seek(offset)?;
        let record = self.read_current();
        self.file.seek(resume)?;
        record
    }

    /// Read `count` consecutive records starting at `offset`
    pub fn read_run(&mut self, offset: u64, count: usize) -> Result<Vec<R>> {
        let resume = self.file.position();
        self.file.seek(offset)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_current()?);
        }
        self.file.seek(resume)?;
        Ok(out)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.read = 0;
        self.file.rewind()
    }

    fn read_current(&mut self) -> Result<R> {
        self.file.read_record(&mut self.buf)?;
        let mut dec = Decoder::new(&self.buf);
        R::decode(&mut dec).map_err(|e| self.file.corrupt(e))
    }
}

/// Write a whole slice of records
pub fn write_all<R: Record, P: AsRef<Path>>(path: P, records: &[R]) -> Result<FileSummary> {
    let mut writer = RecordWriter::<R>::create(path)?;
    for record in records {
        writer.append(record)?;
    }
    writer.finish()
}

/// Read every record of a file into memory
pub fn read_all<R: Record, P: AsRef<Path>>(path: P) -> Result<Vec<R>> {
    let mut scanner = RecordScanner::<R>::open(path)?;
    let mut out = Vec::with_capacity(scanner.count().min(1 << 20) as usize);
    while let Some((_, record)) = scanner.next_record()? {
        out.push(record);
    }
    Ok(out)
}

/// Check magic, version and checksum of a record file
pub fn verify<R: Record, P: AsRef<Path>>(path: P) -> Result<FileSummary> {
    io::verify(path, R::MAGIC, R::VERSION, 0)
}
