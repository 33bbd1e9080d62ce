//! Range queries over areaarea.idx and loading of the referenced areas

use rustc_hash::FxHashSet;
use scout_common::{Error, Result};
use serde::Serialize;
use std::path::Path;

use super::cell::{CellDimension, CellId, Quadrant, MAX_SUPPORTED_LEVEL};
use super::writer::{INDEX_EXTRA_LEN, INDEX_MAGIC, INDEX_VERSION};
use crate::formats::areas::Area;
use crate::formats::codec::Decoder;
use crate::formats::io::FileScanner;
use crate::formats::record::RecordScanner;
use crate::formats::FormatError;
use crate::geo::GeoBox;
use crate::types::TypeId;

/// Run of `count` consecutive areas in areas.dat starting at `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSpan {
    pub type_id: TypeId,
    pub start: u64,
    pub count: u64,
}

#[derive(Debug, Default)]
struct IndexCell {
    children: [u64; 4],
    spans: Vec<DataSpan>,
}

pub struct AreaIndex {
    scanner: FileScanner,
    max_level: u32,
    root_offset: u64,
    entry_count: u64,
    buf: Vec<u8>,
}

impl AreaIndex {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let scanner = FileScanner::open(path, INDEX_MAGIC, INDEX_VERSION, INDEX_EXTRA_LEN)?;
        let header = scanner.header();
        let max_level = header.extra_u64(0)?;
        let root_offset = header.extra_u64(1)?;
        let entry_count = header.extra_u64(2)?;

        if max_level > MAX_SUPPORTED_LEVEL as u64 {
            return Err(scanner.corrupt(FormatError::InvalidValue {
                field: "max level",
                value: max_level,
            }));
        }

        Ok(Self {
            scanner,
            max_level: max_level as u32,
            root_offset,
            entry_count,
            buf: Vec::new(),
        })
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn root_offset(&self) -> u64 {
        self.root_offset
    }

    pub fn cell_count(&self) -> u64 {
        self.scanner.count()
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    fn read_cell(&mut self, offset: u64, level: u32) -> Result<IndexCell> {
        self.scanner.seek(offset)?;
        self.scanner.read_record(&mut self.buf)?;
        decode_cell(&self.buf, offset, level < self.max_level).map_err(|e| self.scanner.corrupt(e))
    }

    /// Spans of all areas of the wanted types (all when `None`) in cells
    /// down to `max_level` that may hold areas intersecting `bbox`
    pub fn query(
        &mut self,
        bbox: &GeoBox,
        max_level: u32,
        types: Option<&FxHashSet<TypeId>>,
    ) -> Result<Vec<DataSpan>> {
        if !bbox.is_valid() {
            return Err(Error::InvalidInput(format!("invalid bounding box {bbox:?}")));
        }

        let last_level = max_level.min(self.max_level);
        let mut spans = Vec::new();
        let mut current = vec![(CellId::ROOT, self.root_offset)];
        let mut next = Vec::new();

        for level in 0..=last_level {
            for &(cell_id, offset) in &current {
                let cell = self.read_cell(offset, level)?;
                spans.extend(
                    cell.spans
                        .iter()
                        .filter(|s| types.map_or(true, |t| t.contains(&s.type_id))),
                );

                if level == last_level {
                    continue;
                }
                for (quadrant, &child_offset) in Quadrant::ALL.iter().zip(&cell.children) {
                    if child_offset == 0 {
                        continue;
                    }
                    let child = cell_id.child(*quadrant);
                    if widened_bounds(&child).intersects(bbox) {
                        next.push((child, child_offset));
                    }
                }
            }
            std::mem::swap(&mut current, &mut next);
            next.clear();
            if current.is_empty() {
                break;
            }
        }

        tracing::debug!(spans = spans.len(), max_level = last_level, "area index query");
        Ok(spans)
    }
}

/// Cell bounds grown by half a cell on every side; areas are assigned by
/// their center and may reach that far out.
fn widened_bounds(cell: &CellId) -> GeoBox {
    let dim = CellDimension::at(cell.level);
    let b = cell.bounds();
    GeoBox::new(
        b.min_lat - dim.height / 2.0,
        b.min_lon - dim.width / 2.0,
        b.max_lat + dim.height / 2.0,
        b.max_lon + dim.width / 2.0,
    )
}

fn decode_cell(data: &[u8], offset: u64, has_children: bool) -> std::result::Result<IndexCell, FormatError> {
    let mut dec = Decoder::new(data);
    let mut cell = IndexCell::default();

    if has_children {
        for slot in cell.children.iter_mut() {
            let delta = dec.get_varint()?;
            if delta > offset {
                return Err(FormatError::InvalidValue {
                    field: "child offset delta",
                    value: delta,
                });
            }
            *slot = if delta == 0 { 0 } else { offset - delta };
        }
    }

    let groups = dec.get_len("type group count")?;
    let mut previous = 0u64;
    for _ in 0..groups {
        let type_id = dec.get_varint_u16("type id")?;
        let count = dec.get_varint()?;
        let start = previous
            .checked_add(dec.get_varint()?)
            .ok_or(FormatError::InvalidValue {
                field: "data offset",
                value: previous,
            })?;
        previous = start;
        cell.spans.push(DataSpan {
            type_id,
            start,
            count,
        });
    }
    Ok(cell)
}

/// Random access to areas.dat by span
pub struct AreaDataFile {
    scanner: RecordScanner<Area>,
}

impl AreaDataFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            scanner: RecordScanner::open(path)?,
        })
    }

    pub fn len(&self) -> u64 {
        self.scanner.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_span(&mut self, span: &DataSpan) -> Result<Vec<Area>> {
        let count = usize::try_from(span.count)
            .map_err(|_| Error::integrity(format!("span of {} areas", span.count)))?;
        self.scanner.read_run(span.start, count)
    }

    pub fn read_spans(&mut self, spans: &[DataSpan]) -> Result<Vec<Area>> {
        let mut out = Vec::new();
        for span in spans {
            out.extend(self.read_span(span)?);
        }
        Ok(out)
    }
}
