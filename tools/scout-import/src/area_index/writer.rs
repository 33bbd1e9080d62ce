//! areaarea.idx writer
//!
//! Header extra block (after the common 16 byte header, back-patched):
//!   max_level:    u64
//!   root_offset:  u64
//!   entry_count:  u64   // areas referenced by the index
//!
//! Body: one length-prefixed record per cell, children before parents.
//!   children:     4 x varint   // only below max_level; parent - child, 0 = none
//!                              // order: top-left, top-right, bottom-left, bottom-right
//!   group_count:  varint
//!   groups:
//!     type_id:    varint
//!     count:      varint      // consecutive areas in areas.dat
//!     offset:     varint      // first group absolute, then delta to previous group
//!
//! The common header count holds the number of cells.

use indicatif::ProgressBar;
use scout_common::Result;
use std::path::{Path, PathBuf};

use super::builder::{AreaRef, CellTree};
use super::cell::CellId;
use crate::filters::FilterChain;
use crate::formats::areas::Area;
use crate::formats::codec::Encoder;
use crate::formats::idmap::{IdMapEntry, ObjectKind};
use crate::formats::io::{FileSummary, FileWriter, HEADER_LEN};
use crate::formats::names;
use crate::formats::record::{RecordScanner, RecordWriter};
use crate::progress::create_progress_bar;
use crate::types::{TypeConfig, TypeId};

pub const INDEX_MAGIC: u32 = 0x41494458; // "AIDX"
pub const INDEX_VERSION: u16 = 1;
pub const INDEX_EXTRA_LEN: usize = 24;

const MAX_LEVEL_AT: u64 = HEADER_LEN;
const ROOT_OFFSET_AT: u64 = HEADER_LEN + 8;
const ENTRY_COUNT_AT: u64 = HEADER_LEN + 16;

/// Output locations of the index stage
#[derive(Debug, Clone)]
pub struct IndexOutputs {
    pub index: PathBuf,
    pub areas: PathBuf,
    pub idmap: PathBuf,
}

#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub index: FileSummary,
    pub areas: FileSummary,
    pub idmap: FileSummary,
    pub root_offset: u64,
    pub cells: u64,
    /// Areas copied to areas.dat
    pub written: u64,
    /// Areas vetoed by a filter
    pub dropped: u64,
}

struct IndexWriter<'a> {
    index: FileWriter,
    source: &'a mut RecordScanner<Area>,
    areas: RecordWriter<Area>,
    idmap: RecordWriter<IdMapEntry>,
    filters: &'a mut FilterChain,
    types: &'a TypeConfig,
    enc: Encoder,
    max_level: u32,
    cells: u64,
    written: u64,
    dropped: u64,
    pb: ProgressBar,
}

/// Write the whole tree, copying every referenced area through `filters`.
/// `tree` must be enriched; its references are consumed.
pub fn write_index(
    tree: &mut CellTree,
    source: &mut RecordScanner<Area>,
    filters: &mut FilterChain,
    types: &TypeConfig,
    outputs: &IndexOutputs,
) -> Result<IndexSummary> {
    let mut index = FileWriter::create(&outputs.index, INDEX_MAGIC, INDEX_VERSION, INDEX_EXTRA_LEN)?;
    index.patch_u64(MAX_LEVEL_AT, tree.max_level() as u64)?;

    filters.before_all(types)?;

    let mut writer = IndexWriter {
        index,
        source,
        areas: RecordWriter::create(&outputs.areas)?,
        idmap: RecordWriter::create(&outputs.idmap)?,
        filters,
        types,
        enc: Encoder::new(),
        max_level: tree.max_level(),
        cells: 0,
        written: 0,
        dropped: 0,
        pb: create_progress_bar(tree.entry_count() as u64, "indexing"),
    };

    let root_offset = writer.write_cell(tree, CellId::ROOT)?;
    writer.pb.finish_and_clear();
    writer.filters.after_all(types)?;

    let IndexWriter {
        mut index,
        areas,
        idmap,
        cells,
        written,
        dropped,
        ..
    } = writer;

    index.patch_u64(ROOT_OFFSET_AT, root_offset)?;
    index.patch_u64(ENTRY_COUNT_AT, written)?;

    Ok(IndexSummary {
        index: index.finish(cells)?,
        areas: areas.finish()?,
        idmap: idmap.finish()?,
        root_offset,
        cells,
        written,
        dropped,
    })
}

impl IndexWriter<'_> {
    /// Write `cell` after its subtree and return the cell's offset
    fn write_cell(&mut self, tree: &mut CellTree, cell: CellId) -> Result<u64> {
        let mut children = [0u64; 4];
        for (slot, child) in children.iter_mut().zip(tree.children(&cell)) {
            if let Some(child) = child {
                *slot = self.write_cell(tree, child)?;
            }
        }

        let groups = self.copy_entries(tree.take_entries(&cell))?;

        let offset = self.index.position();
        self.enc.clear();
        if cell.level < self.max_level {
            for child in children {
                let delta = if child == 0 { 0 } else { offset - child };
                self.enc.put_varint(delta);
            }
        }
        self.enc.put_varint(groups.len() as u64);
        let mut previous = 0u64;
        for group in &groups {
            self.enc.put_varint(group.type_id as u64);
            self.enc.put_varint(group.count);
            self.enc.put_varint(group.start - previous);
            previous = group.start;
        }

        self.index.write_record(self.enc.as_slice())?;
        self.cells += 1;
        Ok(offset)
    }

    /// Copy a cell's areas to areas.dat grouped by type; empty groups vanish
    fn copy_entries(&mut self, mut entries: Vec<AreaRef>) -> Result<Vec<TypeGroup>> {
        entries.sort_unstable();
        let mut groups: Vec<TypeGroup> = Vec::new();

        for entry in entries {
            self.pb.inc(1);
            let mut area = self.source.read_at(entry.offset)?;
            if !self.filters.process(entry.offset, &mut area, self.types)? {
                self.dropped += 1;
                continue;
            }

            let offset = self.areas.append(&area)?;
            self.idmap.append(&IdMapEntry {
                id: area.id,
                kind: ObjectKind::Area,
                offset,
            })?;
            self.written += 1;

            match groups.last_mut() {
                Some(group) if group.type_id == entry.type_id => group.count += 1,
                _ => groups.push(TypeGroup {
                    type_id: entry.type_id,
                    count: 1,
                    start: offset,
                }),
            }
        }
        Ok(groups)
    }
}

struct TypeGroup {
    type_id: TypeId,
    count: u64,
    start: u64,
}

/// Default output names below `dir`
pub fn outputs_in(dir: &Path) -> IndexOutputs {
    IndexOutputs {
        index: dir.join(names::AREA_INDEX),
        areas: dir.join(names::AREAS),
        idmap: dir.join(names::AREA_IDMAP),
    }
}
