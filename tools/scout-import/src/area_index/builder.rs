//! Binning areas into quad-tree cells
//!
//! Only `(type, offset)` references are held in memory. Bodies stay in
//! wayarea.dat until the writer copies them.

use rustc_hash::FxHashMap;
use scout_common::Result;

use super::cell::{calculate_level, cell_for, CellId, Quadrant};
use crate::formats::areas::Area;
use crate::formats::record::RecordScanner;
use crate::geo::GeoBox;
use crate::progress::create_progress_bar;
use crate::types::TypeId;

/// Reference to an area body in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AreaRef {
    pub type_id: TypeId,
    pub offset: u64,
}

#[derive(Debug)]
pub struct CellTree {
    max_level: u32,
    cells: FxHashMap<CellId, Vec<AreaRef>>,
    entries: usize,
}

impl CellTree {
    pub fn new(max_level: u32) -> Self {
        let mut cells = FxHashMap::default();
        cells.insert(CellId::ROOT, Vec::new());
        Self {
            max_level,
            cells,
            entries: 0,
        }
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Assign an area to the cell matching its bounding box
    pub fn insert(&mut self, bbox: &GeoBox, area: AreaRef) -> CellId {
        let level = calculate_level(bbox, self.max_level);
        let cell = cell_for(bbox, level);
        self.cells.entry(cell).or_default().push(area);
        self.entries += 1;
        cell
    }

    /// Create the parent of every cell, level by level up to the root
    pub fn enrich(&mut self) {
        for level in (1..=self.max_level).rev() {
            let parents: Vec<CellId> = self
                .cells
                .keys()
                .filter(|c| c.level == level)
                .filter_map(CellId::parent)
                .collect();
            for parent in parents {
                self.cells.entry(parent).or_default();
            }
        }
    }

    pub fn contains(&self, cell: &CellId) -> bool {
        self.cells.contains_key(cell)
    }

    pub fn entries_of(&self, cell: &CellId) -> Option<&[AreaRef]> {
        self.cells.get(cell).map(Vec::as_slice)
    }

    /// Remove a cell's references, leaving the cell itself in place
    pub fn take_entries(&mut self, cell: &CellId) -> Vec<AreaRef> {
        self.cells.get_mut(cell).map(std::mem::take).unwrap_or_default()
    }

    pub fn children(&self, cell: &CellId) -> [Option<CellId>; 4] {
        let mut out = [None; 4];
        if cell.level < self.max_level {
            for (slot, quadrant) in out.iter_mut().zip(Quadrant::ALL) {
                let child = cell.child(quadrant);
                if self.contains(&child) {
                    *slot = Some(child);
                }
            }
        }
        out
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total references inserted
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellId, &[AreaRef])> {
        self.cells.iter().map(|(c, e)| (c, e.as_slice()))
    }

    /// Occupied cells per level, index = level
    pub fn level_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; self.max_level as usize + 1];
        for (cell, entries) in &self.cells {
            if !entries.is_empty() {
                histogram[cell.level as usize] += 1;
            }
        }
        histogram
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BinStats {
    pub areas: u64,
    /// Areas without any geometry ring nodes
    pub skipped: u64,
}

/// Scan wayarea.dat once and place every area with geometry into `tree`
pub fn bin_areas(scanner: &mut RecordScanner<Area>, tree: &mut CellTree) -> Result<BinStats> {
    scanner.rewind()?;
    let pb = create_progress_bar(scanner.count(), "binning");
    let mut stats = BinStats::default();

    while let Some((offset, area)) = scanner.next_record()? {
        pb.inc(1);
        stats.areas += 1;
        let Some(bbox) = area.bbox() else {
            tracing::debug!(area = area.id, "area without geometry, not indexed");
            stats.skipped += 1;
            continue;
        };
        tree.insert(
            &bbox,
            AreaRef {
                type_id: area.type_id,
                offset,
            },
        );
    }
    pb.finish_and_clear();

    Ok(stats)
}
