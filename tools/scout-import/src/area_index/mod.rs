//! Step 2: quad-tree index over areas
//!
//! Inputs (destination directory): types.json, wayarea.dat.
//! Outputs: areaarea.idx, areas.dat, areas.idmap and optionally
//! areaaddress.dat.

pub mod builder;
pub mod cell;
pub mod reader;
pub mod writer;

use scout_common::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::filters::FilterChain;
use crate::formats::areas::Area;
use crate::formats::names;
use crate::formats::record::RecordScanner;
use crate::types::TypeConfig;

pub use builder::{AreaRef, CellTree};
pub use cell::{calculate_level, cell_for, CellId, MAX_SUPPORTED_LEVEL};
pub use reader::{AreaDataFile, AreaIndex, DataSpan};

pub const DEFAULT_MAX_LEVEL: u32 = 17;

#[derive(Debug, Clone)]
pub struct AreaIndexConfig {
    pub destination: PathBuf,
    pub max_level: u32,
    /// Write areaaddress.dat while copying areas
    pub write_address_debug: bool,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct AreaIndexResult {
    pub index_path: PathBuf,
    pub areas_path: PathBuf,
    pub idmap_path: PathBuf,
    pub address_path: Option<PathBuf>,
    pub areas_read: u64,
    /// Areas without geometry, never placed in a cell
    pub areas_skipped: u64,
    pub areas_written: u64,
    /// Areas removed by the filter chain
    pub areas_dropped: u64,
    pub cells: u64,
    pub max_level: u32,
    pub root_offset: u64,
    /// Occupied cells per level
    pub level_histogram: Vec<usize>,
}

/// Run the area index stage
pub fn run_area_index(config: &AreaIndexConfig) -> Result<AreaIndexResult> {
    if config.max_level > MAX_SUPPORTED_LEVEL {
        return Err(Error::Config(format!(
            "area index max level {} exceeds {}",
            config.max_level, MAX_SUPPORTED_LEVEL
        )));
    }

    let start_time = Instant::now();
    let dest = &config.destination;

    println!("🧭 Starting Step 2: Area index");
    println!("📂 Destination: {}", dest.display());
    println!("🔢 Max level: {}", config.max_level);
    println!();

    let types = TypeConfig::load(dest.join(names::TYPES))?;
    let mut source = RecordScanner::<Area>::open(dest.join(names::WAY_AREAS))?;

    println!("Binning {} areas...", source.count());
    let mut tree = CellTree::new(config.max_level);
    let stats = builder::bin_areas(&mut source, &mut tree)?;
    let level_histogram = tree.level_histogram();
    tree.enrich();
    println!(
        "  ✓ {} areas in {} cells ({} without geometry)",
        tree.entry_count(),
        tree.cell_count(),
        stats.skipped
    );
    for (level, cells) in level_histogram.iter().enumerate().filter(|(_, c)| **c > 0) {
        tracing::debug!(level, cells, "occupied cells");
    }

    let address_path = config
        .write_address_debug
        .then(|| dest.join(names::AREA_ADDRESSES));
    let mut filters = FilterChain::standard(address_path.clone());
    let outputs = writer::outputs_in(dest);

    println!("Writing index and copying areas...");
    let summary = writer::write_index(&mut tree, &mut source, &mut filters, &types, &outputs)?;
    println!(
        "  ✓ Wrote {} ({} cells)",
        summary.index.path.display(),
        summary.cells
    );
    println!(
        "  ✓ Wrote {} ({} areas)",
        summary.areas.path.display(),
        summary.areas.count
    );
    println!("  ✓ Wrote {}", summary.idmap.path.display());

    let elapsed = start_time.elapsed();
    println!();
    println!("✅ Step 2 complete in {:.2}s", elapsed.as_secs_f64());
    println!(
        "   {} areas → {} indexed, {} dropped by filters",
        stats.areas, summary.written, summary.dropped
    );

    Ok(AreaIndexResult {
        index_path: outputs.index,
        areas_path: outputs.areas,
        idmap_path: outputs.idmap,
        address_path,
        areas_read: stats.areas,
        areas_skipped: stats.skipped,
        areas_written: summary.written,
        areas_dropped: summary.dropped,
        cells: summary.cells,
        max_level: config.max_level,
        root_offset: summary.root_offset,
        level_histogram,
    })
}
