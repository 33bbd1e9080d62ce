//! Step 1: merge way fragments and split the result into bounded ways
//!
//! Inputs (destination directory): types.json, distribution.dat,
//! rawways.dat, coord.dat and optionally rawturnrestr.dat, rawroutes.dat.
//! Outputs: wayway.dat, turnrestr.dat.

pub mod collect;
pub mod merge;
pub mod restrictions;
pub mod routes;
pub mod split;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use scout_common::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::formats::coords::CoordFile;
use crate::formats::distribution::TypeDistributionFile;
use crate::formats::names;
use crate::formats::raw_ways::{NodeId, WayFragment};
use crate::formats::record::{RecordScanner, RecordWriter};
use crate::formats::turn_restrictions;
use crate::formats::ways::Way;
use crate::progress::create_progress_bar;
use crate::resolver::CoordinateResolver;
use crate::types::{TypeConfig, TypeId};

use collect::{collect_block, BlockLimits};
use merge::{merge_ways, MergeContext, MergeOutcome};
use restrictions::RestrictionTable;
use routes::RouteMembership;
use split::{split_way, SplitLimits};

#[derive(Debug, Clone)]
pub struct WayWayConfig {
    pub destination: PathBuf,
    pub block: BlockLimits,
    pub split: SplitLimits,
    pub coord_data_memory_mapped: bool,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct WayWayResult {
    pub ways_path: PathBuf,
    pub restrictions_path: PathBuf,
    pub fragments_read: u64,
    pub ways_written: u64,
    pub merged_away: u64,
    pub split_ways: u64,
    pub unresolved_nodes: u64,
    pub dropped_segments: u64,
    pub ambiguous_junctions: u64,
    pub restriction_vetoes: u64,
    pub route_vetoes: u64,
    pub restrictions_written: u64,
    pub passes: u32,
    /// Types too large to merge; written fragment by fragment
    pub fallback_types: Vec<TypeId>,
    /// Types whose merge stopped on a data integrity error
    pub failed_types: Vec<TypeId>,
}

impl WayWayResult {
    fn absorb_merge(&mut self, outcome: &MergeOutcome) {
        self.merged_away += outcome.merged_away.len() as u64;
        self.ambiguous_junctions += outcome.ambiguous_junctions as u64;
        self.restriction_vetoes += outcome.restriction_vetoes as u64;
        self.route_vetoes += outcome.route_vetoes as u64;
    }
}

/// Run the way stage
pub fn run_wayway(config: &WayWayConfig) -> Result<WayWayResult> {
    let start_time = Instant::now();
    let dest = &config.destination;

    println!("🧭 Starting Step 1: Way merging and splitting");
    println!("📂 Destination: {}", dest.display());
    println!();

    let types = TypeConfig::load(dest.join(names::TYPES))?;
    let distribution = TypeDistributionFile::load(dest.join(names::DISTRIBUTION))?;

    println!("Loading turn restrictions and route memberships...");
    let restrictions = Mutex::new(load_restrictions(&dest.join(names::RAW_TURN_RESTRICTIONS))?);
    let routes = load_routes(&dest.join(names::RAW_ROUTES))?;
    println!("  ✓ {} turn restrictions", restrictions.lock().len());
    println!("  ✓ {} ways in routes", routes.len());

    let coords = CoordFile::open(dest.join(names::COORDS), config.coord_data_memory_mapped)?;
    println!(
        "  ✓ {} node coordinates{}",
        coords.len(),
        if coords.is_memory_mapped() { " (memory mapped)" } else { "" }
    );

    let mut result = WayWayResult {
        ways_path: dest.join(names::WAYS),
        restrictions_path: dest.join(names::TURN_RESTRICTIONS),
        ..Default::default()
    };

    let mut pending: FxHashSet<TypeId> = FxHashSet::default();
    let mut fallback: FxHashSet<TypeId> = FxHashSet::default();
    for info in types.way_types() {
        if distribution.way_count(info.id) >= config.block.max_ways as u64 {
            fallback.insert(info.id);
        } else {
            pending.insert(info.id);
        }
    }
    result.fallback_types = fallback.iter().copied().collect();
    result.fallback_types.sort_unstable();

    let mut scanner = RecordScanner::<WayFragment>::open(dest.join(names::RAW_WAYS))?;
    let mut writer = RecordWriter::<Way>::create(&result.ways_path)?;
    println!();
    println!(
        "Merging {} way types from {} fragments...",
        pending.len(),
        scanner.count()
    );

    while !pending.is_empty() {
        result.passes += 1;
        let block = collect_block(&mut scanner, &pending, config.block)?;
        pending = block.evicted.iter().copied().collect();
        if block.batches.is_empty() {
            break;
        }
        result.fragments_read += block.ways as u64;

        let ctx = MergeContext {
            restrictions: &restrictions,
            routes: &routes,
        };
        let outcomes: Vec<(TypeId, MergeOutcome)> = block
            .batches
            .into_par_iter()
            .map(|(type_id, batch)| (type_id, merge_ways(batch, &ctx)))
            .collect();

        let mut merged = Vec::new();
        for (type_id, outcome) in outcomes {
            if !outcome.merged_away.is_empty() {
                tracing::info!(
                    type_name = types.name(type_id),
                    before = outcome.ways.len() + outcome.merged_away.len(),
                    after = outcome.ways.len(),
                    "reduced ways"
                );
            }
            if let Some(err) = &outcome.integrity_error {
                tracing::error!(type_name = types.name(type_id), error = %err, "merge failed for type");
                result.failed_types.push(type_id);
            }
            result.absorb_merge(&outcome);
            merged.extend(outcome.ways);
        }

        write_resolved(&merged, &coords, &config.split, &mut writer, &mut result)?;
        println!(
            "  ✓ Pass {}: {} fragments, {} types deferred",
            result.passes,
            block.ways,
            pending.len()
        );
    }

    if !fallback.is_empty() {
        println!("Writing {} oversized way types without merging...", fallback.len());
        scanner.rewind()?;
        let pb = create_progress_bar(scanner.count(), "fallback");
        while let Some((_, fragment)) = scanner.next_record()? {
            pb.inc(1);
            if fragment.is_area || !fallback.contains(&fragment.type_id) {
                continue;
            }
            result.fragments_read += 1;
            write_resolved(
                std::slice::from_ref(&fragment),
                &coords,
                &config.split,
                &mut writer,
                &mut result,
            )?;
        }
        pb.finish_and_clear();
    }

    let summary = writer.finish()?;
    println!("  ✓ Wrote {} ({} ways)", summary.path.display(), summary.count);

    let restrictions = restrictions.into_inner().into_restrictions();
    let summary = turn_restrictions::write_sorted(&result.restrictions_path, &restrictions)?;
    result.restrictions_written = summary.count;
    println!(
        "  ✓ Wrote {} ({} restrictions)",
        summary.path.display(),
        summary.count
    );

    result.failed_types.sort_unstable();
    let elapsed = start_time.elapsed();
    println!();
    println!("✅ Step 1 complete in {:.2}s", elapsed.as_secs_f64());
    println!("   {} fragments → {} ways", result.fragments_read, result.ways_written);
    println!("   {} merged away, {} split", result.merged_away, result.split_ways);
    if result.unresolved_nodes > 0 {
        println!("   ⚠ {} unresolved node references", result.unresolved_nodes);
    }

    Ok(result)
}

fn load_restrictions(path: &Path) -> Result<RestrictionTable> {
    if path.exists() {
        RestrictionTable::load(path)
    } else {
        tracing::info!(path = %path.display(), "no turn restriction file, continuing without");
        Ok(RestrictionTable::default())
    }
}

fn load_routes(path: &Path) -> Result<RouteMembership> {
    if path.exists() {
        RouteMembership::load(path)
    } else {
        tracing::info!(path = %path.display(), "no route file, continuing without");
        Ok(RouteMembership::default())
    }
}

/// Resolve, split and append a set of merged ways
fn write_resolved(
    ways: &[WayFragment],
    resolver: &dyn CoordinateResolver,
    limits: &SplitLimits,
    writer: &mut RecordWriter<Way>,
    result: &mut WayWayResult,
) -> Result<()> {
    let ids: Vec<NodeId> = ways.iter().flat_map(|w| w.nodes.iter().copied()).collect();
    let resolved = resolver.resolve(&ids)?;

    let outcomes: Vec<_> = ways
        .par_iter()
        .map(|way| split_way(way, &resolved, limits))
        .collect();

    for outcome in outcomes {
        result.unresolved_nodes += outcome.unresolved_nodes as u64;
        result.dropped_segments += outcome.dropped_segments as u64;
        if outcome.was_split() {
            result.split_ways += 1;
        }
        for segment in &outcome.segments {
            writer.append(segment)?;
            result.ways_written += 1;
        }
    }
    Ok(())
}
