//! Step sequencing for `scout-import import`
//!
//! Steps run in order from `start_step` to `end_step`. A failed step stops
//! the run; outputs of earlier steps stay in place.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::area_index::{run_area_index, AreaIndexResult};
use crate::config::ImportParameter;
use crate::formats::address::AddressRecord;
use crate::formats::names;
use crate::formats::record::RecordScanner;
use crate::lock::{OutputDigest, StageLock};
use crate::wayway::{run_wayway, WayWayResult};

pub const LAST_STEP: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageInfo {
    pub step: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

pub const STAGES: [StageInfo; 2] = [
    StageInfo {
        step: 1,
        name: "wayway",
        description: "Merge way fragments and split long ways",
        inputs: &[
            names::TYPES,
            names::DISTRIBUTION,
            names::RAW_WAYS,
            names::COORDS,
            names::RAW_TURN_RESTRICTIONS,
            names::RAW_ROUTES,
        ],
        outputs: &[names::WAYS, names::TURN_RESTRICTIONS],
    },
    StageInfo {
        step: 2,
        name: "areaindex",
        description: "Build the quad-tree area index and filtered area data",
        inputs: &[names::TYPES, names::WAY_AREAS],
        outputs: &[
            names::AREA_INDEX,
            names::AREAS,
            names::AREA_IDMAP,
            names::AREA_ADDRESSES,
        ],
    },
];

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub wayway: Option<WayWayResult>,
    pub area_index: Option<AreaIndexResult>,
    pub locks: Vec<PathBuf>,
}

pub fn run_import(params: &ImportParameter) -> Result<ImportReport> {
    params.validate()?;
    let dest = &params.destination;
    if !dest.is_dir() {
        bail!("Destination {} is not a directory", dest.display());
    }

    let mut report = ImportReport::default();
    for stage in STAGES
        .iter()
        .filter(|s| (params.start_step..=params.end_step).contains(&s.step))
    {
        let span = tracing::info_span!("stage", step = stage.step, name = stage.name);
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = run_stage(stage, params, &mut report);
        let lock = match outcome {
            Ok(lock) => lock,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "stage failed");
                return Err(err.context(format!("Step {} ({}) failed", stage.step, stage.name)));
            }
        };

        let path = StageLock::path_in(dest, stage.name);
        let lock = StageLock {
            elapsed_ms: started.elapsed().as_millis() as u64,
            ..lock
        };
        lock.write(&path)?;
        report.locks.push(path);
        println!();
    }

    Ok(report)
}

fn run_stage(stage: &StageInfo, params: &ImportParameter, report: &mut ImportReport) -> Result<StageLock> {
    match stage.step {
        1 => {
            let result = run_wayway(&params.wayway())?;
            let outputs = vec![
                OutputDigest::of(&result.ways_path, result.ways_written)?,
                OutputDigest::of(&result.restrictions_path, result.restrictions_written)?,
            ];
            let lock = StageLock::new(stage.name, stage.step, outputs, &result, 0)?;
            report.wayway = Some(result);
            Ok(lock)
        }
        2 => {
            let result = run_area_index(&params.area_index())?;
            let mut outputs = vec![
                OutputDigest::of(&result.index_path, result.cells)?,
                OutputDigest::of(&result.areas_path, result.areas_written)?,
                OutputDigest::of(&result.idmap_path, result.areas_written)?,
            ];
            if let Some(path) = &result.address_path {
                let records = RecordScanner::<AddressRecord>::open(path)
                    .with_context(|| format!("Failed to reopen {}", path.display()))?
                    .count();
                outputs.push(OutputDigest::of(path, records)?);
            }
            let lock = StageLock::new(stage.name, stage.step, outputs, &result, 0)?;
            report.area_index = Some(result);
            Ok(lock)
        }
        other => bail!("Unknown step {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_table() {
        assert_eq!(STAGES.len() as u32, LAST_STEP);
        for (i, stage) in STAGES.iter().enumerate() {
            assert_eq!(stage.step, i as u32 + 1);
        }
    }

    #[test]
    fn test_missing_destination() {
        let params = ImportParameter {
            destination: PathBuf::from("/nonexistent/scout-import-test"),
            ..Default::default()
        };
        assert!(run_import(&params).is_err());
    }
}
