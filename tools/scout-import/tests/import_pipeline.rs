//! Both import steps in sequence with lock files

mod common;

use common::*;
use scout_import::formats::names;
use scout_import::formats::raw_ways::WayFragment;
use scout_import::lock::{compute_sha256, StageLock};
use scout_import::{run_import, ImportParameter};
use tempfile::TempDir;

fn prepared_destination() -> TempDir {
    let dir = TempDir::new().unwrap();
    WayFixture {
        fragments: vec![
            WayFragment::new(10, ROAD, vec![1, 2, 3]),
            WayFragment::new(20, ROAD, vec![3, 4, 5]),
            WayFragment::new(30, RAIL, vec![7, 8]),
        ],
        ..Default::default()
    }
    .write(dir.path());
    write_areas(
        dir.path(),
        &[
            square_area(1, PARK, 50.0, 8.0, 0.01),
            square_area(2, PARK, 50.2, 8.1, 0.5),
        ],
    );
    dir
}

fn params(dir: &TempDir) -> ImportParameter {
    ImportParameter {
        destination: dir.path().to_path_buf(),
        raw_way_block_size: 1000,
        raw_coord_block_size: 100_000,
        area_index_max_level: 12,
        ..Default::default()
    }
}

#[test]
fn test_full_import_writes_locks() {
    let dir = prepared_destination();
    let report = run_import(&params(&dir)).unwrap();

    let wayway = report.wayway.as_ref().unwrap();
    assert_eq!(wayway.ways_written, 2);
    let area_index = report.area_index.as_ref().unwrap();
    assert_eq!(area_index.areas_written, 2);
    assert_eq!(report.locks.len(), 2);

    for (path, stage) in report.locks.iter().zip(["wayway", "areaindex"]) {
        assert_eq!(path, &StageLock::path_in(dir.path(), stage));
        let lock = StageLock::read(path).unwrap();
        assert_eq!(lock.stage, stage);
        assert!(!lock.outputs.is_empty());
        for output in &lock.outputs {
            let file = dir.path().join(&output.file);
            assert_eq!(output.sha256, compute_sha256(&file).unwrap());
            assert_eq!(output.bytes, std::fs::metadata(&file).unwrap().len());
        }
    }

    let lock = StageLock::read(StageLock::path_in(dir.path(), "wayway")).unwrap();
    assert_eq!(lock.step, 1);
    assert_eq!(lock.summary["merged_away"], 1);
    assert_eq!(lock.outputs[0].file, names::WAYS);
    assert_eq!(lock.outputs[0].records, 2);
}

#[test]
fn test_step_range_is_honoured() {
    let dir = prepared_destination();
    let report = run_import(&ImportParameter {
        start_step: 2,
        ..params(&dir)
    })
    .unwrap();

    assert!(report.wayway.is_none());
    assert!(report.area_index.is_some());
    assert!(!dir.path().join(names::WAYS).exists());
    assert!(dir.path().join(names::AREA_INDEX).exists());
    assert!(!StageLock::path_in(dir.path(), "wayway").exists());
}

#[test]
fn test_failed_step_stops_run() {
    let dir = prepared_destination();
    std::fs::remove_file(dir.path().join(names::WAY_AREAS)).unwrap();

    let err = run_import(&params(&dir)).unwrap_err();
    assert!(format!("{err:#}").contains("Step 2 (areaindex) failed"));
    // the first step's outputs stay in place
    assert!(dir.path().join(names::WAYS).exists());
    assert!(StageLock::path_in(dir.path(), "wayway").exists());
    assert!(!StageLock::path_in(dir.path(), "areaindex").exists());
}
