//! Destination directory fixtures shared by the stage tests

#![allow(dead_code)]

use std::path::Path;

use scout_import::formats::areas::Area;
use scout_import::formats::coords::{self, CoordRecord};
use scout_import::formats::distribution::{TypeDistribution, TypeDistributionFile};
use scout_import::formats::names;
use scout_import::formats::raw_routes::RouteRelation;
use scout_import::formats::raw_ways::{NodeId, WayFragment};
use scout_import::formats::record::write_all;
use scout_import::formats::turn_restrictions::TurnRestriction;
use scout_import::geo::GeoCoord;
use scout_import::resolver::MemoryCoords;
use scout_import::types::{TypeConfig, TypeId, TypeInfo};
use scout_import::wayway::collect::BlockLimits;
use scout_import::wayway::split::SplitLimits;
use scout_import::wayway::WayWayConfig;

pub const ROAD: TypeId = 1;
pub const RAIL: TypeId = 2;
pub const PARK: TypeId = 3;
pub const HIDDEN: TypeId = 4;

pub fn type_config() -> TypeConfig {
    let info = |id, name: &str, way: bool, area: bool, ignore: bool| TypeInfo {
        id,
        name: name.to_string(),
        can_be_way: way,
        can_be_area: area,
        poi: false,
        ignore,
    };
    TypeConfig::new(vec![
        info(ROAD, "highway_residential", true, false, false),
        info(RAIL, "railway_rail", true, false, false),
        info(PARK, "leisure_park", false, true, false),
        info(HIDDEN, "hidden", true, true, true),
    ])
    .unwrap()
}

/// Node `id` placed on a diagonal grid, 0.001 degrees per id
pub fn coord_of(id: NodeId) -> GeoCoord {
    GeoCoord::new(50.0 + id as f64 * 0.001, 8.0 + id as f64 * 0.0005)
}

/// Inputs of the way stage
#[derive(Default)]
pub struct WayFixture {
    pub fragments: Vec<WayFragment>,
    pub restrictions: Vec<TurnRestriction>,
    pub routes: Vec<RouteRelation>,
    /// Node ids deliberately left out of coord.dat
    pub missing_nodes: Vec<NodeId>,
    /// Overrides of the per-type way counts
    pub way_counts: Vec<(TypeId, u64)>,
}

impl WayFixture {
    pub fn write(&self, dir: &Path) {
        type_config().write(dir.join(names::TYPES)).unwrap();

        let mut counts: Vec<(TypeId, u64)> = Vec::new();
        for f in &self.fragments {
            match counts.iter_mut().find(|(t, _)| *t == f.type_id) {
                Some((_, c)) => *c += 1,
                None => counts.push((f.type_id, 1)),
            }
        }
        for &(type_id, count) in &self.way_counts {
            counts.retain(|(t, _)| *t != type_id);
            counts.push((type_id, count));
        }
        TypeDistributionFile::from_entries(counts.into_iter().map(|(type_id, way_count)| {
            TypeDistribution {
                type_id,
                way_count,
                area_count: 0,
            }
        }))
        .write(dir.join(names::DISTRIBUTION))
        .unwrap();

        write_all(dir.join(names::RAW_WAYS), &self.fragments).unwrap();

        let mut memory = MemoryCoords::new();
        for id in self.fragments.iter().flat_map(|f| f.nodes.iter().copied()) {
            if !self.missing_nodes.contains(&id) {
                let c = coord_of(id);
                memory.insert(id, c.lat, c.lon);
            }
        }
        let records: Vec<CoordRecord> = memory.records();
        coords::write(dir.join(names::COORDS), &records).unwrap();

        if !self.restrictions.is_empty() {
            write_all(dir.join(names::RAW_TURN_RESTRICTIONS), &self.restrictions).unwrap();
        }
        if !self.routes.is_empty() {
            write_all(dir.join(names::RAW_ROUTES), &self.routes).unwrap();
        }
    }
}

pub fn wayway_config(dir: &Path) -> WayWayConfig {
    WayWayConfig {
        destination: dir.to_path_buf(),
        block: BlockLimits {
            max_ways: 1000,
            max_nodes: 100_000,
        },
        split: SplitLimits::default(),
        coord_data_memory_mapped: false,
    }
}

/// Square area with its south-west corner at (lat, lon)
pub fn square_area(id: i64, type_id: TypeId, lat: f64, lon: f64, size: f64) -> Area {
    use scout_import::formats::areas::RingNode;
    Area::simple(
        id,
        type_id,
        vec![
            RingNode::new(lat, lon),
            RingNode::new(lat, lon + size),
            RingNode::new(lat + size, lon + size),
            RingNode::new(lat + size, lon),
        ],
    )
}

pub fn write_areas(dir: &Path, areas: &[Area]) {
    if !dir.join(names::TYPES).exists() {
        type_config().write(dir.join(names::TYPES)).unwrap();
    }
    write_all(dir.join(names::WAY_AREAS), areas).unwrap();
}
