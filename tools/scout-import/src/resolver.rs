//! Node id to coordinate resolution
//!
//! Missing ids are not an error: callers decide what an unresolved node
//! means for the object that references it.

use rustc_hash::FxHashMap;
use scout_common::Result;

use crate::formats::coords::{CoordFile, CoordRecord};
use crate::formats::raw_ways::NodeId;
use crate::formats::ways::WayNode;
use crate::geo::GeoCoord;

pub type ResolvedNodes = FxHashMap<NodeId, WayNode>;

pub trait CoordinateResolver: Sync {
    /// Resolve every id it can; absent ids are simply not in the map
    fn resolve(&self, ids: &[NodeId]) -> Result<ResolvedNodes>;
}

impl CoordinateResolver for CoordFile {
    fn resolve(&self, ids: &[NodeId]) -> Result<ResolvedNodes> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut out = FxHashMap::default();
        out.reserve(sorted.len());
        for id in sorted {
            if let Some(rec) = self.get(id)? {
                out.insert(
                    id,
                    WayNode {
                        id,
                        serial: rec.serial,
                        coord: rec.coord,
                    },
                );
            }
        }
        Ok(out)
    }
}

/// Coordinates held in memory; used for small inputs and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryCoords {
    nodes: FxHashMap<NodeId, CoordRecord>,
}

impl MemoryCoords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, lat: f64, lon: f64) {
        self.nodes.insert(
            id,
            CoordRecord {
                id,
                serial: 0,
                coord: GeoCoord::new(lat, lon),
            },
        );
    }

    pub fn insert_record(&mut self, record: CoordRecord) {
        self.nodes.insert(record.id, record);
    }

    pub fn records(&self) -> Vec<CoordRecord> {
        self.nodes.values().copied().collect()
    }
}

impl CoordinateResolver for MemoryCoords {
    fn resolve(&self, ids: &[NodeId]) -> Result<ResolvedNodes> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.nodes.get(id).map(|rec| {
                    (
                        *id,
                        WayNode {
                            id: *id,
                            serial: rec.serial,
                            coord: rec.coord,
                        },
                    )
                })
            })
            .collect())
    }
}
