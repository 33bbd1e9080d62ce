//! Ring simplification
//!
//! Two passes per geometry ring: consecutive nodes at the same stored
//! position collapse into one, then untagged nodes lying on the straight
//! line between their neighbours are dropped.

use scout_common::Result;

use super::ProcessingFilter;
use crate::formats::areas::{Area, RingNode};
use crate::geo::distance_to_segment;
use crate::types::TypeConfig;

/// Maximum deviation in degrees for a node to count as lying on a line
pub const COLLINEAR_TOLERANCE_DEG: f64 = 1.0 / 745_654.04;

/// Fewest nodes a geometry ring may have after reduction
const MIN_RING_NODES: usize = 3;

#[derive(Debug, Default)]
pub struct NodeReductionProcessorFilter {
    duplicates: u64,
    collinear: u64,
    rings_dropped: u64,
    areas_dropped: u64,
}

impl NodeReductionProcessorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicates_removed(&self) -> u64 {
        self.duplicates
    }

    pub fn collinear_removed(&self) -> u64 {
        self.collinear
    }

    pub fn rings_dropped(&self) -> u64 {
        self.rings_dropped
    }
}

/// Collapse runs of nodes at the same fixed-point position. A tagged node
/// survives over an untagged one; two tagged nodes are both kept.
fn remove_duplicates(nodes: &[RingNode]) -> (Vec<RingNode>, usize) {
    let mut out: Vec<RingNode> = Vec::with_capacity(nodes.len());
    let mut removed = 0;

    for &node in nodes {
        if let Some(prev) = out.last_mut() {
            if prev.coord.same_fixed(node.coord) {
                if node.serial == 0 {
                    removed += 1;
                    continue;
                }
                if prev.serial == 0 {
                    prev.serial = node.serial;
                    removed += 1;
                    continue;
                }
            }
        }
        out.push(node);
    }
    (out, removed)
}

/// Drop untagged interior nodes within the tolerance of the line joining
/// the last kept node and the next one.
fn remove_collinear(nodes: &[RingNode]) -> (Vec<RingNode>, usize) {
    if nodes.len() < 3 {
        return (nodes.to_vec(), 0);
    }

    let mut out: Vec<RingNode> = Vec::with_capacity(nodes.len());
    let mut removed = 0;
    out.push(nodes[0]);

    for window in nodes[1..].windows(2) {
        let (node, next) = (window[0], window[1]);
        let prev = out[out.len() - 1];
        if node.serial == 0
            && distance_to_segment(node.coord, prev.coord, next.coord) < COLLINEAR_TOLERANCE_DEG
        {
            removed += 1;
            continue;
        }
        out.push(node);
    }
    out.push(nodes[nodes.len() - 1]);
    (out, removed)
}

impl ProcessingFilter for NodeReductionProcessorFilter {
    fn name(&self) -> &'static str {
        "node-reduction"
    }

    fn process(&mut self, _offset: u64, area: &mut Area, _types: &TypeConfig) -> Result<bool> {
        let mut rings = Vec::with_capacity(area.rings.len());

        for mut ring in std::mem::take(&mut area.rings) {
            if ring.is_master() || ring.nodes.len() < 2 {
                rings.push(ring);
                continue;
            }

            let (deduped, duplicates) = remove_duplicates(&ring.nodes);
            let (reduced, collinear) = remove_collinear(&deduped);
            self.duplicates += duplicates as u64;
            self.collinear += collinear as u64;

            let reduced_any = duplicates + collinear > 0;
            if reduced_any && reduced.len() < MIN_RING_NODES {
                tracing::debug!(
                    area = area.id,
                    nodes = reduced.len(),
                    "dropping ring collapsed by node reduction"
                );
                self.rings_dropped += 1;
                continue;
            }
            ring.nodes = reduced;
            rings.push(ring);
        }
        area.rings = rings;

        if area.geometry_rings().next().is_none() {
            tracing::debug!(area = area.id, "dropping area without geometry");
            self.areas_dropped += 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn after_all(&mut self, _types: &TypeConfig) -> Result<()> {
        tracing::info!(
            duplicates = self.duplicates,
            collinear = self.collinear,
            rings_dropped = self.rings_dropped,
            areas_dropped = self.areas_dropped,
            "node reduction finished"
        );
        Ok(())
    }
}
