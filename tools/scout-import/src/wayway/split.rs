//! Cutting merged ways into segments bounded by node count and length
//!
//! The node where a way is cut ends one segment and starts the next, so
//! consecutive segments stay connected. Every segment keeps the id and
//! attributes of the way it came from.

use crate::formats::raw_ways::WayFragment;
use crate::formats::ways::{Way, WayNode};
use crate::geo::haversine_distance;
use crate::resolver::ResolvedNodes;

pub const DEFAULT_MAX_NODES: usize = 300;
pub const DEFAULT_MAX_LENGTH_M: f64 = 30_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitLimits {
    pub max_nodes: usize,
    /// Maximum accumulated great-circle length in meters
    pub max_length_m: f64,
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_length_m: DEFAULT_MAX_LENGTH_M,
        }
    }
}

#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub segments: Vec<Way>,
    pub unresolved_nodes: usize,
    /// Pieces left with fewer than two nodes
    pub dropped_segments: usize,
}

impl SplitOutcome {
    /// Cut into more than one piece for size reasons
    pub fn was_split(&self) -> bool {
        self.segments.len() > 1
    }
}

struct SegmentBuilder<'a> {
    source: &'a WayFragment,
    nodes: Vec<WayNode>,
    length_m: f64,
    outcome: SplitOutcome,
}

impl<'a> SegmentBuilder<'a> {
    fn close(&mut self) {
        let nodes = std::mem::take(&mut self.nodes);
        self.length_m = 0.0;

        match nodes.len() {
            0 => {}
            1 => {
                tracing::debug!(
                    way = self.source.id,
                    node = nodes[0].id,
                    "dropping single-node way segment"
                );
                self.outcome.dropped_segments += 1;
            }
            _ => self.outcome.segments.push(Way {
                id: self.source.id,
                type_id: self.source.type_id,
                features: self.source.features.clone(),
                oneway: self.source.oneway,
                nodes,
            }),
        }
    }
}

pub fn split_way(way: &WayFragment, resolved: &ResolvedNodes, limits: &SplitLimits) -> SplitOutcome {
    let mut builder = SegmentBuilder {
        source: way,
        nodes: Vec::with_capacity(way.nodes.len().min(limits.max_nodes)),
        length_m: 0.0,
        outcome: SplitOutcome::default(),
    };

    for &id in &way.nodes {
        let Some(&node) = resolved.get(&id) else {
            tracing::warn!(way = way.id, node = id, "unresolved node, truncating way segment");
            builder.outcome.unresolved_nodes += 1;
            builder.close();
            continue;
        };

        if let Some(&last) = builder.nodes.last() {
            let step = haversine_distance(last.coord, node.coord);
            let too_many = builder.nodes.len() + 1 > limits.max_nodes;
            let too_long = builder.length_m + step > limits.max_length_m;

            if (too_many || too_long) && builder.nodes.len() >= 2 {
                builder.close();
                builder.nodes.push(last);
            }
            builder.length_m += step;
        }
        builder.nodes.push(node);
    }
    builder.close();

    builder.outcome
}
