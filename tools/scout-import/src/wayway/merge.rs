//! Joining way fragments of one type that share endpoints
//!
//! Fragments are processed longest first (ties by ascending id). Each one
//! is extended at its last node for as long as exactly one eligible partner
//! ends there; fragments that may be traversed both ways are then extended
//! at their first node too. A partner that gets spliced in is removed from
//! every index and its id is blacklisted.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scout_common::Error;

use super::restrictions::RestrictionTable;
use super::routes::RouteMembership;
use crate::formats::raw_ways::{NodeId, WayFragment, WayId};

/// Shared, read-mostly state every merge worker consults
pub struct MergeContext<'a> {
    pub restrictions: &'a Mutex<RestrictionTable>,
    pub routes: &'a RouteMembership,
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Surviving ways, sorted by id
    pub ways: Vec<WayFragment>,
    /// Ids of fragments spliced into another way; never candidates again
    pub merged_away: Vec<WayId>,
    pub ambiguous_junctions: usize,
    pub restriction_vetoes: usize,
    pub route_vetoes: usize,
    /// Set when the batch stopped early on inconsistent indices
    pub integrity_error: Option<Error>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Forward,
    Reversed,
}

struct Merger<'a> {
    slots: Vec<Option<WayFragment>>,
    by_first: FxHashMap<NodeId, Vec<usize>>,
    by_last: FxHashMap<NodeId, Vec<usize>>,
    ctx: &'a MergeContext<'a>,
    outcome: MergeOutcome,
}

/// Merge one batch of fragments. All fragments are expected to share a type.
pub fn merge_ways(batch: Vec<WayFragment>, ctx: &MergeContext<'_>) -> MergeOutcome {
    let mut merger = Merger::new(batch, ctx);

    let mut order: Vec<usize> = (0..merger.slots.len()).collect();
    order.sort_by_key(|&slot| {
        let way = merger.slots[slot].as_ref();
        (
            std::cmp::Reverse(way.map_or(0, |w| w.nodes.len())),
            way.map_or(WayId::MAX, |w| w.id),
        )
    });

    for slot in order {
        if let Err(err) = merger.process(slot) {
            tracing::error!(error = %err, "way merge stopped, keeping partial batch");
            merger.outcome.integrity_error = Some(err);
            break;
        }
    }

    merger.finish()
}

fn push_slot(index: &mut FxHashMap<NodeId, Vec<usize>>, node: NodeId, slot: usize) {
    index.entry(node).or_default().push(slot);
}

fn drop_slot(index: &mut FxHashMap<NodeId, Vec<usize>>, node: NodeId, slot: usize) {
    if let Some(slots) = index.get_mut(&node) {
        slots.retain(|&s| s != slot);
        if slots.is_empty() {
            index.remove(&node);
        }
    }
}

impl<'a> Merger<'a> {
    fn new(batch: Vec<WayFragment>, ctx: &'a MergeContext<'a>) -> Self {
        let mut merger = Self {
            slots: Vec::with_capacity(batch.len()),
            by_first: FxHashMap::default(),
            by_last: FxHashMap::default(),
            ctx,
            outcome: MergeOutcome::default(),
        };

        for (slot, way) in batch.into_iter().enumerate() {
            if way.nodes.len() >= 2 && !way.is_circular() {
                if let (Some(first), Some(last)) = (way.first_node(), way.last_node()) {
                    push_slot(&mut merger.by_first, first, slot);
                    push_slot(&mut merger.by_last, last, slot);
                }
            }
            merger.slots.push(Some(way));
        }
        merger
    }

    fn finish(self) -> MergeOutcome {
        let mut outcome = self.outcome;
        outcome.ways = self.slots.into_iter().flatten().collect();
        outcome.ways.sort_by_key(|w| w.id);
        outcome.merged_away.sort_unstable();
        outcome
    }

    fn is_mergeable(&self, slot: usize) -> bool {
        self.slots[slot]
            .as_ref()
            .is_some_and(|w| w.nodes.len() >= 2 && !w.is_circular())
    }

    fn process(&mut self, slot: usize) -> Result<(), Error> {
        if !self.is_mergeable(slot) {
            return Ok(());
        }

        while self.extend_tail(slot)? {}

        let oneway = self.slots[slot].as_ref().is_some_and(|w| w.oneway);
        if !oneway && self.is_mergeable(slot) {
            self.reverse(slot);
            while self.extend_tail(slot)? {}
            if self.is_mergeable(slot) {
                self.reverse(slot);
            } else if let Some(way) = self.slots[slot].as_mut() {
                // Closed while reversed; restore the original direction
                way.nodes.reverse();
            }
        }
        Ok(())
    }

    /// Reverse a non-circular way, keeping the endpoint indices in sync
    fn reverse(&mut self, slot: usize) {
        let Some(way) = self.slots[slot].as_mut() else {
            return;
        };
        let (Some(first), Some(last)) = (way.first_node(), way.last_node()) else {
            return;
        };
        way.nodes.reverse();

        drop_slot(&mut self.by_first, first, slot);
        drop_slot(&mut self.by_last, last, slot);
        push_slot(&mut self.by_first, last, slot);
        push_slot(&mut self.by_last, first, slot);
    }

    /// Other live fragments indexed as ending at `node`
    fn candidates_at(&self, node: NodeId, exclude: usize) -> Result<Vec<usize>, Error> {
        let mut found: Vec<usize> = self
            .by_first
            .get(&node)
            .into_iter()
            .chain(self.by_last.get(&node))
            .flatten()
            .copied()
            .filter(|&s| s != exclude)
            .collect();
        found.sort_unstable();
        found.dedup();

        for &slot in &found {
            match self.slots[slot].as_ref() {
                Some(way) if way.terminates_at(node) => {}
                Some(way) => {
                    return Err(Error::integrity(format!(
                        "way {} indexed at node {} but does not end there",
                        way.id, node
                    )))
                }
                None => {
                    return Err(Error::integrity(format!(
                        "merge index references removed fragment slot {} at node {}",
                        slot, node
                    )))
                }
            }
        }
        Ok(found)
    }

    /// Try to splice one partner onto the last node of `slot`
    fn extend_tail(&mut self, slot: usize) -> Result<bool, Error> {
        if !self.is_mergeable(slot) {
            return Ok(false);
        }
        let Some(way) = self.slots[slot].as_ref() else {
            return Ok(false);
        };
        let Some(via) = way.last_node() else {
            return Ok(false);
        };

        let candidates = self.candidates_at(via, slot)?;
        let matching: Vec<usize> = candidates
            .into_iter()
            .filter(|&c| {
                self.slots[c].as_ref().is_some_and(|other| {
                    other.type_id == way.type_id
                        && other.oneway == way.oneway
                        && other.features == way.features
                })
            })
            .collect();

        let partner = match matching.as_slice() {
            [] => return Ok(false),
            [only] => *only,
            _ => {
                tracing::debug!(
                    way = way.id,
                    node = via,
                    candidates = matching.len(),
                    "ambiguous junction, not merging"
                );
                self.outcome.ambiguous_junctions += 1;
                return Ok(false);
            }
        };

        let Some(other) = self.slots[partner].as_ref() else {
            return Ok(false);
        };
        let orientation = if other.first_node() == Some(via) {
            Orientation::Forward
        } else if way.oneway {
            // Oneway partner pointing into the junction
            return Ok(false);
        } else {
            Orientation::Reversed
        };

        let (way_id, other_id) = (way.id, other.id);
        {
            let table = self.ctx.restrictions.lock();
            if table.is_restricted(way_id, via) || table.is_restricted(other_id, via) {
                tracing::debug!(
                    way = way_id,
                    other = other_id,
                    node = via,
                    "turn restriction at junction, not merging"
                );
                self.outcome.restriction_vetoes += 1;
                return Ok(false);
            }
        }
        if !self.ctx.routes.same_routes(way_id, other_id) {
            self.outcome.route_vetoes += 1;
            return Ok(false);
        }

        self.splice(slot, partner, via, orientation)?;
        Ok(true)
    }

    fn splice(
        &mut self,
        slot: usize,
        partner: usize,
        via: NodeId,
        orientation: Orientation,
    ) -> Result<(), Error> {
        let other = self.slots[partner].take().ok_or_else(|| {
            Error::integrity(format!("fragment slot {} vanished during merge", partner))
        })?;
        if let (Some(first), Some(last)) = (other.first_node(), other.last_node()) {
            drop_slot(&mut self.by_first, first, partner);
            drop_slot(&mut self.by_last, last, partner);
        }
        drop_slot(&mut self.by_last, via, slot);

        let way = self.slots[slot].as_mut().ok_or_else(|| {
            Error::integrity(format!("fragment slot {} vanished during merge", slot))
        })?;
        match orientation {
            Orientation::Forward => way.nodes.extend(other.nodes.iter().skip(1)),
            Orientation::Reversed => way.nodes.extend(other.nodes.iter().rev().skip(1)),
        }

        let way_id = way.id;
        let circular = way.is_circular();
        let (first, last) = (way.first_node(), way.last_node());

        if circular {
            if let Some(first) = first {
                drop_slot(&mut self.by_first, first, slot);
            }
        } else if let Some(last) = last {
            push_slot(&mut self.by_last, last, slot);
        }

        self.ctx.restrictions.lock().remap(other.id, way_id);
        self.outcome.merged_away.push(other.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;
    use crate::formats::raw_routes::{MemberKind, RouteMember, RouteRelation};
    use crate::formats::turn_restrictions::TurnRestriction;

    fn frag(id: WayId, nodes: &[NodeId]) -> WayFragment {
        WayFragment::new(id, 1, nodes.to_vec())
    }

    fn run(batch: Vec<WayFragment>, restrictions: Vec<TurnRestriction>) -> (MergeOutcome, Vec<TurnRestriction>) {
        run_with_routes(batch, restrictions, RouteMembership::default())
    }

    fn run_with_routes(
        batch: Vec<WayFragment>,
        restrictions: Vec<TurnRestriction>,
        routes: RouteMembership,
    ) -> (MergeOutcome, Vec<TurnRestriction>) {
        let table = Mutex::new(RestrictionTable::new(restrictions));
        let ctx = MergeContext {
            restrictions: &table,
            routes: &routes,
        };
        let outcome = merge_ways(batch, &ctx);
        (outcome, table.into_inner().into_restrictions())
    }

    #[test]
    fn test_three_way_junction_is_not_merged() {
        let (outcome, _) = run(
            vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5]), frag(3, &[3, 6, 7])],
            Vec::new(),
        );
        assert_eq!(outcome.ways.len(), 3);
        assert!(outcome.merged_away.is_empty());
        assert!(outcome.ambiguous_junctions > 0);
    }

    #[test]
    fn test_restriction_at_junction_blocks_merge() {
        let restriction = TurnRestriction::forbid(1, 3, 9);
        let (outcome, restrictions) = run(
            vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5])],
            vec![restriction],
        );
        assert_eq!(outcome.ways.len(), 2);
        assert_eq!(restrictions, vec![restriction]);
        assert!(outcome.restriction_vetoes > 0);
    }

    #[test]
    fn test_simple_chain_merges() {
        let (outcome, _) = run(vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5])], Vec::new());
        assert_eq!(outcome.ways.len(), 1);
        assert_eq!(outcome.ways[0].id, 1);
        assert_eq!(outcome.ways[0].nodes, vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome.merged_away, vec![2]);
    }

    #[test]
    fn test_longer_fragment_keeps_its_id() {
        let (outcome, _) = run(vec![frag(1, &[1, 2]), frag(2, &[2, 3, 4, 5])], Vec::new());
        assert_eq!(outcome.ways.len(), 1);
        assert_eq!(outcome.ways[0].id, 2);
        // Extended at its start, original direction kept
        assert_eq!(outcome.ways[0].nodes, vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome.merged_away, vec![1]);
    }

    #[test]
    fn test_reversed_partner_for_two_way_roads() {
        let (outcome, _) = run(vec![frag(1, &[1, 2, 3]), frag(2, &[5, 4, 3])], Vec::new());
        assert_eq!(outcome.ways.len(), 1);
        assert_eq!(outcome.ways[0].nodes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_oneway_direction_respected() {
        let mut a = frag(1, &[1, 2, 3]);
        a.oneway = true;
        let mut b = frag(2, &[5, 4, 3]);
        b.oneway = true;
        let (outcome, _) = run(vec![a.clone(), b], Vec::new());
        assert_eq!(outcome.ways.len(), 2);

        let mut c = frag(3, &[3, 4, 5]);
        c.oneway = true;
        let (outcome, _) = run(vec![a, c], Vec::new());
        assert_eq!(outcome.ways.len(), 1);
        assert_eq!(outcome.ways[0].nodes, vec![1, 2, 3, 4, 5]);
        assert!(outcome.ways[0].oneway);
    }

    #[test]
    fn test_oneway_and_twoway_do_not_merge() {
        let mut a = frag(1, &[1, 2, 3]);
        a.oneway = true;
        let (outcome, _) = run(vec![a, frag(2, &[3, 4, 5])], Vec::new());
        assert_eq!(outcome.ways.len(), 2);
    }

    #[test]
    fn test_different_attributes_do_not_merge() {
        let mut a = frag(1, &[1, 2, 3]);
        a.features.set(FeatureKind::Name, "Main Street");
        let mut b = frag(2, &[3, 4, 5]);
        b.features.set(FeatureKind::Name, "High Street");
        let (outcome, _) = run(vec![a, b], Vec::new());
        assert_eq!(outcome.ways.len(), 2);
    }

    #[test]
    fn test_third_fragment_with_other_attributes_is_not_ambiguous() {
        let mut c = frag(3, &[3, 6, 7]);
        c.features.set(FeatureKind::Name, "Side Road");
        let (outcome, _) = run(vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5]), c], Vec::new());
        assert_eq!(outcome.ways.len(), 2);
        assert_eq!(outcome.merged_away, vec![2]);
    }

    #[test]
    fn test_route_membership_must_match() {
        let routes = RouteMembership::from_relations(&[RouteRelation {
            id: 77,
            members: vec![RouteMember { kind: MemberKind::Way, id: 1 }],
        }]);
        let (outcome, _) = run_with_routes(
            vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5])],
            Vec::new(),
            routes,
        );
        assert_eq!(outcome.ways.len(), 2);
        assert_eq!(outcome.route_vetoes, 2);
    }

    #[test]
    fn test_restrictions_follow_merged_way() {
        // Restriction at node 5 names way 2, which gets merged into way 1
        let (outcome, restrictions) = run(
            vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5]), frag(9, &[5, 8])],
            vec![TurnRestriction::forbid(2, 5, 9)],
        );
        assert_eq!(outcome.merged_away, vec![2]);
        assert_eq!(restrictions[0].from, 1);

        let merged = outcome.ways.iter().find(|w| w.id == 1).unwrap();
        assert!(merged.terminates_at(restrictions[0].via));
    }

    #[test]
    fn test_chain_closes_into_ring() {
        let (outcome, _) = run(
            vec![frag(1, &[1, 2, 3]), frag(2, &[3, 4, 5]), frag(3, &[5, 6, 1])],
            Vec::new(),
        );
        assert_eq!(outcome.ways.len(), 1);
        assert!(outcome.ways[0].is_circular());
        assert_eq!(outcome.ways[0].nodes, vec![1, 2, 3, 4, 5, 6, 1]);
    }

    #[test]
    fn test_long_chain_merges_into_one() {
        let batch: Vec<_> = (0..10).map(|i| frag(100 + i, &[i, i + 1])).collect();
        let (outcome, _) = run(batch, Vec::new());
        assert_eq!(outcome.ways.len(), 1);
        assert_eq!(outcome.ways[0].nodes, (0..=10).collect::<Vec<_>>());
        assert_eq!(outcome.merged_away.len(), 9);
    }
}
