//! Turn restriction table shared by the per-type merge workers
//!
//! Restrictions live in one arena; a multimap from way id (both `from` and
//! `to`) to arena slots makes lookups and remaps cheap. The table is wrapped
//! in a `parking_lot::Mutex` by the stage while workers run.

use rustc_hash::FxHashMap;
use scout_common::Result;
use std::path::Path;

use crate::formats::raw_ways::{NodeId, WayId};
use crate::formats::turn_restrictions::{self, TurnRestriction};

#[derive(Debug, Default)]
pub struct RestrictionTable {
    restrictions: Vec<TurnRestriction>,
    by_way: FxHashMap<WayId, Vec<usize>>,
}

impl RestrictionTable {
    pub fn new(restrictions: Vec<TurnRestriction>) -> Self {
        let mut by_way: FxHashMap<WayId, Vec<usize>> = FxHashMap::default();
        for (idx, r) in restrictions.iter().enumerate() {
            by_way.entry(r.from).or_default().push(idx);
            if r.to != r.from {
                by_way.entry(r.to).or_default().push(idx);
            }
        }
        Self {
            restrictions,
            by_way,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(turn_restrictions::read_all(path)?))
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// Restrictions naming `way` as from or to
    pub fn involving(&self, way: WayId) -> impl Iterator<Item = &TurnRestriction> {
        self.by_way
            .get(&way)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.restrictions[idx])
    }

    /// Some restriction passes through `via` with `way` as from or to
    pub fn is_restricted(&self, way: WayId, via: NodeId) -> bool {
        self.involving(way).any(|r| r.via == via)
    }

    /// Point every restriction referencing `old` at `new`. Returns how many
    /// restrictions changed.
    pub fn remap(&mut self, old: WayId, new: WayId) -> usize {
        if old == new {
            return 0;
        }
        let Some(slots) = self.by_way.remove(&old) else {
            return 0;
        };

        let target = self.by_way.entry(new).or_default();
        for &idx in &slots {
            let r = &mut self.restrictions[idx];
            if r.from == old {
                r.from = new;
            }
            if r.to == old {
                r.to = new;
            }
            if !target.contains(&idx) {
                target.push(idx);
            }
        }
        slots.len()
    }

    pub fn restrictions(&self) -> &[TurnRestriction] {
        &self.restrictions
    }

    pub fn into_restrictions(self) -> Vec<TurnRestriction> {
        self.restrictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_from_and_to() {
        let table = RestrictionTable::new(vec![
            TurnRestriction::forbid(1, 3, 2),
            TurnRestriction::allow(4, 7, 1),
        ]);
        assert!(table.is_restricted(1, 3));
        assert!(table.is_restricted(2, 3));
        assert!(table.is_restricted(1, 7));
        assert!(!table.is_restricted(2, 7));
        assert!(!table.is_restricted(9, 3));
        assert_eq!(table.involving(1).count(), 2);
    }

    #[test]
    fn test_remap_moves_both_ends() {
        let mut table = RestrictionTable::new(vec![
            TurnRestriction::forbid(2, 5, 8),
            TurnRestriction::forbid(8, 9, 2),
            TurnRestriction::forbid(1, 4, 6),
        ]);

        assert_eq!(table.remap(2, 1), 2);
        assert_eq!(table.restrictions()[0].from, 1);
        assert_eq!(table.restrictions()[1].to, 1);
        assert!(table.is_restricted(1, 5));
        assert!(table.is_restricted(1, 9));
        assert!(!table.is_restricted(2, 5));
        // Slot 2 was already indexed under way 1; not duplicated
        assert_eq!(table.involving(1).count(), 3);
        assert_eq!(table.remap(2, 1), 0);
    }

    #[test]
    fn test_self_loop_restriction_indexed_once() {
        let mut table = RestrictionTable::new(vec![TurnRestriction::forbid(3, 10, 3)]);
        assert_eq!(table.involving(3).count(), 1);
        table.remap(3, 4);
        let r = table.restrictions()[0];
        assert_eq!((r.from, r.to), (4, 4));
    }
}
