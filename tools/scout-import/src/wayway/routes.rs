//! Way to route relation membership. Read-only once loaded.

use rustc_hash::FxHashMap;
use scout_common::Result;
use std::path::Path;

use crate::formats::raw_routes::RouteRelation;
use crate::formats::raw_ways::WayId;
use crate::formats::record::RecordScanner;

#[derive(Debug, Default)]
pub struct RouteMembership {
    routes: FxHashMap<WayId, Vec<i64>>,
}

impl RouteMembership {
    pub fn from_relations<'a, I>(relations: I) -> Self
    where
        I: IntoIterator<Item = &'a RouteRelation>,
    {
        let mut routes: FxHashMap<WayId, Vec<i64>> = FxHashMap::default();
        for relation in relations {
            for way in relation.way_members() {
                routes.entry(way).or_default().push(relation.id);
            }
        }
        for ids in routes.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        Self { routes }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut scanner = RecordScanner::<RouteRelation>::open(path)?;
        let mut relations = Vec::new();
        while let Some((_, relation)) = scanner.next_record()? {
            relations.push(relation);
        }
        Ok(Self::from_relations(&relations))
    }

    /// Sorted route ids of a way, empty when it belongs to none
    pub fn routes_of(&self, way: WayId) -> &[i64] {
        self.routes.get(&way).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn same_routes(&self, a: WayId, b: WayId) -> bool {
        self.routes_of(a) == self.routes_of(b)
    }

    /// Number of ways in at least one route
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::raw_routes::{MemberKind, RouteMember};

    fn route(id: i64, ways: &[i64]) -> RouteRelation {
        RouteRelation {
            id,
            members: ways
                .iter()
                .map(|&w| RouteMember { kind: MemberKind::Way, id: w })
                .collect(),
        }
    }

    #[test]
    fn test_membership_sets() {
        let relations = vec![route(100, &[1, 2]), route(50, &[2, 1, 1]), route(7, &[3])];
        let membership = RouteMembership::from_relations(&relations);

        assert_eq!(membership.routes_of(1), &[50, 100]);
        assert!(membership.same_routes(1, 2));
        assert!(!membership.same_routes(1, 3));
        assert!(membership.same_routes(8, 9));
        assert!(membership.routes_of(8).is_empty());
        assert_eq!(membership.len(), 3);
    }
}
