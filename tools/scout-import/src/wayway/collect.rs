//! Loading a memory-bounded block of fragments per pass over rawways.dat
//!
//! Fragments of every pending type are gathered in one scan. Whenever the
//! block exceeds its fragment or node budget and more than one type is held,
//! the type with the fewest fragments is evicted and left for a later pass.

use rustc_hash::{FxHashMap, FxHashSet};
use scout_common::Result;

use crate::formats::raw_ways::WayFragment;
use crate::formats::record::RecordScanner;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLimits {
    pub max_ways: usize,
    pub max_nodes: usize,
}

#[derive(Debug, Default)]
pub struct CollectedBlock {
    /// One batch per type, sorted by type id
    pub batches: Vec<(TypeId, Vec<WayFragment>)>,
    /// Types pushed out of this block; still pending
    pub evicted: Vec<TypeId>,
    pub ways: usize,
    pub nodes: usize,
}

pub fn collect_block(
    scanner: &mut RecordScanner<WayFragment>,
    pending: &FxHashSet<TypeId>,
    limits: BlockLimits,
) -> Result<CollectedBlock> {
    scanner.rewind()?;

    let mut collected: FxHashMap<TypeId, Vec<WayFragment>> = FxHashMap::default();
    let mut evicted: FxHashSet<TypeId> = FxHashSet::default();
    let mut ways = 0usize;
    let mut nodes = 0usize;

    while let Some((_, fragment)) = scanner.next_record()? {
        if fragment.is_area
            || !pending.contains(&fragment.type_id)
            || evicted.contains(&fragment.type_id)
        {
            continue;
        }

        ways += 1;
        nodes += fragment.nodes.len();
        collected.entry(fragment.type_id).or_default().push(fragment);

        while (ways > limits.max_ways || nodes > limits.max_nodes) && collected.len() > 1 {
            let Some(victim) = collected
                .iter()
                .min_by_key(|(type_id, batch)| (batch.len(), **type_id))
                .map(|(type_id, _)| *type_id)
            else {
                break;
            };
            if let Some(batch) = collected.remove(&victim) {
                ways -= batch.len();
                nodes -= batch.iter().map(|f| f.nodes.len()).sum::<usize>();
                tracing::debug!(
                    type_id = victim,
                    ways = batch.len(),
                    "evicting type from way block"
                );
            }
            evicted.insert(victim);
        }
    }

    let mut batches: Vec<_> = collected.into_iter().collect();
    batches.sort_by_key(|(type_id, _)| *type_id);
    let mut evicted: Vec<_> = evicted.into_iter().collect();
    evicted.sort_unstable();

    Ok(CollectedBlock {
        batches,
        evicted,
        ways,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::record::write_all;
    use tempfile::NamedTempFile;

    fn fragments() -> Vec<WayFragment> {
        let mut out = Vec::new();
        // type 1: 4 fragments, type 2: 1 fragment, type 3: 2 fragments
        for i in 0..4 {
            out.push(WayFragment::new(10 + i, 1, vec![i, i + 1]));
        }
        out.push(WayFragment::new(20, 2, vec![1, 2]));
        out.push(WayFragment::new(30, 3, vec![1, 2]));
        out.push(WayFragment::new(31, 3, vec![2, 3]));
        let mut area = WayFragment::new(40, 1, vec![1, 2, 3, 1]);
        area.is_area = true;
        out.push(area);
        out
    }

    fn scanner() -> (NamedTempFile, RecordScanner<WayFragment>) {
        let tmp = NamedTempFile::new().unwrap();
        write_all(tmp.path(), &fragments()).unwrap();
        let scanner = RecordScanner::open(tmp.path()).unwrap();
        (tmp, scanner)
    }

    #[test]
    fn test_everything_fits() {
        let (_tmp, mut scanner) = scanner();
        let pending: FxHashSet<TypeId> = [1, 2, 3].into_iter().collect();
        let block = collect_block(
            &mut scanner,
            &pending,
            BlockLimits { max_ways: 100, max_nodes: 100 },
        )
        .unwrap();

        assert!(block.evicted.is_empty());
        let sizes: Vec<_> = block.batches.iter().map(|(t, b)| (*t, b.len())).collect();
        assert_eq!(sizes, vec![(1, 4), (2, 1), (3, 2)]);
        assert_eq!(block.ways, 7);
    }

    #[test]
    fn test_least_loaded_type_is_evicted() {
        let (_tmp, mut scanner) = scanner();
        let pending: FxHashSet<TypeId> = [1, 2, 3].into_iter().collect();
        let block = collect_block(
            &mut scanner,
            &pending,
            BlockLimits { max_ways: 5, max_nodes: 100 },
        )
        .unwrap();

        // Types 2 and 3 tie at one fragment when the budget is first
        // exceeded; 2 goes, then 3 once its second fragment overflows again
        assert_eq!(block.evicted, vec![2, 3]);
        let kept: Vec<_> = block.batches.iter().map(|(t, _)| *t).collect();
        assert_eq!(kept, vec![1]);
        assert_eq!(block.ways, 4);
    }

    #[test]
    fn test_single_type_never_evicted() {
        let (_tmp, mut scanner) = scanner();
        let pending: FxHashSet<TypeId> = [1].into_iter().collect();
        let block = collect_block(
            &mut scanner,
            &pending,
            BlockLimits { max_ways: 1, max_nodes: 1 },
        )
        .unwrap();

        assert!(block.evicted.is_empty());
        assert_eq!(block.batches.len(), 1);
        assert_eq!(block.batches[0].1.len(), 4);
    }
}
