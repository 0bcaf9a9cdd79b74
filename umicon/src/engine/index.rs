use std::collections::BTreeMap;

use crate::engine::cluster::Cluster;

/// Coordinate key of a cluster.
pub type CoordKey = (i32, i64, i64);

/// Three-level ordered storage: `tid → left → right → Cluster`. Iteration
/// and eviction follow ascending key order; emptied inner maps are pruned
/// so no key maps to nothing.
#[derive(Debug, Default)]
pub struct ClusterIndex {
    tiers: BTreeMap<i32, BTreeMap<i64, BTreeMap<i64, Cluster>>>,
}

impl ClusterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster at the key, created empty on first touch.
    pub fn cluster_mut(&mut self, tid: i32, left: i64, right: i64) -> &mut Cluster {
        self.tiers
            .entry(tid)
            .or_default()
            .entry(left)
            .or_default()
            .entry(right)
            .or_insert_with(Cluster::new)
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.tiers
            .values()
            .map(|lefts| lefts.values().map(BTreeMap::len).sum::<usize>())
            .sum()
    }

    /// Remove every cluster permanently behind the read head at
    /// `(tid, pos)`: whole tiers below `tid`, and within `tid` only keys
    /// with both `left < pos` and `right < pos` (a larger `right` means the
    /// template still reaches past the head and its mate may yet arrive).
    ///
    /// Returns the evicted clusters in ascending key order together with the
    /// smallest `(tid, left)` still stored.
    pub fn evict_before(
        &mut self,
        tid: i32,
        pos: i64,
    ) -> (Vec<(CoordKey, Cluster)>, Option<(i32, i64)>) {
        let mut evicted = Vec::new();
        let tids: Vec<i32> = self.tiers.range(..=tid).map(|(t, _)| *t).collect();
        for t in tids {
            if let Some(lefts) = self.tiers.get_mut(&t) {
                let left_keys: Vec<i64> = if t == tid {
                    lefts.range(..pos).map(|(l, _)| *l).collect()
                } else {
                    lefts.keys().copied().collect()
                };
                for l in left_keys {
                    if let Some(rights) = lefts.get_mut(&l) {
                        let right_keys: Vec<i64> = if t == tid {
                            rights.range(..pos).map(|(r, _)| *r).collect()
                        } else {
                            rights.keys().copied().collect()
                        };
                        for r in right_keys {
                            if let Some(cluster) = rights.remove(&r) {
                                evicted.push(((t, l, r), cluster));
                            }
                        }
                        if rights.is_empty() {
                            lefts.remove(&l);
                        }
                    }
                }
                if lefts.is_empty() {
                    self.tiers.remove(&t);
                }
            }
        }
        (evicted, self.min_key())
    }

    /// Take every cluster, in ascending key order.
    pub fn drain_all(&mut self) -> Vec<(CoordKey, Cluster)> {
        let tiers = std::mem::take(&mut self.tiers);
        let mut drained = Vec::new();
        for (t, lefts) in tiers {
            for (l, rights) in lefts {
                for (r, cluster) in rights {
                    drained.push(((t, l, r), cluster));
                }
            }
        }
        drained
    }

    fn min_key(&self) -> Option<(i32, i64)> {
        self.tiers
            .iter()
            .next()
            .and_then(|(t, lefts)| lefts.keys().next().map(|l| (*t, *l)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::records::RecordBuilder;

    fn fill(index: &mut ClusterIndex, keys: &[CoordKey]) {
        for (tid, left, right) in keys {
            let record = RecordBuilder::default().tid(*tid).pos(*left).record;
            index.cluster_mut(*tid, *left, *right).add_read(record, "ACGT".to_owned());
        }
    }

    #[test]
    pub fn test_eviction_requires_both_coordinates_behind_the_head() {
        let mut index = ClusterIndex::new();
        fill(&mut index, &[(0, 10, 40), (0, 20, 500), (0, 300, 420)]);
        let (evicted, remaining) = index.evict_before(0, 100);
        // (0, 20, 500) still reaches past the head and must survive
        let keys: Vec<CoordKey> = evicted.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![(0, 10, 40)]);
        assert_eq!(remaining, Some((0, 20)));
        assert_eq!(index.cluster_count(), 2);
    }

    #[test]
    pub fn test_earlier_tids_are_drained_completely() {
        let mut index = ClusterIndex::new();
        fill(&mut index, &[(0, 10, 900), (0, 50, 60), (1, 5, 8), (2, 0, 100)]);
        let (evicted, remaining) = index.evict_before(1, 7);
        let keys: Vec<CoordKey> = evicted.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![(0, 10, 900), (0, 50, 60)]);
        assert_eq!(remaining, Some((1, 5)));
    }

    #[test]
    pub fn test_negative_synthetic_rights_sort_first_and_evict() {
        let mut index = ClusterIndex::new();
        fill(&mut index, &[(0, 10, -5000), (0, 10, 40)]);
        let (evicted, _) = index.evict_before(0, 100);
        let keys: Vec<CoordKey> = evicted.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![(0, 10, -5000), (0, 10, 40)]);
        assert!(index.is_empty());
    }

    #[test]
    pub fn test_emptied_tiers_are_pruned() {
        let mut index = ClusterIndex::new();
        fill(&mut index, &[(0, 10, 40)]);
        let (_, remaining) = index.evict_before(0, 100);
        assert_eq!(remaining, None);
        assert!(index.is_empty());
        assert_eq!(index.cluster_count(), 0);
    }

    #[test]
    pub fn test_drain_all_walks_in_key_order() {
        let mut index = ClusterIndex::new();
        fill(&mut index, &[(1, 5, 8), (0, 50, 60), (0, 10, 900), (0, 10, 40)]);
        let keys: Vec<CoordKey> = index.drain_all().iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![(0, 10, 40), (0, 10, 900), (0, 50, 60), (1, 5, 8)]);
        assert!(index.is_empty());
    }
}
