use std::collections::BTreeMap;

use anyhow::Result;
use rust_htslib::bam::record::Record;

use crate::engine::consensus;
use crate::engine::pair::{mate_side, ReadPair};
use crate::options::ConsensusParams;
use crate::umi;

/// Consensus output for one molecule: up to one record per mate side plus
/// the number of read pairs that contributed.
#[derive(Debug)]
pub struct ConsensusPair {
    pub left: Option<Record>,
    pub right: Option<Record>,
    pub reads: usize,
}

impl ConsensusPair {
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

/// All read pairs observed at one coordinate key.
#[derive(Debug, Default)]
pub struct Cluster {
    pairs: BTreeMap<String, ReadPair>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// File the record under its query name, creating the pair on first
    /// sight and picking the mate slot from the record itself.
    pub fn add_read(&mut self, record: Record, umi: String) {
        let qname = String::from_utf8_lossy(record.qname()).into_owned();
        let side = mate_side(&record);
        let pair = self.pairs.entry(qname.clone()).or_insert_with(|| ReadPair::new(qname, umi));
        pair.install(side, record);
    }

    /// Hand the pairs out untouched, for entries that cannot be
    /// consensus-called.
    pub fn into_pairs(self) -> Vec<ReadPair> {
        self.pairs.into_values().collect()
    }

    /// Greedy centroid grouping by UMI similarity, then one consensus pair
    /// per group.
    ///
    /// Pairs are visited in `(umi, qname)` order; each joins the first open
    /// group whose centroid UMI lies within `threshold` substitutions, or
    /// opens a new group with itself as the centroid.
    pub fn cluster_by_umi(
        self,
        threshold: u32,
        params: &ConsensusParams,
    ) -> Result<Vec<ConsensusPair>> {
        let mut pairs: Vec<ReadPair> = self.pairs.into_values().collect();
        pairs.sort_by(|a, b| a.umi.cmp(&b.umi).then_with(|| a.qname.cmp(&b.qname)));

        let mut groups: Vec<(String, Vec<ReadPair>)> = Vec::new();
        for pair in pairs {
            match groups
                .iter_mut()
                .find(|(centroid, _)| umi::within(centroid, &pair.umi, threshold))
            {
                Some((_, members)) => members.push(pair),
                None => groups.push((pair.umi.clone(), vec![pair])),
            }
        }

        groups
            .into_iter()
            .map(|(_, members)| consensus::consensus_pair(members, params))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::records::mated_pair;

    fn filled_cluster(umis: &[&str]) -> Cluster {
        let mut cluster = Cluster::new();
        for (index, umi) in umis.iter().enumerate() {
            let qname = format!("q{}:{}", index, umi);
            let (left, right) = mated_pair(qname.as_bytes(), 0, 100, 150);
            cluster.add_read(left, (*umi).to_owned());
            cluster.add_read(right, (*umi).to_owned());
        }
        cluster
    }

    #[test]
    pub fn test_add_read_fills_both_sides_of_one_pair() {
        let cluster = filled_cluster(&["ACGT"]);
        assert_eq!(cluster.len(), 1);
        let pairs = cluster.into_pairs();
        assert!(pairs[0].is_complete());
    }

    #[test]
    pub fn test_identical_umis_collapse_to_one_molecule() {
        let cluster = filled_cluster(&["ACGT", "ACGT"]);
        let out = cluster.cluster_by_umi(0, &ConsensusParams::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reads, 2);
        assert!(out[0].is_complete());
    }

    #[test]
    pub fn test_distance_one_merges_at_threshold_one() {
        let cluster = filled_cluster(&["ACGT", "ACGA"]);
        let out = cluster.cluster_by_umi(1, &ConsensusParams::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reads, 2);
    }

    #[test]
    pub fn test_distance_one_splits_at_threshold_zero() {
        let cluster = filled_cluster(&["ACGT", "ACGA"]);
        let out = cluster.cluster_by_umi(0, &ConsensusParams::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|pair| pair.reads == 1));
    }

    #[test]
    pub fn test_unequal_umi_lengths_never_merge() {
        let cluster = filled_cluster(&["ACGT", "ACGTT"]);
        let out = cluster.cluster_by_umi(100, &ConsensusParams::default()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    pub fn test_grouping_joins_the_first_matching_centroid() {
        // AAAT joins the AAAA group (distance 1) even though AATT would
        // also be reachable from it
        let cluster = filled_cluster(&["AAAA", "AATT", "AAAT"]);
        let out = cluster.cluster_by_umi(1, &ConsensusParams::default()).unwrap();
        assert_eq!(out.len(), 2);
        let mut sizes: Vec<usize> = out.iter().map(|pair| pair.reads).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2]);
    }
}
