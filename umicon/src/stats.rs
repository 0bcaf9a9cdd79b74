use serde::Serialize;

/// Histograms stop resolving above these values; the final bucket absorbs
/// the tail.
const MAX_TRACKED_EDIT_DISTANCE: usize = 20;
const MAX_TRACKED_GROUP_SIZE: usize = 100;

/// Depth accounting for a single target sequence.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TargetDepth {
    pub name: String,
    pub length: i64,
    pub aligned_bases: u64,
}

impl TargetDepth {
    pub fn mean_depth(&self) -> f64 {
        if self.length > 0 {
            self.aligned_bases as f64 / self.length as f64
        } else {
            0.0
        }
    }
}

/// One statistics snapshot; the pipeline keeps one for the raw input and one
/// for the emitted consensus reads.
#[derive(Clone, Debug, Serialize)]
pub struct Stats {
    pub reads: u64,
    pub bases: u64,
    pub unmapped_reads: u64,
    pub total_edit_distance: u64,
    /// `edit_distance_hist[d]` counts mapped reads with edit distance `d`.
    pub edit_distance_hist: Vec<u64>,
    pub molecules: u64,
    pub paired_molecules: u64,
    pub single_end_molecules: u64,
    /// `group_size_hist[n]` counts molecules assembled from `n` read pairs.
    pub group_size_hist: Vec<u64>,
    pub targets: Vec<TargetDepth>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            reads: 0,
            bases: 0,
            unmapped_reads: 0,
            total_edit_distance: 0,
            edit_distance_hist: vec![0; MAX_TRACKED_EDIT_DISTANCE + 1],
            molecules: 0,
            paired_molecules: 0,
            single_end_molecules: 0,
            group_size_hist: vec![0; MAX_TRACKED_GROUP_SIZE + 1],
            targets: Vec::new(),
        }
    }

    /// Register the target table so depth can be attributed per contig.
    pub fn init_targets(&mut self, targets: &[(String, i64)]) {
        self.targets = targets
            .iter()
            .map(|(name, length)| TargetDepth {
                name: name.clone(),
                length: *length,
                aligned_bases: 0,
            })
            .collect();
    }

    pub fn add_read(&mut self, length: usize, edit_distance: u32) {
        self.reads += 1;
        self.bases += length as u64;
        self.total_edit_distance += edit_distance as u64;
        let bucket = (edit_distance as usize).min(MAX_TRACKED_EDIT_DISTANCE);
        self.edit_distance_hist[bucket] += 1;
    }

    pub fn add_unmapped_read(&mut self, length: usize) {
        self.reads += 1;
        self.bases += length as u64;
        self.unmapped_reads += 1;
    }

    pub fn stat_depth(&mut self, tid: i32, length: usize) {
        if tid < 0 {
            return;
        }
        if let Some(target) = self.targets.get_mut(tid as usize) {
            target.aligned_bases += length as u64;
        }
    }

    /// One molecule observed, assembled from `group_size` read pairs.
    pub fn add_molecule(&mut self, group_size: usize, both_sides: bool) {
        self.molecules += 1;
        if both_sides {
            self.paired_molecules += 1;
        } else {
            self.single_end_molecules += 1;
        }
        let bucket = group_size.min(MAX_TRACKED_GROUP_SIZE);
        self.group_size_hist[bucket] += 1;
    }

    pub fn mean_edit_distance(&self) -> f64 {
        let mapped = self.reads - self.unmapped_reads;
        if mapped > 0 {
            self.total_edit_distance as f64 / mapped as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self, heading: &str) {
        log::info!("{}: {} reads ({} unmapped), {} bases", heading, self.reads, self.unmapped_reads, self.bases);
        log::info!("{}: mean edit distance {:.4}", heading, self.mean_edit_distance());
        if self.molecules > 0 {
            log::info!(
                "{}: {} molecules ({} paired, {} single-sided)",
                heading,
                self.molecules,
                self.paired_molecules,
                self.single_end_molecules
            );
        }
        for target in &self.targets {
            if target.aligned_bases > 0 {
                log::info!("{}: {} mean depth {:.2}", heading, target.name, target.mean_depth());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    pub fn test_add_read_updates_histogram() {
        let mut stats = Stats::new();
        stats.add_read(100, 2);
        stats.add_read(100, 2);
        stats.add_read(50, 0);
        assert_eq!(stats.reads, 3);
        assert_eq!(stats.bases, 250);
        assert_eq!(stats.edit_distance_hist[2], 2);
        assert_eq!(stats.edit_distance_hist[0], 1);
        assert_eq!(stats.total_edit_distance, 4);
    }

    #[test]
    pub fn test_edit_distance_tail_is_absorbed() {
        let mut stats = Stats::new();
        stats.add_read(10, 500);
        assert_eq!(stats.edit_distance_hist[MAX_TRACKED_EDIT_DISTANCE], 1);
    }

    #[test]
    pub fn test_unmapped_reads_do_not_enter_edit_histogram() {
        let mut stats = Stats::new();
        stats.add_unmapped_read(75);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.unmapped_reads, 1);
        assert_eq!(stats.edit_distance_hist.iter().sum::<u64>(), 0);
        assert_eq!(stats.mean_edit_distance(), 0.0);
    }

    #[test]
    pub fn test_depth_per_target() {
        let mut stats = Stats::new();
        stats.init_targets(&[("chr1".to_owned(), 1000), ("chr2".to_owned(), 500)]);
        stats.stat_depth(0, 100);
        stats.stat_depth(0, 100);
        stats.stat_depth(1, 50);
        stats.stat_depth(-1, 50);
        assert_eq!(stats.targets[0].aligned_bases, 200);
        assert_eq!(stats.targets[0].mean_depth(), 0.2);
        assert_eq!(stats.targets[1].aligned_bases, 50);
    }

    #[test]
    pub fn test_molecule_accounting() {
        let mut stats = Stats::new();
        stats.add_molecule(3, true);
        stats.add_molecule(1, false);
        assert_eq!(stats.molecules, 2);
        assert_eq!(stats.paired_molecules, 1);
        assert_eq!(stats.single_end_molecules, 1);
        assert_eq!(stats.group_size_hist[3], 1);
        assert_eq!(stats.group_size_hist[1], 1);
    }
}
