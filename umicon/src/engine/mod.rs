pub mod cluster;
pub mod consensus;
pub mod index;
pub mod pair;
pub mod reorder;

use anyhow::Result;
use rayon::prelude::*;
use rust_htslib::bam::record::Record;
use rust_htslib::bam::Read;

use crate::bam_io::sorted_writer::{RecordSink, SortedWriter};
use crate::bam_io::{self, record_util};
use crate::engine::cluster::{Cluster, ConsensusPair};
use crate::engine::index::{ClusterIndex, CoordKey};
use crate::engine::pair::ReadPair;
use crate::engine::reorder::ReorderBuffer;
use crate::errors::PipelineError;
use crate::options::Options;
use crate::stats::Stats;
use crate::umi;

/// Proper-index insertions between eviction passes. Larger values trade
/// memory for fewer index walks.
const FINALIZE_CADENCE: u64 = 10_000;

/// Streaming cluster-and-consensus engine.
///
/// Records are keyed into the proper/improper indexes as the sorted stream
/// advances; periodic passes evict clusters that are permanently behind the
/// read head, collapse them per UMI group, and feed the results through the
/// reorder buffer to the writer.
pub struct ConsensusEngine<S: RecordSink> {
    options: Options,
    targets: Vec<(String, i64)>,
    proper: ClusterIndex,
    improper: ClusterIndex,
    reorder: ReorderBuffer,
    writer: SortedWriter<S>,
    pre_stats: Stats,
    post_stats: Stats,
    // smallest (tid, left) not yet finalized; (n_targets, 0) once nothing is
    // pending, so the reorder buffer may flush everything
    processed_tid: i32,
    processed_pos: i64,
    last_tid: i32,
    last_pos: i64,
    insertions: u64,
    cadence: u64,
    tail_reached: bool,
}

impl<S: RecordSink> ConsensusEngine<S> {
    pub fn new(options: Options, targets: Vec<(String, i64)>, sink: S) -> Self {
        let mut pre_stats = Stats::new();
        let mut post_stats = Stats::new();
        pre_stats.init_targets(&targets);
        post_stats.init_targets(&targets);
        Self {
            options,
            targets,
            proper: ClusterIndex::new(),
            improper: ClusterIndex::new(),
            reorder: ReorderBuffer::new(),
            writer: SortedWriter::new(sink),
            pre_stats,
            post_stats,
            processed_tid: -1,
            processed_pos: -1,
            last_tid: -1,
            last_pos: -1,
            insertions: 0,
            cadence: FINALIZE_CADENCE,
            tail_reached: false,
        }
    }

    /// Ingest the next record of the sorted stream. Returns `false` once the
    /// `max_contig` cutoff says to stop reading.
    pub fn process_record(&mut self, record: Record) -> Result<bool> {
        let (tid, pos) = (record.tid(), record.pos());
        if tid >= 0 && pos >= 0 && (tid, pos) < (self.last_tid, self.last_pos) {
            return Err(PipelineError::UnsortedInput {
                tid,
                pos,
                last_tid: self.last_tid,
                last_pos: self.last_pos,
            }
            .into());
        }
        if self.options.max_contig > 0 && tid >= self.options.max_contig {
            return Ok(false);
        }
        if self.options.debug && tid > self.last_tid {
            log::debug!("starting contig {}", tid);
        }
        self.last_tid = tid;
        self.last_pos = pos;

        // the unmapped tail of a sorted file: nothing upstream can still be
        // open, so settle the proper index once
        if tid < 0 || pos < 0 {
            if !self.tail_reached {
                self.finalize_proper_all()?;
                self.reorder.drain(&mut self.writer)?;
                self.tail_reached = true;
            }
            // a primary that is itself unmapped but anchors to a mapped mate
            // still names a molecule: key it into the improper index, to be
            // settled at shutdown
            if tid < 0
                && record.mtid() >= 0
                && record.mpos() >= 0
                && record_util::is_primary(&record)
            {
                self.pre_stats.add_read(record.seq_len(), record_util::edit_distance(&record));
                self.add_to_improper(record)?;
            } else {
                self.pre_stats.add_unmapped_read(record.seq_len());
                self.post_stats.add_unmapped_read(record.seq_len());
            }
            return Ok(true);
        }

        if !record_util::is_primary(&record) {
            return Ok(true);
        }

        self.pre_stats.add_read(record.seq_len(), record_util::edit_distance(&record));
        self.pre_stats.stat_depth(tid, record.seq_len());
        self.add_to_proper(record)?;
        Ok(true)
    }

    /// End of stream: settle both indexes, then empty the reorder buffer.
    pub fn finish(&mut self) -> Result<()> {
        self.finalize_proper_all()?;
        self.finalize_improper()?;
        self.reorder.drain(&mut self.writer)?;
        Ok(())
    }

    pub fn stats(&self) -> (&Stats, &Stats) {
        (&self.pre_stats, &self.post_stats)
    }

    pub fn into_stats(self) -> (Stats, Stats) {
        (self.pre_stats, self.post_stats)
    }

    fn add_to_proper(&mut self, record: Record) -> Result<()> {
        let tid = record.tid();
        let read_pos = record.pos();
        let mut left = read_pos;
        let right: i64;

        if record.mtid() == record.tid() {
            if record.insert_size() < 0 {
                left = record.mpos();
            }
            right = left + record.insert_size().abs() - 1;
        } else if record.mtid() < 0 {
            // no usable mate anywhere: nothing to collapse against, so the
            // record goes straight out
            let frontier = self.frontier();
            return self.reorder.submit(record, true, frontier, &mut self.writer);
        } else {
            // cross-contig: a strictly negative synthetic key partitions
            // these per mate contig within the (tid, left) group
            right = -self.target_len(tid) * (record.mtid() as i64 + 1) + record.mpos();
        }

        let umi = umi::extract_umi(&record, &self.options.umi)?;
        self.proper.cluster_mut(tid, left, right).add_read(record, umi);

        self.insertions += 1;
        if self.insertions % self.cadence == 0 {
            self.evict_proper(tid, read_pos)?;
        }
        Ok(())
    }

    fn add_to_improper(&mut self, record: Record) -> Result<()> {
        let mut tid = record.tid();
        let mut left = record.pos();
        let mut right = record.mpos();
        if record.mtid() < record.tid() {
            tid = record.mtid();
            left = record.mpos();
            right = record.pos();
        }
        let umi = umi::extract_umi(&record, &self.options.umi)?;
        self.improper.cluster_mut(tid, left, right).add_read(record, umi);
        Ok(())
    }

    /// Periodic pass: evict everything permanently behind `(tid, pos)`,
    /// collapse it, and advance the processed frontier.
    fn evict_proper(&mut self, tid: i32, pos: i64) -> Result<()> {
        let (evicted, remaining) = self.proper.evict_before(tid, pos);
        match remaining {
            Some((remaining_tid, remaining_left)) => {
                self.processed_tid = remaining_tid;
                self.processed_pos = remaining_left;
            }
            None => {
                self.processed_tid = self.targets.len() as i32;
                self.processed_pos = 0;
            }
        }
        self.emit_clusters(evicted, self.options.proper_umi_diff_threshold)
    }

    fn finalize_proper_all(&mut self) -> Result<()> {
        let drained = self.proper.drain_all();
        self.processed_tid = self.targets.len() as i32;
        self.processed_pos = 0;
        self.emit_clusters(drained, self.options.proper_umi_diff_threshold)
    }

    /// Shutdown-only: cross-contig groups are collapsed like proper ones,
    /// fully-unmapped entries go out as they are.
    fn finalize_improper(&mut self) -> Result<()> {
        let drained = self.improper.drain_all();
        for ((tid, left, _), cluster) in drained {
            if tid < 0 || left < 0 {
                for read_pair in cluster.into_pairs() {
                    self.emit_raw_pair(read_pair)?;
                }
            } else {
                let collapsed = cluster
                    .cluster_by_umi(self.options.improper_umi_diff_threshold, &self.options.consensus)?;
                for consensus_pair in collapsed {
                    self.emit_pair(consensus_pair)?;
                }
            }
        }
        Ok(())
    }

    /// Evicted clusters are independent, so the consensus math runs on the
    /// rayon pool; emission stays sequential in key order.
    fn emit_clusters(&mut self, batch: Vec<(CoordKey, Cluster)>, threshold: u32) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let params = self.options.consensus.clone();
        let collapsed: Result<Vec<Vec<ConsensusPair>>> = batch
            .into_par_iter()
            .map(|(_, cluster)| cluster.cluster_by_umi(threshold, &params))
            .collect();
        for cluster_output in collapsed? {
            for consensus_pair in cluster_output {
                self.emit_pair(consensus_pair)?;
            }
        }
        Ok(())
    }

    fn emit_pair(&mut self, pair: ConsensusPair) -> Result<()> {
        self.post_stats.add_molecule(pair.reads, pair.is_complete());
        if let Some(record) = pair.left {
            self.emit_record(record, true)?;
        }
        if let Some(record) = pair.right {
            self.emit_record(record, false)?;
        }
        Ok(())
    }

    fn emit_raw_pair(&mut self, pair: ReadPair) -> Result<()> {
        self.post_stats.add_molecule(1, pair.is_complete());
        if let Some(record) = pair.left {
            self.emit_record(record, true)?;
        }
        if let Some(record) = pair.right {
            self.emit_record(record, false)?;
        }
        Ok(())
    }

    fn emit_record(&mut self, record: Record, is_left: bool) -> Result<()> {
        self.post_stats.add_read(record.seq_len(), record_util::edit_distance(&record));
        self.post_stats.stat_depth(record.tid(), record.seq_len());
        let frontier = self.frontier();
        self.reorder.submit(record, is_left, frontier, &mut self.writer)
    }

    fn frontier(&self) -> (i32, i64) {
        (self.processed_tid, self.processed_pos)
    }

    fn target_len(&self, tid: i32) -> i64 {
        self.targets.get(tid as usize).map(|(_, length)| *length).unwrap_or(0)
    }
}

/// Read `options.input` in order, collapse, and write `options.output`.
pub fn consensus(options: &Options) -> Result<(Stats, Stats)> {
    let mut reader = bam_io::open_input(&options.input)?;
    let targets = bam_io::header_targets(reader.header(), &options.input)?;
    let writer = bam_io::open_output(&options.output, reader.header())?;

    let mut engine = ConsensusEngine::new(options.clone(), targets, writer);
    let mut record = Record::new();
    while let Some(outcome) = reader.read(&mut record) {
        outcome?;
        let owned = std::mem::replace(&mut record, Record::new());
        if !engine.process_record(owned)? {
            break;
        }
    }
    engine.finish()?;
    Ok(engine.into_stats())
}
