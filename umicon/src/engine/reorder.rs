use std::collections::BTreeMap;

use anyhow::Result;
use rust_htslib::bam::record::Record;

use crate::bam_io::sorted_writer::{RecordSink, SortedWriter};

/// Total emission order: coordinate first, then a flags-derived ordinal and
/// the query name so equal coordinates stay deterministic, then an insertion
/// serial as the final refinement.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct EmitKey {
    tid: i32,
    pos: i64,
    ordinal: u8,
    qname: Vec<u8>,
    serial: u64,
}

fn flag_ordinal(record: &Record) -> u8 {
    let mut ordinal = 0;
    if record.is_last_in_template() {
        ordinal |= 0b10;
    }
    if record.is_reverse() {
        ordinal |= 0b01;
    }
    ordinal
}

/// Holds finalized records until the processed frontier guarantees nothing
/// smaller can still arrive, then releases them to the writer in order.
///
/// Right mates land far downstream of the cluster that produced them, so
/// only left-mate submissions trigger a flush.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    queue: BTreeMap<EmitKey, Record>,
    serial: u64,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Insert a record; a left-mate submission flushes every buffered record
    /// at or before the processed frontier.
    pub fn submit<S: RecordSink>(
        &mut self,
        record: Record,
        is_left: bool,
        frontier: (i32, i64),
        writer: &mut SortedWriter<S>,
    ) -> Result<()> {
        let key = EmitKey {
            tid: record.tid(),
            pos: record.pos(),
            ordinal: flag_ordinal(&record),
            qname: record.qname().to_vec(),
            serial: self.serial,
        };
        self.serial += 1;
        self.queue.insert(key, record);
        if is_left {
            self.flush_through(frontier, writer)?;
        }
        Ok(())
    }

    /// Release everything, in order.
    pub fn drain<S: RecordSink>(&mut self, writer: &mut SortedWriter<S>) -> Result<()> {
        while let Some((_, record)) = self.queue.pop_first() {
            writer.write(&record)?;
        }
        Ok(())
    }

    fn flush_through<S: RecordSink>(
        &mut self,
        frontier: (i32, i64),
        writer: &mut SortedWriter<S>,
    ) -> Result<()> {
        let (frontier_tid, frontier_pos) = frontier;
        loop {
            let flushable = match self.queue.keys().next() {
                Some(key) => {
                    key.tid < frontier_tid || (key.tid == frontier_tid && key.pos <= frontier_pos)
                }
                None => false,
            };
            if !flushable {
                break;
            }
            if let Some((_, record)) = self.queue.pop_first() {
                writer.write(&record)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::records::RecordBuilder;
    use crate::test_util::VecSink;

    fn emitted_positions(writer: &SortedWriter<VecSink>) -> Vec<i64> {
        writer.sink().records.iter().map(|record| record.pos()).collect()
    }

    #[test]
    pub fn test_right_submissions_never_flush() {
        let mut buffer = ReorderBuffer::new();
        let mut writer = SortedWriter::new(VecSink::default());
        let record = RecordBuilder::default().pos(10).record;
        buffer.submit(record, false, (0, 1_000_000), &mut writer).unwrap();
        assert_eq!(writer.sink().records.len(), 0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    pub fn test_left_submission_flushes_up_to_the_frontier() {
        let mut buffer = ReorderBuffer::new();
        let mut writer = SortedWriter::new(VecSink::default());
        buffer.submit(RecordBuilder::default().pos(400).record, false, (0, 0), &mut writer).unwrap();
        buffer.submit(RecordBuilder::default().pos(10).record, false, (0, 0), &mut writer).unwrap();
        buffer.submit(RecordBuilder::default().pos(50).record, true, (0, 60), &mut writer).unwrap();
        assert_eq!(emitted_positions(&writer), vec![10, 50]);
        assert_eq!(buffer.len(), 1);
        // nothing below the frontier may remain buffered
        assert!(buffer.queue.keys().all(|key| (key.tid, key.pos) > (0, 60)));
    }

    #[test]
    pub fn test_flush_respects_an_unset_frontier() {
        let mut buffer = ReorderBuffer::new();
        let mut writer = SortedWriter::new(VecSink::default());
        buffer.submit(RecordBuilder::default().pos(10).record, true, (-1, -1), &mut writer).unwrap();
        assert_eq!(writer.sink().records.len(), 0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    pub fn test_drain_releases_everything_in_order() {
        let mut buffer = ReorderBuffer::new();
        let mut writer = SortedWriter::new(VecSink::default());
        for pos in [400i64, 10, 50] {
            buffer.submit(RecordBuilder::default().pos(pos).record, false, (-1, -1), &mut writer).unwrap();
        }
        buffer.drain(&mut writer).unwrap();
        assert_eq!(emitted_positions(&writer), vec![10, 50, 400]);
        assert!(buffer.is_empty());
    }

    #[test]
    pub fn test_identical_keys_are_kept_apart_by_the_serial() {
        let mut buffer = ReorderBuffer::new();
        let mut writer = SortedWriter::new(VecSink::default());
        for _ in 0..2 {
            buffer.submit(RecordBuilder::default().pos(10).record, false, (-1, -1), &mut writer).unwrap();
        }
        buffer.drain(&mut writer).unwrap();
        assert_eq!(writer.sink().records.len(), 2);
    }
}
