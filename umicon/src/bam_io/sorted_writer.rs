use anyhow::Result;
use rust_htslib::bam;
use rust_htslib::bam::record::Record;

use crate::errors::PipelineError;

/// Final destination of emitted records.
pub trait RecordSink {
    fn write_record(&mut self, record: &Record) -> Result<()>;
}

impl RecordSink for bam::Writer {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write(record)?;
        Ok(())
    }
}

/// Wraps a sink with the writer frontier: mapped records must leave in
/// non-decreasing `(tid, pos)` order.
#[derive(Debug)]
pub struct SortedWriter<S> {
    sink: S,
    last_tid: i32,
    last_pos: i64,
}

impl<S: RecordSink> SortedWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, last_tid: -1, last_pos: -1 }
    }

    pub fn write(&mut self, record: &Record) -> Result<()> {
        let (tid, pos) = (record.tid(), record.pos());
        if (tid, pos) < (self.last_tid, self.last_pos) && tid >= 0 && pos >= 0 {
            return Err(PipelineError::OutOfOrderEmit {
                tid,
                pos,
                last_tid: self.last_tid,
                last_pos: self.last_pos,
            }
            .into());
        }
        self.sink.write_record(record)?;
        self.last_tid = tid;
        self.last_pos = pos;
        Ok(())
    }

    pub fn frontier(&self) -> (i32, i64) {
        (self.last_tid, self.last_pos)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
