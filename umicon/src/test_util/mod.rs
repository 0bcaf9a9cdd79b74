pub mod records;

use anyhow::Result;
use rust_htslib::bam::record::Record;

use crate::bam_io::sorted_writer::RecordSink;

/// Captures written records for assertions.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<Record>,
}

impl RecordSink for VecSink {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
