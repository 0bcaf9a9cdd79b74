use rust_htslib::bam::record::{Aux, CigarString, Record};

const DEFAULT_POS: i64 = 100;
const DEFAULT_TID: i32 = 0;

const FLAG_PAIRED: u16 = 0x1;
const FLAG_REVERSE: u16 = 0x10;
const FLAG_MATE_REVERSE: u16 = 0x20;
const FLAG_READ1: u16 = 0x40;
const FLAG_READ2: u16 = 0x80;
const FLAG_DUPLICATE: u16 = 0x400;

/// Builder for in-memory htslib records; the default is a mapped 4 bp read
/// named `q0:ACGT` (UMI in the qname suffix).
pub struct RecordBuilder {
    pub record: Record,
}

impl RecordBuilder {
    pub fn new(qname: &[u8], seq: &[u8], cigar: Option<&CigarString>, qual: &[u8]) -> Self {
        let mut record = Record::new();
        record.set(qname, cigar, seq, qual);
        record.set_pos(DEFAULT_POS);
        record.set_tid(DEFAULT_TID);
        record.set_mtid(-1);
        record.set_mpos(-1);
        RecordBuilder { record }
    }

    pub fn qname(mut self, qname: &[u8]) -> Self {
        self.record.set_qname(qname);
        self
    }

    pub fn pos(mut self, pos: i64) -> Self {
        self.record.set_pos(pos);
        self
    }

    pub fn tid(mut self, tid: i32) -> Self {
        self.record.set_tid(tid);
        self
    }

    pub fn mtid(mut self, mtid: i32) -> Self {
        self.record.set_mtid(mtid);
        self
    }

    pub fn mpos(mut self, mpos: i64) -> Self {
        self.record.set_mpos(mpos);
        self
    }

    pub fn isize(mut self, insert_size: i64) -> Self {
        self.record.set_insert_size(insert_size);
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.record.set_flags(flags);
        self
    }

    pub fn duplicate(mut self) -> Self {
        self.record.set_flags(self.record.flags() | FLAG_DUPLICATE);
        self
    }

    pub fn nm(mut self, nm: i32) -> Self {
        self.record.push_aux(b"NM", Aux::I32(nm)).unwrap();
        self
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        let cigar = CigarString::try_from("4M").unwrap();
        RecordBuilder::new(b"q0:ACGT", b"ACGT", Some(&cigar), &[30, 30, 30, 30])
    }
}

/// A properly mated 4 bp read pair: the left mate at `pos`, the right mate
/// ending exactly at `pos + isize - 1`.
pub fn mated_pair(qname: &[u8], tid: i32, pos: i64, isize: i64) -> (Record, Record) {
    let left = RecordBuilder::default()
        .qname(qname)
        .tid(tid)
        .pos(pos)
        .mtid(tid)
        .mpos(pos + isize - 4)
        .isize(isize)
        .flags(FLAG_PAIRED | FLAG_READ1 | FLAG_MATE_REVERSE)
        .record;
    let right = RecordBuilder::default()
        .qname(qname)
        .tid(tid)
        .pos(pos + isize - 4)
        .mtid(tid)
        .mpos(pos)
        .isize(-isize)
        .flags(FLAG_PAIRED | FLAG_READ2 | FLAG_REVERSE)
        .record;
    (left, right)
}
