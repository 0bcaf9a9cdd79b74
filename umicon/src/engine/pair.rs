use std::cmp::Ordering;

use rust_htslib::bam::record::Record;

use crate::bam_io::record_util;

/// Which mate slot a record occupies within its pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MateSide {
    Left,
    Right,
}

/// Up to one record per mate side for a single query name. Singletons are
/// allowed; a pair is complete once both sides are present.
#[derive(Debug)]
pub struct ReadPair {
    pub qname: String,
    pub umi: String,
    pub left: Option<Record>,
    pub right: Option<Record>,
}

impl ReadPair {
    pub fn new(qname: String, umi: String) -> Self {
        Self { qname, umi, left: None, right: None }
    }

    /// Install a record on one side. A second record arriving on an occupied
    /// side replaces the incumbent only when it has fewer mismatches; ties
    /// retain the first.
    pub fn install(&mut self, side: MateSide, record: Record) {
        let slot = match side {
            MateSide::Left => &mut self.left,
            MateSide::Right => &mut self.right,
        };
        match slot {
            None => *slot = Some(record),
            Some(incumbent) => {
                if record_util::edit_distance(&record) < record_util::edit_distance(incumbent) {
                    *slot = Some(record);
                }
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

/// Mate side of a record: the mate whose 5' coordinate anchors the template
/// is the left one. Template sign decides for same-contig pairs, coordinate
/// order for everything else, the read-1 flag for exact ties.
pub fn mate_side(record: &Record) -> MateSide {
    if record.insert_size() > 0 {
        return MateSide::Left;
    }
    if record.insert_size() < 0 {
        return MateSide::Right;
    }
    match (record.tid(), record.pos()).cmp(&(record.mtid(), record.mpos())) {
        Ordering::Less => MateSide::Left,
        Ordering::Greater => MateSide::Right,
        Ordering::Equal => {
            if record.is_first_in_template() {
                MateSide::Left
            } else {
                MateSide::Right
            }
        }
    }
}
