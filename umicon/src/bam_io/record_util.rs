use rust_htslib::bam::record::{Aux, Cigar, Record};

/// Edit distance from the NM tag (ED as a fallback); zero when neither is
/// present.
pub fn edit_distance(record: &Record) -> u32 {
    for tag in [&b"NM"[..], &b"ED"[..]] {
        if let Ok(aux) = record.aux(tag) {
            if let Some(value) = numeric_aux(aux) {
                return value;
            }
        }
    }
    0
}

fn numeric_aux(aux: Aux) -> Option<u32> {
    match aux {
        Aux::U8(x) => Some(x as u32),
        Aux::U16(x) => Some(x as u32),
        Aux::U32(x) => Some(x),
        Aux::I8(x) => u32::try_from(x).ok(),
        Aux::I16(x) => u32::try_from(x).ok(),
        Aux::I32(x) => u32::try_from(x).ok(),
        _ => None,
    }
}

/// Only the unique representative alignment of a read takes part in
/// clustering.
pub fn is_primary(record: &Record) -> bool {
    !record.is_secondary() && !record.is_supplementary()
}

/// Number of reference bases spanned by the alignment.
pub fn reference_span(record: &Record) -> i64 {
    record.cigar().end_pos() - record.pos()
}

/// `(read index, reference position)` for every aligned base.
///
/// Insertions and soft clips advance the read only, deletions and reference
/// skips the reference only; hard clips and padding advance neither.
pub fn aligned_ref_positions(record: &Record) -> Vec<(usize, i64)> {
    let mut pairs = Vec::with_capacity(record.seq_len());
    let mut read_pos = 0usize;
    let mut ref_pos = record.pos();
    for op in record.cigar().iter() {
        match *op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                for _ in 0..len {
                    pairs.push((read_pos, ref_pos));
                    read_pos += 1;
                    ref_pos += 1;
                }
            }
            Cigar::Ins(len) | Cigar::SoftClip(len) => read_pos += len as usize,
            Cigar::Del(len) | Cigar::RefSkip(len) => ref_pos += len as i64,
            Cigar::HardClip(_) | Cigar::Pad(_) => {}
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_htslib::bam::record::CigarString;

    use super::*;
    use crate::test_util::records::RecordBuilder;

    #[test]
    pub fn test_edit_distance_from_nm_tag() {
        let record = RecordBuilder::default().nm(3).record;
        assert_eq!(edit_distance(&record), 3);
    }

    #[test]
    pub fn test_edit_distance_defaults_to_zero() {
        let record = RecordBuilder::default().record;
        assert_eq!(edit_distance(&record), 0);
    }

    #[test]
    pub fn test_primary_check() {
        assert!(is_primary(&RecordBuilder::default().record));
        let mut secondary = RecordBuilder::default().record;
        secondary.set_flags(secondary.flags() | 0x100);
        assert!(!is_primary(&secondary));
        let mut supplementary = RecordBuilder::default().record;
        supplementary.set_flags(supplementary.flags() | 0x800);
        assert!(!is_primary(&supplementary));
    }

    #[test]
    pub fn test_reference_span_counts_deletions() {
        let cigar = CigarString::try_from("2M2D2M").unwrap();
        let record = RecordBuilder::new(b"q:ACGT", b"ACGT", Some(&cigar), &[30, 30, 30, 30]).record;
        assert_eq!(reference_span(&record), 6);
    }

    #[test]
    pub fn test_aligned_ref_positions_plain_match() {
        let record = RecordBuilder::default().pos(100).record;
        assert_eq!(aligned_ref_positions(&record), vec![(0, 100), (1, 101), (2, 102), (3, 103)]);
    }

    #[test]
    pub fn test_aligned_ref_positions_with_indels_and_clips() {
        let cigar = CigarString::try_from("1S2M1I1M1D1M").unwrap();
        let record =
            RecordBuilder::new(b"q:ACGT", b"AACGTT", Some(&cigar), &[30; 6]).pos(10).record;
        assert_eq!(aligned_ref_positions(&record), vec![(1, 10), (2, 11), (4, 12), (5, 14)]);
    }
}
