use anyhow::Result;
use rust_htslib::bam::record::{Aux, Record};

use crate::errors::PipelineError;
use crate::options::UmiSource;

/// Pull the molecular identifier off a record.
///
/// A record without a usable UMI is a fatal input defect: the whole grouping
/// model depends on it.
pub fn extract_umi(record: &Record, source: &UmiSource) -> Result<String> {
    let qname = String::from_utf8_lossy(record.qname()).into_owned();
    match source {
        UmiSource::QnameSuffix(delimiter) => match qname.rfind(*delimiter) {
            Some(at) if at + delimiter.len_utf8() < qname.len() => {
                Ok(qname[at + delimiter.len_utf8()..].to_owned())
            }
            _ => Err(PipelineError::MissingUmi { qname }.into()),
        },
        UmiSource::Tag(tag) => match record.aux(tag.as_bytes()) {
            Ok(Aux::String(value)) if !value.is_empty() => Ok(value.to_owned()),
            _ => Err(PipelineError::MissingUmi { qname }.into()),
        },
    }
}

/// Hamming distance between two identifiers; identifiers of unequal length
/// never match.
pub fn hamming(a: &str, b: &str) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count() as u32)
}

/// True when `b` lies within `threshold` substitutions of `a`.
pub fn within(a: &str, b: &str, threshold: u32) -> bool {
    matches!(hamming(a, b), Some(distance) if distance <= threshold)
}
