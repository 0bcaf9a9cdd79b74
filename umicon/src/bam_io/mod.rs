pub mod record_util;
pub mod sorted_writer;

use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bam;
use rust_htslib::bam::HeaderView;

use crate::errors::PipelineError;

/// Open the coordinate-sorted input alignment file (SAM or BAM, htslib
/// auto-detects).
pub fn open_input(path: &Path) -> Result<bam::Reader> {
    bam::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Name and length of every target sequence in the header, in tid order.
///
/// A header without targets cannot anchor coordinates and is fatal.
pub fn header_targets(header: &HeaderView, path: &Path) -> Result<Vec<(String, i64)>> {
    let mut targets = Vec::with_capacity(header.target_count() as usize);
    for (tid, name) in header.target_names().iter().enumerate() {
        let length = header.target_len(tid as u32).unwrap_or(0) as i64;
        targets.push((String::from_utf8_lossy(name).to_string(), length));
    }
    if targets.is_empty() {
        return Err(PipelineError::HeaderMissing { path: path.to_path_buf() }.into());
    }
    Ok(targets)
}

/// Open the output writer, copying the input header verbatim. SAM when the
/// path says so, BAM otherwise.
pub fn open_output(path: &Path, template: &HeaderView) -> Result<bam::Writer> {
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("sam") => bam::Format::Sam,
        _ => bam::Format::Bam,
    };
    let header = bam::Header::from_template(template);
    bam::Writer::from_path(path, &header, format)
        .with_context(|| format!("failed to open output {}", path.display()))
}
