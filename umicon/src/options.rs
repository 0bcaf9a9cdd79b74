use std::path::PathBuf;

use serde::Serialize;

/// Where the UMI of a record lives.
#[derive(Clone, Debug, Serialize)]
pub enum UmiSource {
    /// Last field of the query name, split on the delimiter.
    QnameSuffix(char),
    /// An auxiliary tag such as `RX`.
    Tag(String),
}

impl Default for UmiSource {
    fn default() -> Self {
        UmiSource::QnameSuffix(':')
    }
}

/// Tuning for per-position consensus calling.
#[derive(Clone, Debug, Serialize)]
pub struct ConsensusParams {
    /// Ceiling applied to consensus base qualities (Phred).
    pub quality_cap: u8,
    /// Subtracted from the winning quality when a dissenting vote is itself
    /// high quality.
    pub dissent_penalty: u8,
    /// Phred score at or above which a dissenting vote triggers the penalty.
    pub high_quality: u8,
    /// Append `:cs:<n>` with the group size to consensus read names.
    pub label_group_size: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self { quality_cap: 40, dissent_penalty: 10, high_quality: 30, label_group_size: false }
    }
}

/// Full configuration of one collapsing run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub umi: UmiSource,
    /// Hamming radius used when sub-clustering same-contig clusters.
    pub proper_umi_diff_threshold: u32,
    /// Hamming radius used when sub-clustering cross-contig/unmapped clusters.
    pub improper_umi_diff_threshold: u32,
    pub consensus: ConsensusParams,
    /// Stop consuming input at the first record with `tid >= max_contig`
    /// (0 disables the cutoff).
    pub max_contig: i32,
    /// Log contig transitions while streaming.
    pub debug: bool,
    pub json_report: Option<PathBuf>,
    pub html_report: Option<PathBuf>,
}

impl Options {
    pub fn new<P: Into<PathBuf>>(input: P, output: P) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            proper_umi_diff_threshold: 1,
            ..Self::default()
        }
    }
}
