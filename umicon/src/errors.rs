use std::path::PathBuf;

/// Fatal error kinds raised by the collapsing pipeline.
///
/// Anything not listed here is propagated as a plain `anyhow::Error` with
/// context attached at the failing seam.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{path} has no usable header: at least one target sequence is required")]
    HeaderMissing { path: PathBuf },

    #[error("the input is unsorted: found {tid}:{pos} after {last_tid}:{last_pos}; sort the input first")]
    UnsortedInput { tid: i32, pos: i64, last_tid: i32, last_pos: i64 },

    #[error("record {qname} carries no UMI")]
    MissingUmi { qname: String },

    #[error("emission went backwards: {tid}:{pos} after {last_tid}:{last_pos}")]
    OutOfOrderEmit { tid: i32, pos: i64, last_tid: i32, last_pos: i64 },
}
