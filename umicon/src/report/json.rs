use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::report::Reporter;
use crate::stats::Stats;

#[derive(Serialize)]
struct ReportDocument<'a> {
    before_collapsing: &'a Stats,
    after_collapsing: &'a Stats,
}

/// Writes both snapshots as pretty-printed JSON.
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReporter {
    fn report(&self, pre: &Stats, post: &Stats) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        let document = ReportDocument { before_collapsing: pre, after_collapsing: post };
        serde_json::to_writer_pretty(BufWriter::new(file), &document)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
