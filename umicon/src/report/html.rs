use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::report::Reporter;
use crate::stats::Stats;

/// Renders both snapshots as a small standalone HTML page.
pub struct HtmlReporter {
    path: PathBuf,
}

impl HtmlReporter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for HtmlReporter {
    fn report(&self, pre: &Stats, post: &Stats) -> Result<()> {
        fs::write(&self.path, render(pre, post))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

fn metric_rows(pre: &Stats, post: &Stats) -> String {
    let rows: [(&str, String, String); 6] = [
        ("Reads", pre.reads.to_string(), post.reads.to_string()),
        ("Bases", pre.bases.to_string(), post.bases.to_string()),
        ("Unmapped reads", pre.unmapped_reads.to_string(), post.unmapped_reads.to_string()),
        (
            "Mean edit distance",
            format!("{:.4}", pre.mean_edit_distance()),
            format!("{:.4}", post.mean_edit_distance()),
        ),
        ("Molecules", pre.molecules.to_string(), post.molecules.to_string()),
        (
            "Paired molecules",
            pre.paired_molecules.to_string(),
            post.paired_molecules.to_string(),
        ),
    ];
    rows.iter()
        .map(|(name, before, after)| {
            format!("<tr><td>{}</td><td>{}</td><td>{}</td></tr>", name, before, after)
        })
        .join("\n")
}

fn depth_rows(pre: &Stats, post: &Stats) -> String {
    pre.targets
        .iter()
        .zip(post.targets.iter())
        .filter(|(before, _)| before.aligned_bases > 0)
        .map(|(before, after)| {
            format!(
                "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                before.name,
                before.mean_depth(),
                after.mean_depth()
            )
        })
        .join("\n")
}

fn render(pre: &Stats, post: &Stats) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>umicon report</title>\n\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:4px 12px;text-align:right}}\
         td:first-child,th:first-child{{text-align:left}}</style>\n</head>\n<body>\n\
         <h1>umicon report</h1>\n\
         <h2>Summary</h2>\n\
         <table>\n<tr><th>Metric</th><th>Before</th><th>After</th></tr>\n{}\n</table>\n\
         <h2>Mean depth per target</h2>\n\
         <table>\n<tr><th>Target</th><th>Before</th><th>After</th></tr>\n{}\n</table>\n\
         </body>\n</html>\n",
        metric_rows(pre, post),
        depth_rows(pre, post)
    )
}
