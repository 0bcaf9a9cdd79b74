mod html;
mod json;

pub use html::HtmlReporter;
pub use json::JsonReporter;

use anyhow::Result;

use crate::stats::Stats;

/// Renders a pre/post statistics snapshot into some artifact.
pub trait Reporter {
    fn report(&self, pre: &Stats, post: &Stats) -> Result<()>;
}
