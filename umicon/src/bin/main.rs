use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use umicon::engine;
use umicon::options::{ConsensusParams, Options, UmiSource};
use umicon::report::{HtmlReporter, JsonReporter, Reporter};

/// Collapse UMI-tagged duplicate reads in a coordinate-sorted BAM/SAM file
/// into consensus reads.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// coordinate-sorted input BAM/SAM file
    #[arg(short, long)]
    input: PathBuf,

    /// output file, BAM unless the path ends in .sam
    #[arg(short, long)]
    output: PathBuf,

    /// auxiliary tag carrying the UMI (default: last query-name field)
    #[arg(long)]
    umi_tag: Option<String>,

    /// query-name field delimiter in front of the UMI
    #[arg(long, default_value_t = ':')]
    umi_delimiter: char,

    /// Hamming radius when grouping same-contig clusters
    #[arg(long, default_value_t = 1)]
    proper_umi_diff: u32,

    /// Hamming radius when grouping cross-contig/unmapped clusters
    #[arg(long, default_value_t = 0)]
    improper_umi_diff: u32,

    /// ceiling for consensus base qualities (Phred)
    #[arg(long, default_value_t = 40)]
    quality_cap: u8,

    /// penalty applied to the winning quality when a high-quality vote dissents
    #[arg(long, default_value_t = 10)]
    dissent_penalty: u8,

    /// Phred score a dissenting vote needs to trigger the penalty
    #[arg(long, default_value_t = 30)]
    high_quality: u8,

    /// append :cs:<n> group sizes to consensus read names
    #[arg(long)]
    label_group_size: bool,

    /// stop at the first record with tid >= N (0 disables)
    #[arg(long, default_value_t = 0)]
    max_contig: i32,

    /// log contig transitions
    #[arg(long)]
    debug: bool,

    /// write a JSON report here
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// write an HTML report here
    #[arg(long)]
    html_report: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> Options {
        let umi = match self.umi_tag {
            Some(tag) => UmiSource::Tag(tag),
            None => UmiSource::QnameSuffix(self.umi_delimiter),
        };
        Options {
            input: self.input,
            output: self.output,
            umi,
            proper_umi_diff_threshold: self.proper_umi_diff,
            improper_umi_diff_threshold: self.improper_umi_diff,
            consensus: ConsensusParams {
                quality_cap: self.quality_cap,
                dissent_penalty: self.dissent_penalty,
                high_quality: self.high_quality,
                label_group_size: self.label_group_size,
            },
            max_contig: self.max_contig,
            debug: self.debug,
            json_report: self.json_report,
            html_report: self.html_report,
        }
    }
}

fn run() -> Result<()> {
    let options = Cli::parse().into_options();
    let (pre, post) = engine::consensus(&options)?;

    pre.log_summary("before collapsing");
    post.log_summary("after collapsing");

    if let Some(path) = &options.json_report {
        JsonReporter::new(path).report(&pre, &post)?;
    }
    if let Some(path) = &options.html_report {
        HtmlReporter::new(path).report(&pre, &post)?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(error) = run() {
        eprintln!("ERROR: {:#}", error);
        process::exit(-1);
    }
}
