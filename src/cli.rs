//! Command line interface of the `treeannotator` binary.

use crate::clade::ScoringCriterion;
use crate::error::{AnnotatorError, Result};
use crate::nexus::{Burnin, ReadStrategy};
use crate::pipeline::{AnnotatorConfig, HeightsSummary, TargetOption};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Summarizes a posterior sample of phylogenetic trees onto a single
/// target tree, annotated with clade posteriors, node height summaries
/// and HPD intervals of all sampled attributes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tree sample (NEXUS or Newick)
    pub input: PathBuf,

    /// Output NEXUS file (stdout if omitted)
    pub output: Option<PathBuf>,

    /// Number of initial trees to discard
    #[arg(short = 'b', long, value_name = "TREES", conflicts_with = "burnin_percentage")]
    pub burnin: Option<usize>,

    /// Fraction of initial trees to discard, in [0, 1)
    #[arg(long, value_name = "FRACTION")]
    pub burnin_percentage: Option<f64>,

    /// Node heights: keep, mean, median or ca (common ancestor)
    #[arg(long, default_value = "median")]
    pub heights: HeightsSummary,

    /// Minimum posterior of a clade to annotate it with statistics
    #[arg(long, value_name = "POSTERIOR", default_value_t = 0.0)]
    pub limit: f64,

    /// Use the first tree of this file as target instead of selecting one
    #[arg(long, value_name = "FILE")]
    pub target: Option<PathBuf>,

    /// Target tree criterion: mcc (max clade credibility) or msc (max sum
    /// of clade credibilities)
    #[arg(long, default_value = "mcc")]
    pub criterion: ScoringCriterion,

    /// Probability mass of HPD intervals
    #[arg(long, value_name = "MASS", default_value_t = 0.95)]
    pub hpd: f64,

    /// Probability mass of 2D HPD regions
    #[arg(long = "hpd2d", value_name = "MASS", default_value_t = 0.80)]
    pub hpd_2d: f64,

    /// Stream the input instead of reading it into memory
    #[arg(long)]
    pub low_memory: bool,

    /// No progress bars, only warnings in the log
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log level for `-q` and the `-v` count, used when `RUST_LOG`
    /// is unset.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl TryFrom<Cli> for AnnotatorConfig {
    type Error = AnnotatorError;

    fn try_from(cli: Cli) -> Result<Self> {
        let burnin = match (cli.burnin, cli.burnin_percentage) {
            (_, Some(fraction)) => Burnin::Percentage(fraction),
            (Some(count), None) => Burnin::Count(count),
            (None, None) => Burnin::default(),
        };
        let target = match cli.target {
            Some(path) => TargetOption::UserTree(path),
            None => TargetOption::Select(cli.criterion),
        };
        let read_strategy = if cli.low_memory {
            ReadStrategy::Buffered
        } else {
            ReadStrategy::Automatic
        };

        let mut config = AnnotatorConfig::new(cli.input)
            .with_burnin(burnin)
            .with_heights(cli.heights)
            .with_posterior_limit(cli.limit)
            .with_target(target)
            .with_hpd_mass(cli.hpd)
            .with_hpd_2d_mass(cli.hpd_2d)
            .with_read_strategy(read_strategy)
            .with_progress(!cli.quiet);
        if let Some(output) = cli.output {
            config = config.with_output(output);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Installs the global `tracing` subscriber writing to stderr, filtered by
/// `RUST_LOG` or else by `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
