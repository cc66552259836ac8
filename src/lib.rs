//! TreeAnnotator summarizes a posterior sample of phylogenetic trees, as
//! produced by Bayesian MCMC programs, onto a single target tree.
//!
//! Core functionality provided:
//! - Reading: Tree samples from NEXUS files (TAXA and TREES blocks, with
//!   TRANSLATE tables) or plain Newick files, including per-vertex
//!   `[&key=value,...]` annotations. Trees are streamed one at a time,
//!   either from memory or buffered from disk.
//! - Clades: Each vertex is identified by the set of taxa below it,
//!   stored as [BitsetClade](clade::BitsetClade) and counted in a
//!   [CladeRegistry](clade::CladeRegistry).
//! - Target tree: Either the sampled tree maximizing clade credibility
//!   ([ScoringCriterion](clade::ScoringCriterion)) or a user-supplied tree.
//! - Summaries: For each clade of the target tree, its posterior, node
//!   height summary (mean, median, HPD interval, range) and the same
//!   statistics for every numeric annotation, modes of discrete ones and
//!   2D HPD contours for bivariate ones (see [summary]).
//! - Writing: The annotated target tree as NEXUS file.
//!
//! Limitations:
//! - Only leaf-labels considered
//! - Every internal vertex needs at least two children
//!
//! # Usage
//! The binary wraps [TreeAnnotator](pipeline::TreeAnnotator), which can
//! also be driven directly:
//! ```no_run
//! use treeannotator::nexus::Burnin;
//! use treeannotator::pipeline::{AnnotatorConfig, HeightsSummary, TreeAnnotator};
//!
//! let config = AnnotatorConfig::new("mcmc_samples.trees")
//!     .with_output("mcc.tree")
//!     .with_burnin(Burnin::Percentage(0.1))
//!     .with_heights(HeightsSummary::Median);
//! let annotated = TreeAnnotator::new(config)?.run()?;
//! println!("Target tree scored {:?}", annotated.target_score);
//! # Ok::<(), treeannotator::error::AnnotatorError>(())
//! ```
//!
//! The parsers are usable on their own:
//! ```no_run
//! use treeannotator::parse_nexus_file;
//!
//! let (trees, labels) = parse_nexus_file("phylo.trees").unwrap();
//! println!("Loaded {} trees with {} taxa", trees.len(), labels.num_labels());
//! ```

pub mod clade;
pub mod cli;
pub mod error;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod summary;

use crate::model::CompactTree;
use crate::model::leaf_label_map::LeafLabelMap;
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// ============================================================================
// Quick parsing API
// ============================================================================
/// Parses all trees of a NEXUS file with annotations, returning them
/// together with their shared [LeafLabelMap].
///
/// See [`nexus::parse_file`] for full documentation.
pub fn parse_nexus_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
    nexus::parse_file(path)
}

/// Parses a file of semicolon-separated Newick strings, returning the
/// trees together with their shared [LeafLabelMap].
///
/// See [`newick::parse_file`] for full documentation.
pub fn parse_newick_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
    newick::parse_file(path)
}
