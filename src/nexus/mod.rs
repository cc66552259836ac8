//! NEXUS format parser and writer for phylogenetic trees.
//!
//! This module provides:
//! - [NexusParserBuilder] / [NexusParser] — for reading NEXUS tree files lazily
//! - [NexusWriter] — for writing NEXUS files
//!
//! # Quick API
//! - [`parse_file`] — parses a file, returns [`CompactTree`]s + [`LeafLabelMap`]
//!
//! # Format
//! A NEXUS tree file typically contains:
//! - A TAXA block defining the taxon labels
//! - A TREES block containing the trees
//! - An optional TRANSLATE command mapping short keys to full taxon labels
//!
//! ## Assumptions
//! * A `TREES` block is present, preceded by a `TAXA` block if there is one.
//!   Without TAXA block the taxa come from TRANSLATE (or the first tree).
//!   Other blocks are skipped.
//! * A `TRANSLATE` command, if present, precedes any `TREE` command:
//!   - Comma separated list of pairs `TRANSLATE [<key> <label>, ...];`
//!   - Keys are used consistently, either all integers or all shorts
//!   - Every `<label>` is a label of the TAXA block, one key per taxon
//!   - Labels with spaces or punctuation are single quoted, with inner
//!     apostrophes doubled, e.g. `'Wilson''s storm-petrel'`
//! * One tree command has format `tree <name> [comments] = [&R] <Newick string>;`,
//!   as written by BEAST: `tree STATE_0 [&lnP=-1234.5] = [&R] (...);`
//! * A missing `END;` after the last tree (e.g. an unfinished MCMC run)
//!   is tolerated.

mod defs;
mod parser;
mod writer;

pub use self::parser::{Burnin, NexusParser, NexusParserBuilder, ReadStrategy};
pub use self::writer::NexusWriter;

use crate::model::{CompactTree, LeafLabelMap};
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (public)
// ============================================================================
/// Parses a NEXUS file and returns all trees (as [`CompactTree`], with
/// annotations) together with their [label mapping](LeafLabelMap).
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn parse_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
    NexusParserBuilder::for_file(path)
        .with_annotations()
        .build()?
        .into_results()
}
