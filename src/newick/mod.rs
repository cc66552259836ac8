//! Newick format parser and writer for phylogenetic trees.
//!
//! This module provides [`NewickParser`] to parse Newick format strings
//! into tree structures. The parser builds trees with a
//! [`CompactTreeBuilder`](crate::model::CompactTreeBuilder) and resolves
//! labels on the way. It may be used directly to parse Newick strings or
//! when parsing a Nexus file.
//!
//! # Quick API
//! * [`parse_file`] - parses a file, returns [`CompactTree`]s + [`LeafLabelMap`]
//! * [`parse_str`] - parses a single string
//! * [`count_trees`] - counts trees without building them
//!
//! # Format
//! The Newick format has the following simple grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex ',' vertex ')' [annotation] [branch_length] [annotation]`
//! * `leaf ::= label [annotation] [branch_length] [annotation]`
//! * `branch_length ::= ':' number`
//! * `annotation ::= '[&' key '=' value (',' key '=' value)* ']'`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch_length
//! * Comments are square brackets and can occur anywhere where newlines are allowed
//! * Annotation values are numbers, booleans, `"..."` or `'...'` strings,
//!   bare strings, or `{...}` lists thereof, e.g.
//!   `A[&rate=0.12,state="Otago",location={-45.9,170.5}]:2.1`

mod defs;
mod parser;
pub mod writer;

pub use self::parser::NewickParser;
pub use self::writer::{NewickStyle, to_annotated_newick, to_newick};
pub(crate) use self::parser::parse_annotation_block;

use crate::model::{CompactTree, LeafLabelMap};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a Newick file eagerly and returns all trees (as [`CompactTree`],
/// with annotations) together with their shared [label mapping](LeafLabelMap).
///
/// # Format
/// Expects standard Newick format with trees separated by semicolons.
/// Multiple trees can appear on the same line or across multiple lines,
/// and `[...]` comments and whitespace are fine.
pub fn parse_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
    let byte_parser = ByteParser::from_file_in_memory(path)?;
    let mut newick_parser = NewickParser::new().with_annotations();
    let trees = newick_parser.parse_all(byte_parser)?;
    let label_map = newick_parser.into_label_storage();
    Ok((trees, label_map))
}

/// Parses a single Newick string (with annotations) to obtain a
/// [`CompactTree`] and its labels.
///
/// # Example
/// ```
/// use treeannotator::newick::parse_str;
///
/// let (tree, labels) = parse_str("(Fratercula_cirrhata,(Fratercula_arctica,Fratercula_corniculata));")?;
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(labels.get_index("Fratercula_arctica"), Some(1));
/// # Ok::<(), treeannotator::parser::ParsingError>(())
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<(CompactTree, LeafLabelMap), ParsingError> {
    let mut newick_parser = NewickParser::new().with_annotations();
    let mut byte_parser = ByteParser::for_str(newick.as_ref());
    let tree = newick_parser.parse_str(&mut byte_parser)?;
    Ok((tree, newick_parser.into_label_storage()))
}

/// Counts the Newick trees from the current position to EOF without
/// building them; afterwards the byte parser is at EOF.
///
/// # Errors
/// If the input ends inside a tree (no terminating `;`) or inside a comment
/// or quoted label.
pub fn count_trees<B: ByteSource>(byte_parser: &mut ByteParser<B>) -> Result<usize, ParsingError> {
    let mut count = 0;
    loop {
        byte_parser.skip_comment_and_whitespace()?;
        if byte_parser.is_eof() {
            return Ok(count);
        }
        if !byte_parser.skip_past_tree_end()? {
            return Err(ParsingError::unexpected_eof(byte_parser));
        }
        count += 1;
    }
}

/// Skips `num_trees` Newick trees, e.g. the burn-in.
///
/// # Returns
/// The number of trees actually skipped, smaller than `num_trees` at EOF
pub fn skip_trees<B: ByteSource>(
    byte_parser: &mut ByteParser<B>,
    num_trees: usize,
) -> Result<usize, ParsingError> {
    for skipped in 0..num_trees {
        byte_parser.skip_comment_and_whitespace()?;
        if byte_parser.is_eof() || !byte_parser.skip_past_tree_end()? {
            return Ok(skipped);
        }
    }
    Ok(num_trees)
}
