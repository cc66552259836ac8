//! Structs and logic to parse NEXUS tree files.
//!
//! This module provides the [NexusParserBuilder] and [NexusParser] structs.
//! Trees are parsed on demand, so that a sample can be traversed several
//! times (see [NexusParser::reset]) without holding it in memory.

use crate::model::{CompactTree, LabelResolver, LeafLabelMap};
use crate::newick::NewickParser;
use crate::nexus::defs::*;
use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_parser::{ByteParser, ConsumeMode::*};
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Key/label pairs of a TRANSLATE command in file order
type Translation = Vec<(String, String)>;

// =#========================================================================#=
// BURNIN
// =#========================================================================€=
/// Specifies how many initial trees to skip as burnin.
///
/// Burnin is commonly used in MCMC sampling to discard initial trees
/// before the chain has converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Burnin {
    /// Skip a fixed number of trees.
    ///
    /// # Example
    /// ```
    /// use treeannotator::nexus::Burnin;
    /// assert_eq!(Burnin::Count(1001).get_count(5000), 1001);
    /// ```
    Count(usize),

    /// Skip a fraction of total trees, in `[0.0, 1.0)`.
    ///
    /// # Example
    /// ```
    /// use treeannotator::nexus::Burnin;
    /// assert_eq!(Burnin::Percentage(0.25).get_count(10), 2);
    /// ```
    Percentage(f64),
}

impl Burnin {
    /// Calculates the absolute number of trees to skip given the total tree count.
    pub fn get_count(&self, num_total_trees: usize) -> usize {
        match self {
            Burnin::Count(n) => *n,
            Burnin::Percentage(p) => (num_total_trees as f64 * p).floor() as usize,
        }
    }
}

impl Default for Burnin {
    fn default() -> Self {
        Burnin::Count(0)
    }
}

// =#========================================================================#=
// BYTE SOURCE SETTING
// =#========================================================================€=
/// Controls how the file is read during parsing.
///
/// By default, the [NexusParserBuilder] uses [ReadStrategy::Automatic],
/// which picks a strategy based on file size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReadStrategy {
    /// Read the file in chunks through a buffered I/O reader.
    Buffered,

    /// Load the entire file into a contiguous byte buffer before parsing.
    InMemory,

    /// Stream files of 100 MB or more, read smaller ones into memory.
    #[default]
    Automatic,
}

impl ReadStrategy {
    /// Whether the file at `path` is to be streamed rather than read into
    /// memory. An unreadable size counts as small.
    pub fn is_buffered_for<P: AsRef<Path>>(&self, path: P) -> bool {
        match self {
            ReadStrategy::Buffered => true,
            ReadStrategy::InMemory => false,
            ReadStrategy::Automatic => {
                let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                file_size >= AUTO_IN_MEMORY_THRESHOLD
            }
        }
    }
}

// =#========================================================================#=
// NEXUS PARSER BUILDER
// =#========================================================================$=
/// Builder for configuring and creating a [NexusParser].
///
/// # Configuration Options
/// * [`with_burnin()`](Self::with_burnin) — Skip a fixed count or fraction of initial trees
/// * [`with_annotations()`](Self::with_annotations) — Parse `[&key=value,...]`
///   vertex annotations instead of treating them as comments
/// * [`with_buffered_source()`](Self::with_buffered_source) /
///   [`with_in_memory_source()`](Self::with_in_memory_source) — Override
///   the [ReadStrategy]
///
/// # Example
/// ```no_run
/// use treeannotator::nexus::{Burnin, NexusParserBuilder};
///
/// let mut parser = NexusParserBuilder::for_file("passeriformes.trees")
///     .with_burnin(Burnin::Percentage(0.1))
///     .with_annotations()
///     .build()?;
///
/// while let Some(tree) = parser.next_tree()? {
///     println!("Tree height: {}", tree.height());
/// }
/// # Ok::<(), treeannotator::parser::ParsingError>(())
/// ```
pub struct NexusParserBuilder {
    path: PathBuf,
    read_strategy: ReadStrategy,
    burnin: Burnin,
    parse_annotations: bool,
}

impl NexusParserBuilder {
    /// Creates a new builder for a file with default settings:
    /// no burnin, annotations skipped, automatic read strategy.
    pub fn for_file<P: AsRef<Path>>(path: P) -> Self {
        NexusParserBuilder {
            path: path.as_ref().to_path_buf(),
            read_strategy: ReadStrategy::Automatic,
            burnin: Burnin::default(),
            parse_annotations: false,
        }
    }

    /// Configure burnin, i.e., discard/skip initial trees.
    pub fn with_burnin(mut self, burnin: Burnin) -> Self {
        self.burnin = burnin;
        self
    }

    /// Configure the parser to parse vertex annotations
    /// (e.g. `[&rate=0.5,pop_size=1.2]`) instead of treating them as comments.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Configure the parser to read the file using a **buffered reader**,
    /// keeping memory usage low regardless of file size.
    pub fn with_buffered_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::Buffered;
        self
    }

    /// Configure the parser to read the **entire file into memory** upfront.
    pub fn with_in_memory_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::InMemory;
        self
    }

    /// Configure the read strategy directly.
    pub fn with_read_strategy(mut self, read_strategy: ReadStrategy) -> Self {
        self.read_strategy = read_strategy;
        self
    }

    /// Builds and initializes the [NexusParser].
    ///
    /// This method:
    /// 1. Parses the NEXUS header and the TAXA block (if there is one)
    /// 2. Parses the TRANSLATE command (if present) in the TREES block
    /// 3. Counts the trees and skips the burnin
    ///
    /// # Errors
    /// If the file cannot be read, is not a NEXUS file, has no TREES block,
    /// or its TAXA block or TRANSLATE command is malformed.
    pub fn build(self) -> Result<NexusParser, ParsingError> {
        let use_buffered = self.read_strategy.is_buffered_for(&self.path);

        let mut newick_parser = NewickParser::new();
        newick_parser.set_parse_annotations(self.parse_annotations);

        if use_buffered {
            let byte_parser = ByteParser::from_file_buffered(&self.path)?;
            let mut inner = NexusParserInner::new(newick_parser, byte_parser, self.burnin);
            inner.init()?;
            Ok(NexusParser::Buffered(inner))
        } else {
            let byte_parser = ByteParser::from_file_in_memory(&self.path)?;
            let mut inner = NexusParserInner::new(newick_parser, byte_parser, self.burnin);
            inner.init()?;
            Ok(NexusParser::InMemory(inner))
        }
    }
}

// =#========================================================================#=
// NEXUS PARSER
// =#========================================================================$=
/// Lazy parser for NEXUS phylogenetic tree files
/// (BEAST, MrBayes, RevBayes, etc.).
///
/// Created via [NexusParserBuilder]. Trees are parsed one at a time by
/// [`next_tree()`](Self::next_tree); [`reset()`](Self::reset) rewinds to
/// the first tree after the burnin for another pass.
#[allow(private_interfaces)]
pub enum NexusParser {
    /// NexusParser with buffered file read
    Buffered(NexusParserInner<BufferedByteSource>),
    /// Nexus Parser with in-memory file read
    InMemory(NexusParserInner<InMemoryByteSource>),
}

/// Helper macro to delegate a method call to the inner parser variant.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            NexusParser::Buffered(inner) => inner.$method($($arg),*),
            NexusParser::InMemory(inner) => inner.$method($($arg),*),
        }
    };
}

impl NexusParser {
    /// Reset to first tree after the burnin.
    pub fn reset(&mut self) {
        delegate!(self, reset)
    }

    /// Consumes this [NexusParser] and returns the [LeafLabelMap] of all taxa.
    pub fn into_label_storage(self) -> LeafLabelMap {
        delegate!(self, into_label_storage)
    }

    /// Consumes this [NexusParser], parses all remaining trees from the
    /// first one after the burnin and returns them with the [LeafLabelMap].
    pub fn into_results(self) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
        delegate!(self, into_results)
    }

    /// Get the number of leaves/taxa based on the TAXA block
    /// (or the TRANSLATE command if there is no TAXA block).
    pub fn num_leaves(&self) -> usize {
        delegate!(self, num_leaves)
    }

    /// Get ref to [LeafLabelMap] of all taxa.
    pub fn label_storage(&self) -> &LeafLabelMap {
        delegate!(self, label_storage)
    }

    /// Get the number of trees (without burnin trees).
    pub fn num_trees(&self) -> usize {
        delegate!(self, num_trees)
    }

    /// Get the total number of trees including burnin.
    pub fn num_total_trees(&self) -> usize {
        delegate!(self, num_total_trees)
    }

    /// Get the number of skipped burnin trees.
    pub fn num_burnin_trees(&self) -> usize {
        delegate!(self, num_burnin_trees)
    }

    /// Parses and returns the next tree, `Ok(None)` after the last one.
    pub fn next_tree(&mut self) -> Result<Option<CompactTree>, ParsingError> {
        delegate!(self, next_tree)
    }
}

// =#========================================================================#=
// NEXUS PARSER INNER
// =#========================================================================$=
/// Inner of [NexusParser] for type erasure pattern of generic byte source.
struct NexusParserInner<B: ByteSource> {
    /// Continuously used to parse Newick strings, including resolving labels
    newick_parser: NewickParser,
    /// Accessor to the underlying bytes/file being parsed
    byte_parser: ByteParser<B>,

    /// Amount of burnin to discard/skip
    burnin: Burnin,

    /// Number of leaves/taxa in the TAXA block and all trees (must be consistent)
    num_leaves: usize,
    /// The total number of `TREE` commands in the file
    num_total_trees: usize,
    /// The number of `TREE` commands after the burnin
    /// - Invariant: `num_trees <= num_total_trees`
    num_trees: usize,
    /// The first `TREE` command to consider (0-indexed)
    /// - Invariant: `num_trees + start_tree_pos = num_total_trees`
    start_tree_pos: usize,
    /// Position of the next `TREE` command returned by `next_tree()`
    tree_pos: usize,
    /// Byte position where the first tree after the burnin begins
    start_byte_pos: usize,
}

// ============================================================================
// Initialization & State (private)
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    fn new(newick_parser: NewickParser, byte_parser: ByteParser<B>, burnin: Burnin) -> Self {
        NexusParserInner {
            newick_parser,
            byte_parser,
            burnin,
            num_leaves: 0,
            num_total_trees: 0,
            num_trees: 0,
            start_tree_pos: 0,
            tree_pos: 0,
            start_byte_pos: 0,
        }
    }

    /// Parses the header, TAXA block and TRANSLATE command, counts the
    /// trees, and moves past the burnin to the first tree to return.
    fn init(&mut self) -> Result<(), ParsingError> {
        // > Header
        self.parse_nexus_header()?;

        // > TAXA block, which MrBayes omits in favour of TRANSLATE
        let label_storage = match self.skip_until_taxa_or_trees_block()? {
            NexusBlock::Taxa => {
                let storage = self.parse_taxa_block()?;
                self.skip_until_block(NexusBlock::Trees)?;
                Some(storage)
            }
            _ => None,
        };

        // > TREES block: TRANSLATE command picks the label resolver
        let translation = self.parse_tree_block_translate()?;
        let resolver = self.choose_resolver(label_storage, translation)?;
        self.newick_parser.set_resolver(resolver);
        if self.num_leaves > 0 {
            self.newick_parser.set_num_leaves(self.num_leaves);
        }

        self.byte_parser.skip_comment_and_whitespace()?;

        // Count trees, then skip the burnin
        let total_trees = self.count_trees()?;
        self.configure_tree_counts(total_trees);
        for _ in 0..self.start_tree_pos {
            self.skip_tree()?;
        }
        self.start_byte_pos = self.byte_parser.position();

        Ok(())
    }

    /// Sets `num_total_trees`, `num_trees`, `start_tree_pos` and `tree_pos`
    /// from the total tree count and the burnin.
    fn configure_tree_counts(&mut self, num_total_trees: usize) {
        self.num_total_trees = num_total_trees;
        let skip_count = self.burnin.get_count(num_total_trees).min(num_total_trees);
        self.num_trees = num_total_trees - skip_count;
        self.start_tree_pos = skip_count;
        self.tree_pos = skip_count;
    }

    /// Picks and configures the right [LabelResolver].
    ///
    /// Without a TAXA block, the taxa are taken from the TRANSLATE command
    /// in its order (or from the trees if there is none).
    fn choose_resolver(
        &mut self,
        label_storage: Option<LeafLabelMap>,
        translation: Option<Translation>,
    ) -> Result<LabelResolver, ParsingError> {
        let label_storage = match label_storage {
            Some(storage) => storage,
            None => {
                let num_labels = translation.as_ref().map_or(0, Vec::len);
                let mut storage = LeafLabelMap::with_capacity(num_labels);
                for (_, label) in translation.iter().flatten() {
                    storage.get_or_insert(label);
                }
                self.num_leaves = storage.num_labels();
                storage
            }
        };

        let Some(translation) = translation else {
            // Trees must use the TAXA labels verbatim
            return Ok(if label_storage.num_labels() > 0 {
                LabelResolver::new_verbatim_labels_resolver(label_storage).freeze()
            } else {
                LabelResolver::new_verbatim_labels_resolver(label_storage)
            });
        };

        if translation.len() != label_storage.num_labels() {
            return Err(ParsingError::invalid_translate_command(
                &mut self.byte_parser,
                format!(
                    "TRANSLATE has {} entries for {} taxa",
                    translation.len(),
                    label_storage.num_labels()
                ),
            ));
        }

        // Integer keys allow the more efficient NexusIntegerLabels resolver
        let all_keys_are_integers = translation.iter().all(|(key, _)| key.parse::<usize>().is_ok());
        let map: HashMap<String, String> = translation.into_iter().collect();
        let resolver = if all_keys_are_integers {
            LabelResolver::new_nexus_integer_labels_resolver(map, label_storage)
        } else {
            LabelResolver::new_nexus_labels_resolver(map, label_storage)
        };
        resolver.map_err(|e| ParsingError::invalid_translate_command(&mut self.byte_parser, e.0))
    }

    /// Reset to first tree after the burnin.
    fn reset(&mut self) {
        self.tree_pos = self.start_tree_pos;
        self.byte_parser.set_position(self.start_byte_pos);
    }
}

// ============================================================================
// De/Construction & Access
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    fn into_label_storage(self) -> LeafLabelMap {
        self.newick_parser.into_label_storage()
    }

    fn into_results(mut self) -> Result<(Vec<CompactTree>, LeafLabelMap), ParsingError> {
        let mut trees = Vec::with_capacity(self.num_trees);
        self.reset();
        while let Some(tree) = self.next_tree()? {
            trees.push(tree);
        }
        Ok((trees, self.newick_parser.into_label_storage()))
    }

    fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    fn label_storage(&self) -> &LeafLabelMap {
        self.newick_parser.label_storage()
    }

    fn num_trees(&self) -> usize {
        self.num_trees
    }

    fn num_total_trees(&self) -> usize {
        self.num_total_trees
    }

    fn num_burnin_trees(&self) -> usize {
        self.start_tree_pos
    }

    fn next_tree(&mut self) -> Result<Option<CompactTree>, ParsingError> {
        if self.tree_pos >= self.start_tree_pos + self.num_trees {
            return Ok(None);
        }

        let tree = self.parse_single_tree()?;
        if tree.is_none() {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }
        self.tree_pos += 1;
        Ok(tree)
    }
}

// ============================================================================
// Parsing helpers (private)
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    /// Parses header `#NEXUS` at start of file.
    fn parse_nexus_header(&mut self) -> Result<(), ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if !self.byte_parser.consume_if_sequence(NEXUS_HEADER) {
            return Err(ParsingError::missing_nexus_header(&mut self.byte_parser));
        }

        Ok(())
    }

    /// Skips blocks until a TAXA or TREES block, whose header is consumed.
    fn skip_until_taxa_or_trees_block(&mut self) -> Result<NexusBlock, ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() {
                return Err(ParsingError::invalid_trees_block(
                    &mut self.byte_parser,
                    String::from("No TREES block found."),
                ));
            }

            let block_type = self.detect_next_block()?;
            if block_type != NexusBlock::Other {
                return Ok(block_type);
            }

            self.skip_to_block_end()?;
        }
    }

    /// Skips NEXUS blocks until the target block type, whose header is consumed.
    fn skip_until_block(&mut self, target: NexusBlock) -> Result<(), ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            if self.detect_next_block()? == target {
                return Ok(());
            }

            self.skip_to_block_end()?;
        }
    }

    /// Detects the next block, which must start with header
    /// `BEGIN <BlockType>;` (case-insensitive), consumes its header,
    /// and returns its type.
    fn detect_next_block(&mut self) -> Result<NexusBlock, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if !self.byte_parser.consume_if_sequence(BLOCK_BEGIN) {
            return Err(ParsingError::invalid_formatting(&mut self.byte_parser));
        }
        self.byte_parser.skip_comment_and_whitespace()?;

        let block_name = self.byte_parser.parse_unquoted_label(b";")?;
        if !self.byte_parser.consume_if(b';') {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(NexusBlock::from_name(block_name.trim()))
    }

    /// Skips block, e.g. continuing until encountering and consuming `END;`.
    fn skip_to_block_end(&mut self) -> Result<(), ParsingError> {
        if !self
            .byte_parser
            .consume_until_sequence(BLOCK_END, Inclusive)
        {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(())
    }

    /// Parses TAXA block extracting number of taxa from `ntax` command
    /// and taxon list from `TAXLABELS` command.
    ///
    /// # Assumptions
    /// * First command must be `DIMENSIONS NTAX=<value>;` (case-insensitive)
    /// * Followed by a whitespace separated, semicolon terminated
    ///   `TAXLABELS label1 label2 ...;` command
    /// * Comments allowed outside and in between labels
    fn parse_taxa_block(&mut self) -> Result<LeafLabelMap, ParsingError> {
        self.parse_taxa_block_ntax()?;
        let label_storage = self.parse_taxa_block_labels()?;
        self.skip_to_block_end()?;
        Ok(label_storage)
    }

    /// Parses the `DIMENSIONS NTAX=n;` command into `num_leaves`.
    fn parse_taxa_block_ntax(&mut self) -> Result<(), ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(DIMENSIONS) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'DIMENSIONS' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if_sequence(NTAX) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'NTAX' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected '=' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        let ntax_str = self.byte_parser.parse_unquoted_label(b";")?;
        let ntax: usize = ntax_str.trim().parse().map_err(|_| {
            ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!("Cannot parse `ntax` value: {ntax_str}"),
            )
        })?;
        self.byte_parser.next_byte(); // ';'

        self.num_leaves = ntax;
        Ok(())
    }

    /// Parses the `TAXLABELS` command into a fresh [LeafLabelMap].
    fn parse_taxa_block_labels(&mut self) -> Result<LeafLabelMap, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(TAXLABELS) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'TAXLABELS' in TAXA block."),
            ));
        }

        let mut label_storage = LeafLabelMap::with_capacity(self.num_leaves);
        let mut count = 0;
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;

            if self.byte_parser.consume_if(b';') {
                break;
            }
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if label.is_empty() {
                return Err(ParsingError::invalid_taxa_block(
                    &mut self.byte_parser,
                    String::from("Unexpected character in TAXLABELS."),
                ));
            }
            label_storage.get_or_insert(&label);
            count += 1;
        }

        if count != self.num_leaves {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!(
                    "Number of parsed labels ({}) did not match ntax value ({}).",
                    count, self.num_leaves
                ),
            ));
        }

        Ok(label_storage)
    }

    /// Parses the optional `TRANSLATE key label, ...;` command at the start
    /// of the TREES block.
    fn parse_tree_block_translate(&mut self) -> Result<Option<Translation>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(TRANSLATE) {
            // No TRANSLATE command is fine if the next command is a TREE
            return if self.byte_parser.peek_is_sequence(TREE) {
                Ok(None)
            } else {
                Err(ParsingError::invalid_trees_block(
                    &mut self.byte_parser,
                    String::from("Expected 'TRANSLATE' or first 'TREE' in TREES block."),
                ))
            };
        }

        let mut translation = Translation::with_capacity(self.num_leaves);
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            let key = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;

            self.byte_parser.skip_comment_and_whitespace()?;
            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if key.is_empty() || label.is_empty() {
                return Err(ParsingError::invalid_trees_block(
                    &mut self.byte_parser,
                    String::from("Expected 'key label' pair in TRANSLATE."),
                ));
            }
            if translation.iter().any(|(k, _)| *k == key) {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    format!("Duplicate TRANSLATE key '{key}'"),
                ));
            }
            translation.push((key, label));

            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b',') {
                continue;
            }
            if self.byte_parser.consume_if(b';') {
                break;
            }
            let found = match self.byte_parser.peek() {
                Some(byte) => format!("'{}'", byte as char),
                None => String::from("end of file"),
            };
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                format!("Unexpected {found} in TRANSLATE."),
            ));
        }

        Ok(Some(translation))
    }

    /// Parses the `TREE <name> [comments] =` head of a tree command.
    ///
    /// # Returns
    /// * `Ok(Some(name))` - Header consumed
    /// * `Ok(None)` - No more trees (`END;` or EOF)
    fn parse_tree_command_head(&mut self) -> Result<Option<String>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if self.byte_parser.is_eof() || self.byte_parser.peek_is_sequence(BLOCK_END) {
            return Ok(None);
        }

        if !self.byte_parser.consume_if_sequence(TREE) {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected 'TREE' in tree command."),
            ));
        }

        self.byte_parser.skip_whitespace();
        let name = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;

        // Tree-level comments such as `[&lnP=-1234.5]` may precede '='
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected '=' after tree name in tree command."),
            ));
        }

        // Skip optional "[&R]"/"[&U]" by treating it as a comment
        self.byte_parser.skip_comment_and_whitespace()?;
        Ok(Some(name))
    }

    /// Parses a single TREE command.
    fn parse_single_tree(&mut self) -> Result<Option<CompactTree>, ParsingError> {
        let Some(name) = self.parse_tree_command_head()? else {
            return Ok(None);
        };

        let tree = self
            .newick_parser
            .parse_str_and_name(&mut self.byte_parser, Some(name))?;
        Ok(Some(tree))
    }

    /// Skips over a single TREE command without parsing the Newick string.
    ///
    /// # Returns
    /// * `Ok(true)` - Successfully skipped a tree
    /// * `Ok(false)` - No more trees (`END;` or EOF)
    fn skip_tree(&mut self) -> Result<bool, ParsingError> {
        if self.parse_tree_command_head()?.is_none() {
            return Ok(false);
        }

        if !self.byte_parser.skip_past_tree_end()? {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(true)
    }

    /// Counts the trees in the TREES block without parsing them,
    /// restoring the parser position afterwards.
    fn count_trees(&mut self) -> Result<usize, ParsingError> {
        let saved_pos = self.byte_parser.position();

        let mut count = 0;
        while self.skip_tree()? {
            count += 1;
        }

        self.byte_parser.set_position(saved_pos);

        Ok(count)
    }
}
