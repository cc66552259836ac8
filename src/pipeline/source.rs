//! Rewindable stream of the trees of a sample file.
//!
//! A [TreeSource] hides whether the sample is a NEXUS file or a file of
//! Newick strings. It skips the burn-in, fixes the taxon set before the
//! first tree is handed out, and can be [reset](TreeSource::reset) for
//! another pass over the same trees.

use crate::error::{AnnotatorError, Result};
use crate::model::{CompactTree, LabelIndex, LeafLabelMap};
use crate::newick::{self, NewickParser};
use crate::nexus::{Burnin, NexusParser, NexusParserBuilder, ReadStrategy};
use crate::parser::{BufferedByteSource, ByteParser, ByteSource, InMemoryByteSource};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File format of a tree sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    Nexus,
    Newick,
}

impl TreeFormat {
    /// Detects the format from the first non-blank line: `#NEXUS` (in any
    /// case) means NEXUS, anything else Newick.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<TreeFormat> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let is_nexus = line
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("#NEXUS"));
            return Ok(if is_nexus { TreeFormat::Nexus } else { TreeFormat::Newick });
        }
        Err(AnnotatorError::EmptyTreeStream {
            path: path.as_ref().to_path_buf(),
        })
    }
}

// =#========================================================================#=
// TREE SOURCE
// =#========================================================================$=
/// Post-burn-in trees of a sample file, parsed with annotations.
///
/// # Example
/// ```no_run
/// use treeannotator::nexus::{Burnin, ReadStrategy};
/// use treeannotator::pipeline::TreeSource;
///
/// let burnin = Burnin::Percentage(0.1);
/// let mut source = TreeSource::open("kiwi.trees", burnin, ReadStrategy::Automatic)?;
/// println!("{} taxa, {} trees", source.labels().num_labels(), source.num_trees());
/// while let Some(tree) = source.next_tree()? {
///     println!("{}", tree.height());
/// }
/// source.reset();
/// # Ok::<(), treeannotator::error::AnnotatorError>(())
/// ```
pub enum TreeSource {
    Nexus(NexusParser),
    NewickBuffered(NewickStream<BufferedByteSource>),
    NewickInMemory(NewickStream<InMemoryByteSource>),
}

impl TreeSource {
    /// Opens the sample at `path`, detecting its [TreeFormat].
    ///
    /// # Errors
    /// * [AnnotatorError::EmptyTreeStream] if the file holds no tree
    /// * [AnnotatorError::NoTreesAfterBurnin] if the burn-in covers all trees
    /// * I/O and parsing errors of the header and the first tree
    pub fn open<P: AsRef<Path>>(
        path: P,
        burnin: Burnin,
        read_strategy: ReadStrategy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let format = TreeFormat::detect(path)?;
        debug!(path = %path.display(), ?format, "Opening tree sample");

        let mut source = match format {
            TreeFormat::Nexus => {
                let parser = NexusParserBuilder::for_file(path)
                    .with_burnin(burnin)
                    .with_read_strategy(read_strategy)
                    .with_annotations()
                    .build()?;
                TreeSource::Nexus(parser)
            }
            TreeFormat::Newick if read_strategy.is_buffered_for(path) => {
                let parser = ByteParser::from_file_buffered(path)?;
                TreeSource::NewickBuffered(NewickStream::new(parser, burnin)?)
            }
            TreeFormat::Newick => {
                let parser = ByteParser::from_file_in_memory(path)?;
                TreeSource::NewickInMemory(NewickStream::new(parser, burnin)?)
            }
        };
        source.check_counts(path, burnin)?;
        source.fix_taxa()?;
        Ok(source)
    }

    /// Next tree, `Ok(None)` after the last one.
    pub fn next_tree(&mut self) -> Result<Option<CompactTree>> {
        let tree = match self {
            TreeSource::Nexus(parser) => parser.next_tree()?,
            TreeSource::NewickBuffered(stream) => stream.next_tree()?,
            TreeSource::NewickInMemory(stream) => stream.next_tree()?,
        };
        Ok(tree)
    }

    /// Rewinds to the first tree after the burn-in.
    pub fn reset(&mut self) {
        match self {
            TreeSource::Nexus(parser) => parser.reset(),
            TreeSource::NewickBuffered(stream) => stream.reset(),
            TreeSource::NewickInMemory(stream) => stream.reset(),
        }
    }

    /// Taxa of the sample.
    pub fn labels(&self) -> &LeafLabelMap {
        match self {
            TreeSource::Nexus(parser) => parser.label_storage(),
            TreeSource::NewickBuffered(stream) => stream.parser.label_storage(),
            TreeSource::NewickInMemory(stream) => stream.parser.label_storage(),
        }
    }

    /// Number of trees after the burn-in.
    pub fn num_trees(&self) -> usize {
        let (total, burnin) = self.counts();
        total - burnin
    }

    pub fn num_total_trees(&self) -> usize {
        self.counts().0
    }

    pub fn num_burnin_trees(&self) -> usize {
        self.counts().1
    }

    fn counts(&self) -> (usize, usize) {
        match self {
            TreeSource::Nexus(parser) => (parser.num_total_trees(), parser.num_burnin_trees()),
            TreeSource::NewickBuffered(stream) => (stream.num_total_trees, stream.num_burnin_trees),
            TreeSource::NewickInMemory(stream) => (stream.num_total_trees, stream.num_burnin_trees),
        }
    }

    fn check_counts(&self, path: &Path, burnin: Burnin) -> Result<()> {
        let total = self.num_total_trees();
        if total == 0 {
            return Err(AnnotatorError::EmptyTreeStream {
                path: PathBuf::from(path),
            });
        }
        if self.num_trees() == 0 {
            return Err(AnnotatorError::NoTreesAfterBurnin {
                burnin: burnin.get_count(total),
                total,
            });
        }
        Ok(())
    }

    /// Makes sure the taxon set is known before the first pass: if neither
    /// a TAXA block nor a TRANSLATE command listed the taxa, they are taken
    /// from the first tree.
    fn fix_taxa(&mut self) -> Result<()> {
        if self.labels().is_empty() {
            self.next_tree()?;
            self.reset();
        }
        Ok(())
    }
}

// =#========================================================================#=
// NEWICK STREAM
// =#========================================================================$=
/// Newick trees, one after another, with the labels of the first tree after
/// the burn-in fixed as taxon set.
pub struct NewickStream<B: ByteSource> {
    parser: NewickParser,
    byte_parser: ByteParser<B>,
    num_total_trees: usize,
    num_burnin_trees: usize,
    start_byte_pos: usize,
    started: bool,
}

impl<B: ByteSource> NewickStream<B> {
    fn new(mut byte_parser: ByteParser<B>, burnin: Burnin) -> Result<Self> {
        let num_total_trees = newick::count_trees(&mut byte_parser)?;
        byte_parser.rewind();
        let num_burnin_trees = burnin.get_count(num_total_trees).min(num_total_trees);
        newick::skip_trees(&mut byte_parser, num_burnin_trees)?;
        let start_byte_pos = byte_parser.position();

        Ok(NewickStream {
            parser: NewickParser::new().with_annotations(),
            byte_parser,
            num_total_trees,
            num_burnin_trees,
            start_byte_pos,
            started: false,
        })
    }

    fn next_tree(&mut self) -> Result<Option<CompactTree>> {
        let tree = self.parser.parse_next(&mut self.byte_parser)?;
        if !self.started && tree.is_some() {
            // Labels of the first tree are the taxon set from now on
            self.started = true;
            let parser = std::mem::take(&mut self.parser);
            self.parser = parser.with_frozen_labels();
        }
        Ok(tree)
    }

    fn reset(&mut self) {
        self.byte_parser.set_position(self.start_byte_pos);
    }
}

// =#========================================================================#=
// TARGET TREE
// =#========================================================================€=
/// Reads the first tree of the file at `path` (NEXUS or Newick) and moves
/// its leaves onto the taxa `labels` of the sample.
///
/// # Errors
/// * [AnnotatorError::UnknownTaxon] for a leaf label not in `labels`
/// * [AnnotatorError::TaxonMismatch] if the tree lacks some taxon
pub fn load_target_tree<P: AsRef<Path>>(path: P, labels: &LeafLabelMap) -> Result<CompactTree> {
    let mut source = TreeSource::open(&path, Burnin::default(), ReadStrategy::Automatic)?;
    let tree = source.next_tree()?.ok_or_else(|| AnnotatorError::EmptyTreeStream {
        path: path.as_ref().to_path_buf(),
    })?;
    let own_labels = source.labels();

    let tree = tree.try_map_labels(|index: LabelIndex| {
        let label = own_labels
            .get_label(index)
            .ok_or_else(|| AnnotatorError::UnknownTaxon(format!("#{index}")))?;
        labels
            .get_index(label)
            .ok_or_else(|| AnnotatorError::UnknownTaxon(label.to_string()))
    })?;

    if tree.num_leaves() != labels.num_labels() {
        return Err(AnnotatorError::TaxonMismatch(format!(
            "target tree has {} leaves, the sample has {} taxa",
            tree.num_leaves(),
            labels.num_labels()
        )));
    }
    Ok(tree)
}
