//! NEXUS format writer for [`CompactTree`]s sharing a [`LeafLabelMap`].

use crate::model::{CompactTree, LeafLabelMap};
use crate::newick::writer::{to_annotated_newick, NewickStyle};
use crate::nexus::defs::{
    BLOCK_BEGIN, BLOCK_END, DIMENSIONS, NEXUS_HEADER, NTAX, TAXA, TAXLABELS, TRANSLATE, TREE, TREES,
};
use crate::parser::utils::escape_label;
use std::io;
use std::io::{BufWriter, Write};

// =#========================================================================#=
// NEXUS WRITER
// =#========================================================================#=
/// Buffered writer for phylogenetic trees ([`CompactTree`] + [`LeafLabelMap`])
/// in NEXUS format.
///
/// # Format Structure
/// - `#NEXUS` header
/// - `TAXA` block with dimensions and tax labels
/// - `TREES` block with TRANSLATE command (1-based integer keys)
///   and tree definitions
///
/// # Example
/// ```
/// use treeannotator::model::{CompactTree, LeafLabelMap};
/// use treeannotator::nexus::NexusWriter;
///
/// let mut labels = LeafLabelMap::with_capacity(2);
/// let mut tree = CompactTree::new(2);
/// let a = tree.add_leaf(None, labels.get_or_insert("Apteryx"));
/// let b = tree.add_leaf(None, labels.get_or_insert("Dinornis"));
/// let root = tree.add_root_without_branch(vec![a, b]);
/// tree.annotations_mut().add("posterior", root, 1.0.into());
///
/// let mut writer = NexusWriter::new(Vec::new());
/// writer.write_annotated_nexus(&[tree], &labels)?;
/// let text = String::from_utf8(writer.into_inner()?).unwrap();
/// assert!(text.contains("tree TREE1 = [&R] (1,2)[&posterior=1];"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct NexusWriter<W: Write> {
    bw: BufWriter<W>,
}

// ============================================================================
// API (public)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Creates a new NEXUS writer wrapping the given sink.
    pub fn new(inner: W) -> Self {
        NexusWriter {
            bw: BufWriter::new(inner),
        }
    }

    /// Writes a complete NEXUS file with annotated rooted trees,
    /// named `TREE1`, `TREE2`, ... as in `tree TREE1 = [&R] (...)[&...];`.
    pub fn write_annotated_nexus(
        &mut self,
        trees: &[CompactTree],
        leaf_label_map: &LeafLabelMap,
    ) -> io::Result<()> {
        self.header()?
            .taxa_block(leaf_label_map)?
            .trees_block(trees, leaf_label_map)?;
        self.bw.flush()
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> io::Result<W> {
        self.bw.into_inner().map_err(|e| e.into_error())
    }
}

// ============================================================================
// Nexus Block & Command Writing (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Writes the NEXUS file header ("#NEXUS").
    fn header(&mut self) -> io::Result<&mut Self> {
        self.write_all(NEXUS_HEADER)?.newline()?.newline()
    }

    /// Writes the TAXA block with dimensions and taxon labels.
    fn taxa_block(&mut self, map: &LeafLabelMap) -> io::Result<&mut Self> {
        // "Begin taxa;"
        self.write_all(BLOCK_BEGIN)?
            .space()?
            .write_all(TAXA)?
            .semicolon_ln()?;

        // "\tDimensions ntax=n;"
        self.tab()?
            .write_all(DIMENSIONS)?
            .space()?
            .write_all(NTAX)?
            .equals()?
            .write_all(map.num_labels().to_string().as_bytes())?
            .semicolon_ln()?;

        // "\tTaxlabels\n\t\tlabel\n...\t\t;"
        self.tab()?.write_all(TAXLABELS)?.newline()?;
        for label in map.labels() {
            self.tab()?
                .tab()?
                .write_all(escape_label(label).as_bytes())?
                .newline()?;
        }
        self.tab()?.tab()?.semicolon_ln()?;

        self.write_all(BLOCK_END)?.newline()?.newline()
    }

    /// Writes the TREES block with TRANSLATE command and tree list.
    fn trees_block(
        &mut self,
        trees: &[CompactTree],
        leaf_label_map: &LeafLabelMap,
    ) -> io::Result<&mut Self> {
        // "Begin trees;"
        self.write_all(BLOCK_BEGIN)?
            .space()?
            .write_all(TREES)?
            .semicolon_ln()?;

        self.translate_cmd(leaf_label_map)?
            .trees_cmd_list(trees)?;

        self.write_all(BLOCK_END)?.newline()
    }

    /// Writes the TRANSLATE command mapping 1-based indices to labels.
    fn translate_cmd(&mut self, leaf_label_map: &LeafLabelMap) -> io::Result<&mut Self> {
        self.tab()?.write_all(TRANSLATE)?.newline()?;

        let num_labels = leaf_label_map.num_labels();
        for (id, label) in leaf_label_map.labels().iter().enumerate() {
            // "\t\t(id + 1) escaped_label,\n", no comma after last pair
            self.tab()?
                .tab()?
                .write_all((id + 1).to_string().as_bytes())?
                .space()?
                .write_all(escape_label(label).as_bytes())?;
            if id + 1 < num_labels {
                self.comma()?;
            }
            self.newline()?;
        }

        self.semicolon_ln()
    }

    /// Writes one TREE command per tree, annotated Newick with 1-based
    /// label indices.
    fn trees_cmd_list(&mut self, trees: &[CompactTree]) -> io::Result<&mut Self> {
        for (i, tree) in trees.iter().enumerate() {
            let newick = to_annotated_newick(&NewickStyle::OneIndexed, tree, None);

            // "tree TREE<i> = [&R] <newick;>"
            self.write_all(TREE)?
                .space()?
                .write_all(format!("TREE{}", i + 1).as_bytes())?
                .space()?
                .equals()?
                .space()?
                .write_all(b"[&R] ")?
                .write_all(newick.as_bytes())?
                .newline()?;
        }

        Ok(self)
    }
}

// ============================================================================
// Little Helpers (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Appends a byte slice, returning itself for chaining.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<&mut Self> {
        self.bw.write_all(buf)?;
        Ok(self)
    }

    fn space(&mut self) -> io::Result<&mut Self> {
        self.write_all(b" ")
    }

    fn tab(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\t")
    }

    fn newline(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\n")
    }

    /// Appends a semicolon followed by a newline (";\n").
    fn semicolon_ln(&mut self) -> io::Result<&mut Self> {
        self.write_all(b";\n")
    }

    fn comma(&mut self) -> io::Result<&mut Self> {
        self.write_all(b",")
    }

    fn equals(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"=")
    }
}
