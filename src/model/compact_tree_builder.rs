//! Incremental construction of [CompactTree]s during parsing.
//!
//! Parsers call builder methods as they read Newick or Nexus syntax; leaf
//! labels arrive already resolved to [LabelIndex] values by a
//! [LabelResolver](crate::model::LabelResolver):
//!
//! - Newick string contains label string/key (e.g., "1" or "Homo_sapiens")
//! - [LabelResolver](crate::model::LabelResolver) translates keys for Nexus,
//!   or passes verbatim, into an index of the [LeafLabelMap]
//! - `CompactTreeBuilder::add_leaf(branch_len, label_index)`
//!
//! # Builder lifecycle
//! A builder constructs multiple trees sequentially:
//!
//! ```text
//! Empty ──→ init_next() ──→ Building ──→ add_*/set_name ──→ finish_tree() ──→ Empty
//!   ↑                                                                           │
//!   └───────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::model::annotation::AnnotationValue;
use crate::model::vertex::BranchLength;
use crate::model::{CompactTree, LabelIndex, VertexIndex};
#[allow(unused_imports)]
use crate::model::LeafLabelMap;

/// Builder that constructs [CompactTree] instances.
///
/// Labels are stored externally in a [LeafLabelMap], with leaves holding
/// only [LabelIndex] references, so all trees of a sample share one map.
///
/// The parser drives the lifecycle:
/// 1. [init_next](Self::init_next) -> prepare for a new tree
/// 2. [add_leaf](Self::add_leaf), [add_internal](Self::add_internal),
///    [add_root](Self::add_root) -> build structure
/// 3. [add_annotation](Self::add_annotation) -> attach parsed `[&...]`
///    values to a vertex once it exists
/// 4. [set_name](Self::set_name) -> optionally assign a name
/// 5. [finish_tree](Self::finish_tree) -> finalize and return the tree
///
/// # Panics
/// The `add_*` methods panic if [init_next](Self::init_next) was not
/// called first, or on a negative branch length; parsers check both.
#[derive(Debug, Default)]
pub struct CompactTreeBuilder {
    current_tree: Option<CompactTree>,
}

impl CompactTreeBuilder {
    /// Creates a new builder in the empty state.
    pub fn new() -> Self {
        Self { current_tree: None }
    }

    fn tree_mut(&mut self) -> &mut CompactTree {
        self.current_tree
            .as_mut()
            .expect("CompactTreeBuilder used before init_next")
    }

    /// Prepares the builder for constructing a new tree with about
    /// `num_leaves` leaves.
    pub fn init_next(&mut self, num_leaves: usize) {
        self.current_tree = Some(CompactTree::new(num_leaves.max(1)));
    }

    /// Adds a leaf vertex to the tree under construction.
    ///
    /// # Arguments
    /// * `branch_len` — Non-negative branch length to parent, if specified
    /// * `label` — Index of the leaf's taxon
    pub fn add_leaf(&mut self, branch_len: Option<f64>, label: LabelIndex) -> VertexIndex {
        self.tree_mut()
            .add_leaf(branch_len.map(BranchLength::new), label)
    }

    /// Adds an internal (non-root) vertex with two or more children,
    /// given in input order.
    pub fn add_internal(
        &mut self,
        children: Vec<VertexIndex>,
        branch_len: Option<f64>,
    ) -> VertexIndex {
        self.tree_mut()
            .add_internal_vertex(children, branch_len.map(BranchLength::new))
    }

    /// Adds the root vertex, completing the tree structure.
    ///
    /// # Arguments
    /// * `children` — Indices of the root's child vertices (three for
    ///   unrooted samples)
    /// * `branch_len` — Root branch length (rare, but allowed in Newick)
    pub fn add_root(
        &mut self,
        children: Vec<VertexIndex>,
        branch_len: Option<f64>,
    ) -> VertexIndex {
        self.tree_mut()
            .add_root(children, branch_len.map(BranchLength::new))
    }

    /// Attaches an annotation value to a vertex already added.
    pub fn add_annotation(&mut self, vertex: VertexIndex, key: String, value: AnnotationValue) {
        self.tree_mut().annotations_mut().add(key, vertex, value);
    }

    /// Sets the name of the currently constructed tree.
    pub fn set_name(&mut self, tree_name: String) {
        if let Some(tree) = &mut self.current_tree {
            tree.set_name(tree_name);
        }
    }

    /// Finalizes the building process and returns the resulting tree,
    /// leaving the builder empty.
    pub fn finish_tree(&mut self) -> Option<CompactTree> {
        self.current_tree.take()
    }
}
