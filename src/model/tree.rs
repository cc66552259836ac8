//! Provides generic tree representations.
//!
//! Provides core data structures for representing phylogenetic trees:
//! * [`GenTree<LabelRef>`] - Main tree structure using the arena pattern
//!   for efficient memory layout, generic over way vertices handle labels.
//! * [CompactTree] as realization with [LabelIndex]
//! * [VertexIndex] as type used to index vertices in tree

use crate::model::annotation::Annotations;
use crate::model::leaf_label_map::LabelIndex;
use crate::model::vertex::{BranchLength, Vertex};

/// Index of a vertex in a tree (arena).
pub type VertexIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: VertexIndex = usize::MAX;

// =$========================================================================$=
// TREE
// =$========================================================================$=
/// A rooted phylogenetic tree represented using the arena pattern
/// on [Vertex].
///
/// Vertices are stored in a contiguous vector and referenced by
/// [VertexIndex]. Per-vertex [Annotations] are kept in columns parallel to
/// this arena.
///
/// Generic over `L` (LabelRef), representing how leaves handle labels.
///
/// # Structure
/// - All vertices (root, internal, and leaves) are stored in the arena.
/// - Index of root is maintained.
/// - No assumption on order of indices is maintained.
///   (e.g. leaves must not be first `n` indices)
/// - Branch lengths are optional, but if provided must be non-negative.
///
/// # Construction
/// To construct a tree, specify its size based on the number of leaves,
/// then add vertices one by one, bottom-up.
/// Test validity with [`GenTree::is_valid()`].
///
/// # Example
/// ```
/// use treeannotator::model::{CompactTree, LeafLabelMap};
/// use treeannotator::model::vertex::BranchLength;
///
/// // ((A:0.2,B:0.2):0.2,C:0.4);
/// let mut tree = CompactTree::new(3);
/// let mut labels = LeafLabelMap::with_capacity(3);
/// let a = tree.add_leaf(Some(BranchLength::new(0.2)), labels.get_or_insert("A"));
/// let b = tree.add_leaf(Some(BranchLength::new(0.2)), labels.get_or_insert("B"));
/// let c = tree.add_leaf(Some(BranchLength::new(0.4)), labels.get_or_insert("C"));
/// let ab = tree.add_internal_vertex(vec![a, b], Some(BranchLength::new(0.2)));
/// tree.add_root_without_branch(vec![ab, c]);
///
/// assert!(tree.is_valid());
/// assert!((tree.height() - 0.4).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct GenTree<L> {
    /// Number of leaf nodes in the tree
    num_leaves_init: usize,

    /// Vertices of this tree (arena pattern)
    vertices: Vec<Vertex<L>>,

    /// Index of the root of this tree
    root_index: VertexIndex,

    /// Name of tree; optional, e.g. when parsed from Nexus file
    name: Option<String>,

    /// Annotations per vertex, e.g. parsed `[&rate=0.1]` comments
    annotations: Annotations,
}

/// Tree with shared labels via [LeafLabelMap](crate::model::LeafLabelMap),
/// which is efficient for set of trees.
pub type CompactTree = GenTree<LabelIndex>;

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl<L> GenTree<L> {
    /// Creates a new tree with capacity for a tree with `num_leaves` leaves.
    ///
    /// # Arguments
    /// `num_leaves` - number of leaves of the new tree, bounding the number
    /// of vertices (at most `2n-1` when fully resolved); must be positive
    pub fn new(num_leaves: usize) -> Self {
        assert!(num_leaves > 0);
        let capacity = 2 * num_leaves - 1;
        GenTree {
            num_leaves_init: num_leaves,
            name: None,
            root_index: NO_ROOT_SET_INDEX,
            vertices: Vec::with_capacity(capacity),
            annotations: Annotations::new(capacity),
        }
    }

    /// Attaches a name to this tree.
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Adds a root to the tree, assigning a unique index, which gets returned.
    ///
    /// # Arguments
    /// * `children` - Indices of the two or more children
    /// * `branch_length` - Optional length of incoming edge (for special cases, non-negative)
    pub fn add_root(
        &mut self,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        for &child in &children {
            self[child].set_parent(index);
        }
        self.vertices
            .push(Vertex::new_root(index, children, branch_length));
        self.root_index = index;

        index
    }

    /// Adds a root without branch length, see [add_root](Self::add_root).
    pub fn add_root_without_branch(&mut self, children: Vec<VertexIndex>) -> VertexIndex {
        self.add_root(children, None)
    }

    /// Adds an internal vertex to the tree, assigning a unique index, which gets returned.
    ///
    /// # Arguments
    /// * `children` - Indices of the two or more children
    /// * `branch_length` - Length of incoming branch, i.e. distance to parent (non-negative)
    pub fn add_internal_vertex(
        &mut self,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        for &child in &children {
            self[child].set_parent(index);
        }
        self.vertices
            .push(Vertex::new_internal(index, children, branch_length));

        index
    }

    /// Adds a leaf to the tree, assigning a unique index, which gets returned.
    ///
    /// # Arguments
    /// * `branch_length` - Length of incoming branch, i.e. distance to parent (non-negative)
    /// * `label` - Label (ref) for this leaf (type depends on tree variant)
    pub fn add_leaf(&mut self, branch_length: Option<BranchLength>, label: L) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices
            .push(Vertex::new_leaf(index, branch_length, label));
        index
    }

    /// Returns reference to name of this tree, or `None` if not set.
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Set a name for this tree.
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Returns whether root of tree has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns a reference to the root vertex.
    ///
    /// # Panics
    /// Panics if the root hasn't been set and thus tree hasn't been fully constructed yet.
    pub fn root(&self) -> &Vertex<L> {
        &self[self.root_index]
    }

    /// Returns the index of the root.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index
    }

    /// Returns a reference to the vertex at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex(&self, index: VertexIndex) -> &Vertex<L> {
        &self[index]
    }

    /// Returns a mutable reference to the vertex at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex_mut(&mut self, index: VertexIndex) -> &mut Vertex<L> {
        &mut self.vertices[index]
    }

    /// Returns all vertices in arena order.
    pub fn vertices(&self) -> &[Vertex<L>] {
        &self.vertices
    }

    /// Returns the number of leaves this tree was initialized to hold.
    pub fn num_leaves_init(&self) -> usize {
        self.num_leaves_init
    }

    /// Returns the number of leaves in this tree.
    pub fn num_leaves(&self) -> usize {
        self.vertices.iter().filter(|&v| v.is_leaf()).count()
    }

    /// Returns the number of internal vertices in this tree.
    pub fn num_internal(&self) -> usize {
        self.vertices.iter().filter(|&v| v.is_internal()).count()
    }

    /// Returns the number of vertices in this tree.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Drops all annotations, e.g. those of a tree about to be re-annotated.
    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    /// Returns the height of this tree, that is, the largest distance of the
    /// root to any leaf. Missing branch lengths count as zero.
    pub fn height(&self) -> f64 {
        self.vertex_heights()
            .get(self.root_index)
            .copied()
            .unwrap_or(0.0)
    }

    /// Computes the height of every vertex from branch lengths, indexed by
    /// [VertexIndex].
    ///
    /// The deepest leaf sits at height 0 and every other vertex at the
    /// largest root-to-leaf distance minus its own distance from the root,
    /// so non-ultrametric trees give positive heights for shallow leaves.
    /// Missing branch lengths count as zero.
    pub fn vertex_heights(&self) -> Vec<f64> {
        let mut depths = vec![0.0; self.vertices.len()];
        let mut max_depth: f64 = 0.0;
        for vertex in self.pre_order_iter() {
            let depth = match vertex.parent() {
                Some(parent) => depths[parent] + vertex.branch_length().map_or(0.0, |bl| *bl),
                None => 0.0,
            };
            depths[vertex.index()] = depth;
            if vertex.is_leaf() {
                max_depth = max_depth.max(depth);
            }
        }

        depths.iter().map(|depth| max_depth - depth).collect()
    }

    /// Replaces all non-root branch lengths with the differences of the given
    /// vertex heights (indexed by [VertexIndex]).
    ///
    /// A child higher than its parent gets branch length zero.
    ///
    /// # Returns
    /// The number of branches clamped to zero.
    ///
    /// # Panics
    /// Panics if `heights` has fewer entries than the tree has vertices.
    pub fn apply_heights(&mut self, heights: &[f64]) -> usize {
        assert!(heights.len() >= self.vertices.len());
        let mut num_clamped = 0;
        for vertex in self.vertices.iter_mut() {
            let Some(parent) = vertex.parent() else {
                continue;
            };
            let length = heights[parent] - heights[vertex.index()];
            let branch_length = BranchLength::try_new(length).unwrap_or_else(|| {
                num_clamped += 1;
                BranchLength::new(0.0)
            });
            vertex.set_branch_length(Some(branch_length));
        }
        num_clamped
    }

    /// Checks if all non-root vertices have branch lengths set.
    pub fn vertices_have_branch_lengths(&self) -> bool {
        self.vertices
            .iter()
            .all(|vertex| vertex.is_root() || vertex.has_branch_length())
    }

    /// Converts the label references of all leaves, keeping structure,
    /// branch lengths, name and annotations.
    ///
    /// Used to move a tree onto another label space, e.g. a user-supplied
    /// target tree onto the taxa of a tree sample.
    pub fn try_map_labels<M, E>(
        self,
        mut f: impl FnMut(L) -> Result<M, E>,
    ) -> Result<GenTree<M>, E> {
        let vertices = self
            .vertices
            .into_iter()
            .map(|vertex| vertex.try_map_label(&mut f))
            .collect::<Result<Vec<_>, E>>()?;

        Ok(GenTree {
            num_leaves_init: self.num_leaves_init,
            vertices,
            root_index: self.root_index,
            name: self.name,
            annotations: self.annotations,
        })
    }
}

impl<L: ValidLabel> GenTree<L> {
    /// Validates the tree structure and all index references.
    ///
    /// Checks:
    /// - Root index is valid and points to the only Root vertex
    /// - All vertex indices match their position in the arena
    /// - All child indices are valid and point back to correct parent
    /// - All parent indices are valid and include this vertex as a child
    /// - Every non-leaf vertex has at least two children
    /// - Leaves carry valid labels and all vertices are reachable from the root
    pub fn is_valid(&self) -> bool {
        if self.root_index >= self.vertices.len() || !self.vertices[self.root_index].is_root() {
            return false;
        }

        let mut found_root = false;
        let num_leaves = self.num_leaves();

        for (index, vertex) in self.vertices.iter().enumerate() {
            if vertex.index() != index {
                return false;
            }

            if vertex.is_root() {
                if found_root {
                    return false;
                }
                found_root = true;
            }

            if let Some(children) = vertex.children() {
                if children.len() < 2 {
                    return false;
                }
                for &child in children {
                    let points_back = self
                        .vertices
                        .get(child)
                        .is_some_and(|child| child.parent() == Some(index));
                    if !points_back {
                        return false;
                    }
                }
            }

            if !vertex.is_root() {
                let Some(parent_index) = vertex.parent() else {
                    return false;
                };
                if parent_index >= self.vertices.len() {
                    return false;
                }
                match self.vertices[parent_index].children() {
                    Some(children) if children.contains(&index) => {}
                    _ => return false,
                }
            }

            if let Some(label) = vertex.label()
                && !label.is_valid_for_tree(num_leaves)
            {
                return false;
            }
        }

        // Parent links are consistent, so a vertex missed from the root is
        // detached; a child listed twice is visited twice
        self.post_order_iter().count() == self.vertices.len()
    }
}

impl<L> std::ops::Index<VertexIndex> for GenTree<L> {
    type Output = Vertex<L>;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

impl<L> std::ops::IndexMut<VertexIndex> for GenTree<L> {
    fn index_mut(&mut self, index: VertexIndex) -> &mut Self::Output {
        &mut self.vertices[index]
    }
}

// =$========================================================================$=
// ITERATORS
// =$========================================================================$=
impl<L> GenTree<L> {
    /// Returns an iterator over the tree in post-order (children before parents).
    ///
    /// Useful for aggregating data from leaves upward, e.g. clades.
    pub fn post_order_iter(&self) -> PostOrderIter<'_, L> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    ///
    /// Useful for propagating data from root to leaves, e.g. depths.
    pub fn pre_order_iter(&self) -> PreOrderIter<'_, L> {
        PreOrderIter::new(self)
    }
}

/// Iterator for post-order traversal (children before parents).
///
/// Stack-based, without recursion.
pub struct PostOrderIter<'a, L> {
    tree: &'a GenTree<L>,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a, L> PostOrderIter<'a, L> {
    fn new(tree: &'a GenTree<L>) -> Self {
        let mut stack = Vec::with_capacity(tree.num_vertices());
        if tree.is_root_set() {
            stack.push((tree.root_index, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a, L> Iterator for PostOrderIter<'a, L> {
    type Item = &'a Vertex<L>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];

            match vertex.children() {
                Some(children) if !children_visited => {
                    self.stack.push((index, true));
                    // Last child first, so the first is processed first
                    self.stack
                        .extend(children.iter().rev().map(|&child| (child, false)));
                }
                _ => return Some(vertex),
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
///
/// Stack-based, without recursion.
pub struct PreOrderIter<'a, L> {
    tree: &'a GenTree<L>,
    stack: Vec<VertexIndex>,
}

impl<'a, L> PreOrderIter<'a, L> {
    fn new(tree: &'a GenTree<L>) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push(tree.root_index);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a, L> Iterator for PreOrderIter<'a, L> {
    type Item = &'a Vertex<L>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];

        if let Some(children) = vertex.children() {
            self.stack.extend(children.iter().rev());
        }

        Some(vertex)
    }
}

// =#========================================================================#=
// VALID LABEL TRAIT
// =#========================================================================T=
/// Trait for label types that can be validated in a tree context.
pub trait ValidLabel {
    /// Checks whether this label is valid on a very basic level,
    /// e.g. for a label index whether it is in range
    fn is_valid_for_tree(&self, num_leaves: usize) -> bool;
}

impl ValidLabel for LabelIndex {
    fn is_valid_for_tree(&self, num_leaves: usize) -> bool {
        *self < num_leaves
    }
}
