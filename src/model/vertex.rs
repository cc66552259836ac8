//! Vertices of the arena tree [GenTree](crate::model::GenTree).

use crate::model::tree::VertexIndex;
use std::fmt;
use std::ops::Deref;

/// During construction, a non-root vertex might not have its parent set yet.
const NO_PARENT_SET: VertexIndex = usize::MAX;

// =#========================================================================#=
// VERTEX
// =#========================================================================$=
/// A vertex of a rooted phylogenetic tree.
///
/// - **Root**: two or more children, no parent, optional branch length
///   (BEAST trees sometimes carry one, unrooted samples list three children)
/// - **Internal**: parent and two or more children
/// - **Leaf**: parent and label reference of type `L`
///
/// # Invariants
/// - `index` is the position in the tree's arena
/// - `parent` is [NO_PARENT_SET] only while the tree is being built
/// - branch lengths are non-negative and finite if present
#[derive(PartialEq, Debug, Clone)]
pub enum Vertex<L> {
    Root {
        index: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    },
    Internal {
        index: VertexIndex,
        parent: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    },
    Leaf {
        index: VertexIndex,
        parent: VertexIndex,
        branch_length: Option<BranchLength>,
        label: L,
    },
}

impl<L> Vertex<L> {
    pub fn new_root(
        index: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex::Root {
            index,
            children,
            branch_length,
        }
    }

    pub fn new_internal(
        index: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex::Internal {
            index,
            parent: NO_PARENT_SET,
            children,
            branch_length,
        }
    }

    pub fn new_leaf(index: VertexIndex, branch_length: Option<BranchLength>, label: L) -> Self {
        Vertex::Leaf {
            index,
            parent: NO_PARENT_SET,
            branch_length,
            label,
        }
    }

    /// Index of this vertex in the arena.
    pub fn index(&self) -> VertexIndex {
        match self {
            Vertex::Root { index, .. }
            | Vertex::Internal { index, .. }
            | Vertex::Leaf { index, .. } => *index,
        }
    }

    /// Length of the branch to the parent, if known.
    pub fn branch_length(&self) -> Option<BranchLength> {
        match self {
            Vertex::Root { branch_length, .. }
            | Vertex::Internal { branch_length, .. }
            | Vertex::Leaf { branch_length, .. } => *branch_length,
        }
    }

    /// Replaces the length of the branch to the parent.
    pub fn set_branch_length(&mut self, length: Option<BranchLength>) {
        match self {
            Vertex::Root { branch_length, .. }
            | Vertex::Internal { branch_length, .. }
            | Vertex::Leaf { branch_length, .. } => *branch_length = length,
        }
    }

    pub fn has_branch_length(&self) -> bool {
        self.branch_length().is_some()
    }

    /// Label reference if this is a leaf.
    pub fn label(&self) -> Option<&L> {
        match self {
            Vertex::Leaf { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Children if this is the root or an internal vertex.
    pub fn children(&self) -> Option<&[VertexIndex]> {
        match self {
            Vertex::Root { children, .. } | Vertex::Internal { children, .. } => Some(children),
            Vertex::Leaf { .. } => None,
        }
    }

    /// Parent index of a non-root vertex, `None` for the root or if unset.
    pub fn parent(&self) -> Option<VertexIndex> {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => {
                (*parent != NO_PARENT_SET).then_some(*parent)
            }
            Vertex::Root { .. } => None,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Sets the parent of a non-root vertex.
    ///
    /// # Panics
    /// Panics if called on the root.
    pub fn set_parent(&mut self, new_parent: VertexIndex) {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => *parent = new_parent,
            Vertex::Root { .. } => panic!("Cannot set parent on root vertex"),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Vertex::Root { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Vertex::Internal { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Vertex::Leaf { .. })
    }

    /// Converts the label reference of a leaf, keeping everything else.
    pub(crate) fn try_map_label<M, E>(
        self,
        f: &mut impl FnMut(L) -> Result<M, E>,
    ) -> Result<Vertex<M>, E> {
        Ok(match self {
            Vertex::Root {
                index,
                children,
                branch_length,
            } => Vertex::Root {
                index,
                children,
                branch_length,
            },
            Vertex::Internal {
                index,
                parent,
                children,
                branch_length,
            } => Vertex::Internal {
                index,
                parent,
                children,
                branch_length,
            },
            Vertex::Leaf {
                index,
                parent,
                branch_length,
                label,
            } => Vertex::Leaf {
                index,
                parent,
                branch_length,
                label: f(label)?,
            },
        })
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================$=
/// Branch length, guaranteed non-negative and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a new branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite.
    pub fn new(length: f64) -> Self {
        assert!(length >= 0.0, "Branch length must be non-negative, got {}", length);
        assert!(length.is_finite(), "Branch length must be finite, got {}", length);
        BranchLength(length)
    }

    /// Creates a branch length, or `None` if `length` is negative or not finite.
    pub fn try_new(length: f64) -> Option<Self> {
        (length >= 0.0 && length.is_finite()).then_some(BranchLength(length))
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for BranchLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
