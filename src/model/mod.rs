//! Data model for rooted phylogenetic trees.
//!
//! # Tree representation
//! Trees are represented by [GenTree], which uses the arena pattern to store
//! [Vertex] nodes. Each vertex is either a `Root`, `Internal`, or `Leaf`,
//! referenced by [VertexIndex]. Struct thus restricted to trees with
//! at least two leaves. Parsed and computed vertex annotations live in the
//! tree's [Annotations].
//!
//! The concrete tree type is [CompactTree], whose leaves hold a [LabelIndex]
//! into a [LeafLabelMap] shared by all trees of a sample.
//!
//! # Building trees
//! Parsers construct trees incrementally with a [CompactTreeBuilder].
//!
//! # Label handling
//! During parsing, labels flow through:
//! 1. [LabelResolver] — translates Newick strings
//!    (according to Nexus TRANSLATE command)
//! 2. [LeafLabelMap] — stores labels and returns the indices held by leaves

pub mod annotation;
pub mod compact_tree_builder;
pub mod label_resolver;
pub mod leaf_label_map;
pub mod tree;
pub mod vertex;

// Tree (generic)
pub use tree::GenTree;
pub use tree::VertexIndex;
pub use vertex::{BranchLength, Vertex};
// Compact tree
pub use compact_tree_builder::CompactTreeBuilder;
pub use leaf_label_map::LabelIndex;
pub use leaf_label_map::LeafLabelMap;
pub use tree::CompactTree;
// Annotations
pub use annotation::{AnnotationValue, Annotations};
// Label handling
pub use label_resolver::{LabelResolver, LabelResolvingError};
