//! Clade bookkeeping over a fixed taxon universe.
//!
//! A clade is the set of taxa below a vertex, represented as a
//! [BitsetClade]. A [CladeRegistry] counts how often each clade occurs in
//! a tree sample; a [TreeScorer] rates a tree by the credibilities of its
//! clades.
//!
//! All trees must contain each taxon of the universe (a
//! [LeafLabelMap](crate::model::LeafLabelMap) with `num_taxa` labels)
//! exactly once.

pub mod attribute;
pub mod bitset;
pub mod registry;
pub mod scoring;

pub use attribute::{AttributeTuple, SampleValue};
pub use bitset::BitsetClade;
pub use registry::{Clade, CladeRegistry};
pub use scoring::{ScoringCriterion, TreeScorer};

use crate::error::{AnnotatorError, Result};
use crate::model::{CompactTree, Vertex};

/// Computes the clade of every vertex of `tree` in one post-order pass,
/// indexed by [VertexIndex](crate::model::VertexIndex).
///
/// A leaf's clade is its singleton and every other vertex's clade is the
/// union of its children's clades.
///
/// # Errors
/// [AnnotatorError::TaxonMismatch] if a leaf label lies outside the
/// universe, a taxon occurs twice, or a taxon is missing.
pub fn vertex_clades(tree: &CompactTree, num_taxa: usize) -> Result<Vec<BitsetClade>> {
    if tree.num_leaves() != num_taxa {
        return Err(AnnotatorError::TaxonMismatch(format!(
            "tree {} has {} leaves, expected {num_taxa} taxa",
            tree_name(tree),
            tree.num_leaves()
        )));
    }

    let mut clades: Vec<Option<BitsetClade>> = vec![None; tree.num_vertices()];
    for vertex in tree.post_order_iter() {
        let clade = match vertex {
            Vertex::Leaf { label, .. } => {
                if *label >= num_taxa {
                    return Err(AnnotatorError::TaxonMismatch(format!(
                        "tree {} references taxon index {label} outside {num_taxa} taxa",
                        tree_name(tree)
                    )));
                }
                BitsetClade::singleton(num_taxa, *label)
            }
            Vertex::Internal { children, .. } | Vertex::Root { children, .. } => {
                let mut union = BitsetClade::empty(num_taxa);
                for &child in children {
                    let Some(child_clade) = &clades[child] else {
                        unreachable!("post-order visits children first");
                    };
                    if union.intersects(child_clade) {
                        return Err(AnnotatorError::TaxonMismatch(format!(
                            "tree {} contains a taxon more than once",
                            tree_name(tree)
                        )));
                    }
                    union = union.union(child_clade);
                }
                union
            }
        };
        clades[vertex.index()] = Some(clade);
    }

    clades
        .into_iter()
        .map(|clade| {
            clade.ok_or_else(|| {
                AnnotatorError::TaxonMismatch(format!(
                    "tree {} has vertices not connected to its root",
                    tree_name(tree)
                ))
            })
        })
        .collect()
}

fn tree_name(tree: &CompactTree) -> &str {
    tree.name().map_or("<unnamed>", String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    #[test]
    fn internal_clades_are_unions_of_children() {
        let (tree, labels) = newick::parse_str("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let clades = vertex_clades(&tree, labels.num_labels()).unwrap();

        let root_clade = &clades[tree.root_index()];
        assert_eq!(root_clade.count_taxa(), 4);
        let &[left, _] = tree.root().children().unwrap() else {
            panic!("expected two children")
        };
        assert_eq!(clades[left].to_string(), "{0,1}");
    }

    #[test]
    fn leaf_count_must_match_universe() {
        let (tree, _) = newick::parse_str("((A,B),(C,D));").unwrap();
        assert!(matches!(
            vertex_clades(&tree, 5),
            Err(AnnotatorError::TaxonMismatch(_))
        ));
    }

    #[test]
    fn duplicate_taxon_is_a_mismatch() {
        let mut tree = CompactTree::new(3);
        let a = tree.add_leaf(None, 0);
        let b = tree.add_leaf(None, 1);
        let ab = tree.add_internal_vertex(vec![a, b], None);
        let again = tree.add_leaf(None, 0);
        tree.add_root_without_branch(vec![ab, again]);

        assert!(matches!(
            vertex_clades(&tree, 3),
            Err(AnnotatorError::TaxonMismatch(_))
        ));
    }

    #[test]
    fn multifurcating_vertex_is_union_of_all_children() {
        let (tree, labels) = newick::parse_str("(A:2,B:2,(C:1,D:1,E:1):1);").unwrap();
        let clades = vertex_clades(&tree, labels.num_labels()).unwrap();

        assert_eq!(clades[tree.root_index()].count_taxa(), 5);
        let cde = tree.root().children().unwrap()[2];
        assert_eq!(clades[cde].to_string(), "{2,3,4}");
    }

    #[test]
    fn duplicate_taxon_under_third_child_is_a_mismatch() {
        let mut tree = CompactTree::new(3);
        let a = tree.add_leaf(None, 0);
        let b = tree.add_leaf(None, 1);
        let again = tree.add_leaf(None, 0);
        tree.add_root_without_branch(vec![a, b, again]);

        assert!(matches!(
            vertex_clades(&tree, 3),
            Err(AnnotatorError::TaxonMismatch(_))
        ));
    }
}
