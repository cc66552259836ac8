//! Clade frequency table of a tree sample.

use crate::clade::attribute::AttributeTuple;
use crate::clade::bitset::BitsetClade;
use crate::clade::vertex_clades;
use crate::error::Result;
use crate::model::CompactTree;
use std::collections::HashMap;
use std::collections::hash_map::Iter;

// =#========================================================================#=
// CLADE
// =#========================================================================$=
/// Record of one clade: how often it was seen, its credibility once
/// computed, and the attribute values sampled at its occurrences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clade {
    count: usize,
    credibility: f64,
    attribute_values: Vec<AttributeTuple>,
}

impl Clade {
    /// Number of trees in which this clade was seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Fraction of trees containing this clade, `0.0` before
    /// [calculate_clade_credibilities](CladeRegistry::calculate_clade_credibilities).
    pub fn credibility(&self) -> f64 {
        self.credibility
    }

    /// Sampled attribute tuples, one per recorded occurrence.
    pub fn attribute_values(&self) -> &[AttributeTuple] {
        &self.attribute_values
    }

    pub(crate) fn push_attribute_values(&mut self, values: AttributeTuple) {
        self.attribute_values.push(values);
    }

    pub(crate) fn increment(&mut self) {
        self.count += 1;
    }
}

// =#========================================================================#=
// CLADE REGISTRY
// =#========================================================================$=
/// Mapping from [BitsetClade] to [Clade] records over `num_taxa` taxa.
///
/// # Example
/// ```
/// use treeannotator::clade::{vertex_clades, CladeRegistry};
/// use treeannotator::newick::NewickParser;
/// use treeannotator::parser::ByteParser;
///
/// let byte_parser = ByteParser::for_str("((A,B),(C,D)); (((A,B),C),D); (((A,B),D),C);");
/// let trees = NewickParser::new().parse_all(byte_parser)?;
///
/// let mut registry = CladeRegistry::new(4);
/// for tree in &trees {
///     registry.add(tree, false)?;
/// }
/// registry.calculate_clade_credibilities(trees.len());
///
/// // Vertex 2 joins the first two leaves A and B
/// let ab = vertex_clades(&trees[0], 4)?[2].clone();
/// assert_eq!(ab.to_string(), "{0,1}");
/// assert_eq!(registry.get(&ab).unwrap().count(), 3);
/// assert_eq!(registry.credibility(&ab), 1.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct CladeRegistry {
    num_taxa: usize,
    clades: HashMap<BitsetClade, Clade>,
}

impl CladeRegistry {
    /// Creates an empty registry over `num_taxa` taxa.
    pub fn new(num_taxa: usize) -> Self {
        CladeRegistry {
            num_taxa,
            clades: HashMap::new(),
        }
    }

    /// Number of taxa in the universe.
    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    /// Counts the clades of `tree`: every internal vertex and the root,
    /// and the leaves' singletons if `include_tips`.
    ///
    /// # Returns
    /// The root clade, i.e. the full taxon set.
    ///
    /// # Errors
    /// [TaxonMismatch](crate::error::AnnotatorError::TaxonMismatch) if the
    /// tree does not contain every taxon exactly once.
    pub fn add(&mut self, tree: &CompactTree, include_tips: bool) -> Result<BitsetClade> {
        let clades = vertex_clades(tree, self.num_taxa)?;
        for vertex in tree.post_order_iter() {
            if vertex.is_leaf() && !include_tips {
                continue;
            }
            self.clades
                .entry(clades[vertex.index()].clone())
                .or_default()
                .increment();
        }
        Ok(clades[tree.root_index()].clone())
    }

    /// Decrements by one the count of each clade of `tree` that is in the
    /// registry; absent clades are ignored and records are never deleted.
    pub fn remove_clades(&mut self, tree: &CompactTree, include_tips: bool) -> Result<()> {
        let clades = vertex_clades(tree, self.num_taxa)?;
        for vertex in tree.post_order_iter() {
            if vertex.is_leaf() && !include_tips {
                continue;
            }
            if let Some(clade) = self.clades.get_mut(&clades[vertex.index()]) {
                clade.count = clade.count.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Sets the credibility of every clade to `count / total_trees_used`.
    ///
    /// # Panics
    /// If some clade was counted more often than `total_trees_used`,
    /// which means trees were counted twice.
    pub fn calculate_clade_credibilities(&mut self, total_trees_used: usize) {
        for (bitset, clade) in self.clades.iter_mut() {
            assert!(
                clade.count <= total_trees_used,
                "clade {bitset} counted {} times in {total_trees_used} trees",
                clade.count
            );
            clade.credibility = if total_trees_used == 0 {
                0.0
            } else {
                clade.count as f64 / total_trees_used as f64
            };
        }
    }

    /// Credibility of `clade`, `0.0` if it was never seen.
    pub fn credibility(&self, clade: &BitsetClade) -> f64 {
        self.clades.get(clade).map_or(0.0, Clade::credibility)
    }

    pub fn get(&self, clade: &BitsetClade) -> Option<&Clade> {
        self.clades.get(clade)
    }

    pub fn get_mut(&mut self, clade: &BitsetClade) -> Option<&mut Clade> {
        self.clades.get_mut(clade)
    }

    pub fn contains(&self, clade: &BitsetClade) -> bool {
        self.clades.contains_key(clade)
    }

    /// Number of distinct clades.
    pub fn len(&self) -> usize {
        self.clades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clades.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, BitsetClade, Clade> {
        self.clades.iter()
    }

    /// Sum of all clade counts.
    pub fn total_count(&self) -> usize {
        self.clades.values().map(Clade::count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::NewickParser;
    use crate::parser::ByteParser;

    fn trees(newick: &str) -> Vec<CompactTree> {
        let byte_parser = ByteParser::for_str(newick);
        NewickParser::new()
            .parse_all(byte_parser)
            .unwrap()
    }

    #[test]
    fn counts_internal_and_root_clades() {
        let sample = trees("((A,B),(C,D)); (((A,B),C),D);");
        let mut registry = CladeRegistry::new(4);
        for tree in &sample {
            registry.add(tree, false).unwrap();
        }

        // {A,B} twice, {C,D} and {A,B,C} once, root twice
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.total_count(), 6);

        registry.calculate_clade_credibilities(2);
        let root = vertex_clades(&sample[0], 4).unwrap()[sample[0].root_index()].clone();
        assert_eq!(registry.credibility(&root), 1.0);
    }

    #[test]
    fn tips_are_counted_on_request() {
        let sample = trees("((A,B),C);");
        let mut registry = CladeRegistry::new(3);
        registry.add(&sample[0], true).unwrap();
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn remove_clades_decrements_without_deleting() {
        let sample = trees("((A,B),C);");
        let mut registry = CladeRegistry::new(3);
        registry.add(&sample[0], false).unwrap();
        registry.remove_clades(&sample[0], false).unwrap();
        registry.remove_clades(&sample[0], false).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.total_count(), 0);
    }

    #[test]
    #[should_panic]
    fn overcounting_is_a_programming_error() {
        let sample = trees("((A,B),C); ((A,B),C);");
        let mut registry = CladeRegistry::new(3);
        for tree in &sample {
            registry.add(tree, false).unwrap();
        }
        registry.calculate_clade_credibilities(1);
    }

    #[test]
    fn unseen_clade_has_zero_credibility() {
        let registry = CladeRegistry::new(3);
        assert_eq!(registry.credibility(&BitsetClade::singleton(3, 0)), 0.0);
        assert!(registry.is_empty());
    }
}
