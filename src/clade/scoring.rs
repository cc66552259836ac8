//! Rating trees by the credibilities of their clades.

use crate::clade::registry::CladeRegistry;
use crate::clade::vertex_clades;
use crate::error::Result;
use crate::model::CompactTree;
use std::fmt;
use std::str::FromStr;

/// How a tree's clade credibilities are combined into one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringCriterion {
    /// Maximum clade credibility: sum of log credibilities, i.e. the log of
    /// their product. A clade never seen in the sample scores `-inf`.
    #[default]
    MaxCladeCredibility,
    /// Maximum sum of clade credibilities. Unseen clades add 0.
    MaxSumCladeCredibility,
}

impl FromStr for ScoringCriterion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mcc" => Ok(ScoringCriterion::MaxCladeCredibility),
            "msc" => Ok(ScoringCriterion::MaxSumCladeCredibility),
            other => Err(format!("unknown criterion '{other}', expected 'mcc' or 'msc'")),
        }
    }
}

impl fmt::Display for ScoringCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScoringCriterion::MaxCladeCredibility => write!(f, "mcc"),
            ScoringCriterion::MaxSumCladeCredibility => write!(f, "msc"),
        }
    }
}

/// Scores trees against a [CladeRegistry] with computed credibilities.
///
/// Both criteria walk the tree in post-order: a leaf scores 0, every other
/// vertex scores the sum of its children's scores plus the (log)
/// credibility of its own clade. Scoring only reads the registry.
///
/// # Example
/// ```
/// use treeannotator::clade::{CladeRegistry, ScoringCriterion, TreeScorer};
/// use treeannotator::newick::NewickParser;
/// use treeannotator::parser::ByteParser;
///
/// let byte_parser = ByteParser::for_str("((A,B),C); ((A,B),C); ((A,C),B);");
/// let trees = NewickParser::new().parse_all(byte_parser)?;
/// let mut registry = CladeRegistry::new(3);
/// for tree in &trees {
///     registry.add(tree, false)?;
/// }
/// registry.calculate_clade_credibilities(3);
///
/// let scorer = TreeScorer::new(&registry, ScoringCriterion::MaxSumCladeCredibility);
/// // {A,B} with 2/3 plus the root with 1
/// assert!((scorer.score(&trees[0])? - 5.0 / 3.0).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct TreeScorer<'a> {
    registry: &'a CladeRegistry,
    criterion: ScoringCriterion,
}

impl<'a> TreeScorer<'a> {
    pub fn new(registry: &'a CladeRegistry, criterion: ScoringCriterion) -> Self {
        TreeScorer {
            registry,
            criterion,
        }
    }

    pub fn criterion(&self) -> ScoringCriterion {
        self.criterion
    }

    /// Score of `tree` under the configured criterion.
    pub fn score(&self, tree: &CompactTree) -> Result<f64> {
        match self.criterion {
            ScoringCriterion::MaxCladeCredibility => self.log_clade_credibility(tree),
            ScoringCriterion::MaxSumCladeCredibility => self.sum_clade_credibility(tree),
        }
    }

    /// Sum of the credibilities of all non-leaf clades of `tree`.
    pub fn sum_clade_credibility(&self, tree: &CompactTree) -> Result<f64> {
        self.fold_clades(tree, |credibility| credibility)
    }

    /// Sum of the log credibilities of all non-leaf clades of `tree`,
    /// `-inf` if one of them was never seen.
    pub fn log_clade_credibility(&self, tree: &CompactTree) -> Result<f64> {
        self.fold_clades(tree, f64::ln)
    }

    /// Post-order accumulation of `combine(credibility)` over non-leaf clades.
    fn fold_clades(&self, tree: &CompactTree, combine: impl Fn(f64) -> f64) -> Result<f64> {
        let clades = vertex_clades(tree, self.registry.num_taxa())?;
        let mut scores = vec![0.0; tree.num_vertices()];
        for vertex in tree.post_order_iter() {
            if let Some(children) = vertex.children() {
                let own = combine(self.registry.credibility(&clades[vertex.index()]));
                let below: f64 = children.iter().map(|&child| scores[child]).sum();
                scores[vertex.index()] = below + own;
            }
        }
        Ok(scores[tree.root_index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::NewickParser;
    use crate::parser::ByteParser;

    fn registry_of(sample: &str, num_taxa: usize) -> (CladeRegistry, Vec<CompactTree>) {
        let byte_parser = ByteParser::for_str(sample);
        let trees = NewickParser::new()
            .parse_all(byte_parser)
            .unwrap();
        let mut registry = CladeRegistry::new(num_taxa);
        for tree in &trees {
            registry.add(tree, false).unwrap();
        }
        registry.calculate_clade_credibilities(trees.len());
        (registry, trees)
    }

    #[test]
    fn unseen_clade_is_minus_infinity_for_log_but_finite_for_sum() {
        let (registry, trees) = registry_of("((A,B),(C,D)); ((A,B),(C,D)); (((A,C),B),D);", 4);
        // Same label order as the sample, then a tree with unseen {A,D}
        let byte_parser = ByteParser::for_str("((A,B),(C,D)); (((A,D),B),C);");
        let candidates = NewickParser::new()
            .parse_all(byte_parser)
            .unwrap();
        let candidate = &candidates[1];

        let log = TreeScorer::new(&registry, ScoringCriterion::MaxCladeCredibility);
        let sum = TreeScorer::new(&registry, ScoringCriterion::MaxSumCladeCredibility);

        assert_eq!(log.score(candidate).unwrap(), f64::NEG_INFINITY);
        let sum_score = sum.score(candidate).unwrap();
        assert!(sum_score.is_finite());
        // Only the root is known
        assert_eq!(sum_score, 1.0);

        assert!(log.score(&trees[0]).unwrap().is_finite());
    }

    #[test]
    fn sum_score_does_not_decrease_with_more_copies() {
        let base = "((A,B),(C,D)); (((A,C),B),D); ";
        let (registry_one, trees) = registry_of(base, 4);
        let (registry_two, _) = registry_of(&format!("{base}((A,B),(C,D));"), 4);

        let before = TreeScorer::new(&registry_one, ScoringCriterion::MaxSumCladeCredibility)
            .score(&trees[0])
            .unwrap();
        let after = TreeScorer::new(&registry_two, ScoringCriterion::MaxSumCladeCredibility)
            .score(&trees[0])
            .unwrap();
        assert!(after >= before);
    }

    #[test]
    fn multifurcating_tree_scores_its_clades() {
        // {A,B} in 2 of 3 trees, {C,D} in 1 of 3, root in all
        let (registry, _) = registry_of("((A,B),(C,D)); ((A,B),C,D); (A,B,C,D);", 4);
        let byte_parser = ByteParser::for_str("((A,B),C,D); (A,B,C,D);");
        let candidates = NewickParser::new()
            .parse_all(byte_parser)
            .unwrap();

        let sum = TreeScorer::new(&registry, ScoringCriterion::MaxSumCladeCredibility);
        let log = TreeScorer::new(&registry, ScoringCriterion::MaxCladeCredibility);
        assert!((sum.score(&candidates[0]).unwrap() - (1.0 + 2.0 / 3.0)).abs() < 1e-12);
        assert!((log.score(&candidates[0]).unwrap() - (2.0f64 / 3.0).ln()).abs() < 1e-12);
        assert_eq!(sum.score(&candidates[1]).unwrap(), 1.0);
        assert_eq!(log.score(&candidates[1]).unwrap(), 0.0);
    }

    #[test]
    fn criterion_parses_case_insensitively() {
        assert_eq!("MCC".parse(), Ok(ScoringCriterion::MaxCladeCredibility));
        assert_eq!("msc".parse(), Ok(ScoringCriterion::MaxSumCladeCredibility));
        assert!("max".parse::<ScoringCriterion>().is_err());
    }
}
