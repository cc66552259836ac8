//! Choosing the best-scoring tree of a sample as target tree.

use crate::clade::TreeScorer;
use crate::error::{AnnotatorError, Result};
use crate::model::CompactTree;

/// Whether a [TargetSelector] still accepts trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Streaming,
    Done,
}

/// Keeps the best tree offered so far under a [TreeScorer].
///
/// A tree replaces the current best only if it scores strictly higher, so
/// the first of several equally good trees wins. Scores start at `-inf`,
/// and the first tree is kept even if it scores `-inf` itself.
pub struct TargetSelector<'a> {
    scorer: TreeScorer<'a>,
    state: SelectorState,
    best: Option<(CompactTree, f64)>,
    num_offered: usize,
}

impl<'a> TargetSelector<'a> {
    pub fn new(scorer: TreeScorer<'a>) -> Self {
        TargetSelector {
            scorer,
            state: SelectorState::Streaming,
            best: None,
            num_offered: 0,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    /// Number of trees offered so far.
    pub fn num_offered(&self) -> usize {
        self.num_offered
    }

    /// Score of the current best tree.
    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, score)| *score)
    }

    /// Scores `tree` and keeps it if it beats the current best.
    ///
    /// # Panics
    /// If called after [finish](Self::finish).
    pub fn offer(&mut self, tree: CompactTree) -> Result<()> {
        assert_eq!(self.state, SelectorState::Streaming, "selector already finished");
        let score = self.scorer.score(&tree)?;
        self.num_offered += 1;

        let better = match &self.best {
            None => true,
            Some((_, best_score)) => score > *best_score,
        };
        if better {
            self.best = Some((tree, score));
        }
        Ok(())
    }

    /// Ends the selection and hands out the best tree with its score.
    ///
    /// # Errors
    /// [AnnotatorError::NoTargetTree] if no tree was offered.
    pub fn finish(&mut self) -> Result<(CompactTree, f64)> {
        self.state = SelectorState::Done;
        self.best.take().ok_or(AnnotatorError::NoTargetTree)
    }
}
