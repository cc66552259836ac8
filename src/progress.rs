//! Progress bars for the passes over the tree sample.

use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{msg:>14} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trees ({eta})";

/// Creates progress bars, or hidden ones if progress output is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    enabled: bool,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Progress { enabled }
    }

    pub fn hidden() -> Self {
        Progress { enabled: false }
    }

    /// Bar over `num_trees` trees labelled with `stage`.
    ///
    /// # Errors
    /// If the bar template is invalid.
    pub fn tree_bar(&self, stage: &'static str, num_trees: usize) -> Result<ProgressBar> {
        if !self.enabled {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(num_trees as u64);
        bar.set_style(ProgressStyle::default_bar().template(TEMPLATE)?.progress_chars("#>-"));
        bar.set_message(stage);
        Ok(bar)
    }
}
