//! The annotation pipeline from a tree sample file to an annotated target
//! tree.
//!
//! [TreeAnnotator] runs the [Stage]s in order, each one completing before
//! the next begins:
//! 1. [Counting](Stage::Counting): counts the clades of all post-burn-in
//!    trees and computes their credibilities
//! 2. [Selecting](Stage::Selecting): picks the tree with the best score as
//!    target (skipped, together with counting, for a user-supplied target)
//! 3. [Recounting](Stage::Recounting): collects attribute samples for the
//!    clades of the target
//! 4. [Annotating](Stage::Annotating): writes the summaries onto the target
//! 5. [Serializing](Stage::Serializing): writes the target as NEXUS file
//!
//! Each stage is one sequential pass over a [TreeSource]; trees are parsed
//! one at a time and dropped after use.

pub mod selector;
pub mod source;

pub use selector::{SelectorState, TargetSelector};
pub use source::{NewickStream, TreeFormat, TreeSource, load_target_tree};

pub use crate::summary::HeightsSummary;

use crate::clade::{CladeRegistry, ScoringCriterion, TreeScorer};
use crate::error::{AnnotatorError, Result};
use crate::model::{CompactTree, LeafLabelMap};
use crate::nexus::{Burnin, NexusWriter, ReadStrategy};
use crate::progress::Progress;
use crate::summary::{
    AnnotationReport, AttributeCollector, AttributeNames, CollectedClades, KdeContourStrategy,
    SummaryAnnotator,
};
use std::fmt;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span};

// =#========================================================================#=
// CONFIGURATION
// =#========================================================================$=
/// Where the target tree comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOption {
    /// Best tree of the sample under the criterion
    Select(ScoringCriterion),
    /// First tree of the given file
    UserTree(PathBuf),
}

impl Default for TargetOption {
    fn default() -> Self {
        TargetOption::Select(ScoringCriterion::default())
    }
}

/// Settings of one [TreeAnnotator] run.
///
/// # Example
/// ```
/// use treeannotator::nexus::Burnin;
/// use treeannotator::pipeline::{AnnotatorConfig, HeightsSummary};
///
/// let config = AnnotatorConfig::new("kakapo.trees")
///     .with_output("kakapo.tree")
///     .with_burnin(Burnin::Percentage(0.1))
///     .with_heights(HeightsSummary::Mean)
///     .with_posterior_limit(0.5);
/// assert!(config.validate().is_ok());
///
/// let config = config.with_hpd_mass(1.5);
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    input: PathBuf,
    output: Option<PathBuf>,
    burnin: Burnin,
    heights: HeightsSummary,
    posterior_limit: f64,
    target: TargetOption,
    hpd_mass: f64,
    hpd_2d_mass: f64,
    read_strategy: ReadStrategy,
    progress: bool,
}

impl AnnotatorConfig {
    /// Default configuration for the sample at `input`: no burn-in, median
    /// heights, no posterior limit, MCC target, HPD masses 0.95 and 0.80,
    /// output to stdout, no progress bars.
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        AnnotatorConfig {
            input: input.as_ref().to_path_buf(),
            output: None,
            burnin: Burnin::default(),
            heights: HeightsSummary::default(),
            posterior_limit: 0.0,
            target: TargetOption::default(),
            hpd_mass: 0.95,
            hpd_2d_mass: 0.80,
            read_strategy: ReadStrategy::default(),
            progress: false,
        }
    }

    pub fn with_output<P: AsRef<Path>>(mut self, output: P) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    pub fn with_burnin(mut self, burnin: Burnin) -> Self {
        self.burnin = burnin;
        self
    }

    pub fn with_heights(mut self, heights: HeightsSummary) -> Self {
        self.heights = heights;
        self
    }

    /// Minimum posterior of a clade to be annotated with statistics.
    pub fn with_posterior_limit(mut self, limit: f64) -> Self {
        self.posterior_limit = limit;
        self
    }

    pub fn with_target(mut self, target: TargetOption) -> Self {
        self.target = target;
        self
    }

    pub fn with_hpd_mass(mut self, mass: f64) -> Self {
        self.hpd_mass = mass;
        self
    }

    pub fn with_hpd_2d_mass(mut self, mass: f64) -> Self {
        self.hpd_2d_mass = mass;
        self
    }

    pub fn with_read_strategy(mut self, read_strategy: ReadStrategy) -> Self {
        self.read_strategy = read_strategy;
        self
    }

    /// Shows progress bars on stderr.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn target(&self) -> &TargetOption {
        &self.target
    }

    pub fn heights(&self) -> HeightsSummary {
        self.heights
    }

    /// Checks that all numbers are in range.
    ///
    /// # Errors
    /// [AnnotatorError::InvalidConfig] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if let Burnin::Percentage(fraction) = self.burnin
            && !(0.0..1.0).contains(&fraction)
        {
            return Err(invalid(format!(
                "burn-in percentage must be in [0, 1), got {fraction}"
            )));
        }
        if !(0.0..=1.0).contains(&self.posterior_limit) {
            return Err(invalid(format!(
                "posterior limit must be in [0, 1], got {}",
                self.posterior_limit
            )));
        }
        for (name, mass) in [("HPD", self.hpd_mass), ("2D HPD", self.hpd_2d_mass)] {
            if !(mass > 0.0 && mass <= 1.0) {
                return Err(invalid(format!("{name} mass must be in (0, 1], got {mass}")));
            }
        }
        if self.output.as_deref() == Some(self.input.as_path()) {
            return Err(invalid(String::from("output file must differ from input file")));
        }
        Ok(())
    }
}

fn invalid(message: String) -> AnnotatorError {
    AnnotatorError::InvalidConfig(message)
}

// =#========================================================================#=
// STAGES
// =#========================================================================$=
/// Step of a [TreeAnnotator] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Counting,
    Selecting,
    Recounting,
    Annotating,
    Serializing,
}

impl Stage {
    /// Progress bar label.
    fn label(&self) -> &'static str {
        match self {
            Stage::Counting => "Counting",
            Stage::Selecting => "Selecting",
            Stage::Recounting => "Recounting",
            Stage::Annotating => "Annotating",
            Stage::Serializing => "Serializing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label().to_ascii_lowercase())
    }
}

/// Annotated target tree of a run, before serializing.
#[derive(Debug, Clone)]
pub struct AnnotatedTree {
    pub tree: CompactTree,
    pub labels: LeafLabelMap,
    pub report: AnnotationReport,
    /// Number of post-burn-in trees summarized
    pub num_trees: usize,
    /// Score of a selected target, `None` for a user-supplied one
    pub target_score: Option<f64>,
}

// =#========================================================================#=
// TREE ANNOTATOR
// =#========================================================================€=
/// Runs the annotation pipeline for one [AnnotatorConfig].
///
/// # Example
/// ```no_run
/// use treeannotator::pipeline::{AnnotatorConfig, TreeAnnotator};
///
/// let config = AnnotatorConfig::new("takahe.trees").with_output("takahe.mcc.tree");
/// let annotated = TreeAnnotator::new(config)?.run()?;
/// println!("{} clades annotated", annotated.report.num_annotated);
/// # Ok::<(), treeannotator::error::AnnotatorError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeAnnotator {
    config: AnnotatorConfig,
    progress: Progress,
}

impl TreeAnnotator {
    /// # Errors
    /// [AnnotatorError::InvalidConfig] if the configuration does not
    /// [validate](AnnotatorConfig::validate).
    pub fn new(config: AnnotatorConfig) -> Result<Self> {
        config.validate()?;
        let progress = Progress::new(config.progress);
        Ok(TreeAnnotator { config, progress })
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Runs all stages and writes the annotated target tree to the output
    /// file, or stdout if there is none. Nothing is written if any stage
    /// fails.
    pub fn run(&self) -> Result<AnnotatedTree> {
        let annotated = self.annotate()?;

        let _span = info_span!("stage", stage = %Stage::Serializing).entered();
        let mut writer = NexusWriter::new(Vec::new());
        writer.write_annotated_nexus(std::slice::from_ref(&annotated.tree), &annotated.labels)?;
        let text = writer.into_inner()?;
        match &self.config.output {
            Some(path) => {
                replace_file(path, &text)?;
                info!(path = %path.display(), "Wrote annotated target tree");
            }
            None => io::stdout().lock().write_all(&text)?,
        }
        Ok(annotated)
    }

    /// Runs all stages up to and including annotating.
    pub fn annotate(&self) -> Result<AnnotatedTree> {
        let mut source = TreeSource::open(
            &self.config.input,
            self.config.burnin,
            self.config.read_strategy,
        )?;
        info!(
            path = %self.config.input.display(),
            num_taxa = source.labels().num_labels(),
            num_total_trees = source.num_total_trees(),
            num_burnin_trees = source.num_burnin_trees(),
            "Reading tree sample"
        );

        let (mut target, target_score) = match &self.config.target {
            TargetOption::Select(criterion) => {
                let registry = self.count_clades(&mut source)?;
                let (tree, score) = self.select_target(&mut source, &registry, *criterion)?;
                (tree, Some(score))
            }
            TargetOption::UserTree(path) => {
                let tree = load_target_tree(path, source.labels())?;
                info!(path = %path.display(), "Using user-supplied target tree");
                (tree, None)
            }
        };

        let (collected, num_trees) = self.collect_attributes(&mut source, &target)?;

        let report = {
            let _span = info_span!("stage", stage = %Stage::Annotating).entered();
            let report = SummaryAnnotator::new(&collected, KdeContourStrategy::default())
                .with_posterior_limit(self.config.posterior_limit)
                .with_heights(self.config.heights)
                .with_hpd_mass(self.config.hpd_mass)
                .with_hpd_2d_mass(self.config.hpd_2d_mass)
                .annotate(&mut target)?;
            info!(
                num_annotated = report.num_annotated,
                num_filtered = report.num_filtered,
                num_multimodal = report.num_multimodal,
                heights = %self.config.heights,
                "Annotated target tree"
            );
            report
        };

        let labels = source.labels().clone();
        Ok(AnnotatedTree {
            tree: target,
            labels,
            report,
            num_trees,
            target_score,
        })
    }

    fn count_clades(&self, source: &mut TreeSource) -> Result<CladeRegistry> {
        let _span = info_span!("stage", stage = %Stage::Counting).entered();
        let mut registry = CladeRegistry::new(source.labels().num_labels());
        let bar = self.progress.tree_bar(Stage::Counting.label(), source.num_trees())?;

        source.reset();
        let mut num_trees = 0;
        while let Some(tree) = source.next_tree()? {
            registry.add(&tree, false)?;
            num_trees += 1;
            bar.inc(1);
        }
        bar.finish_and_clear();

        registry.calculate_clade_credibilities(num_trees);
        info!(num_trees, num_clades = registry.len(), "Counted clades");
        Ok(registry)
    }

    fn select_target(
        &self,
        source: &mut TreeSource,
        registry: &CladeRegistry,
        criterion: ScoringCriterion,
    ) -> Result<(CompactTree, f64)> {
        let _span = info_span!("stage", stage = %Stage::Selecting).entered();
        let mut selector = TargetSelector::new(TreeScorer::new(registry, criterion));
        let bar = self.progress.tree_bar(Stage::Selecting.label(), source.num_trees())?;

        source.reset();
        while let Some(tree) = source.next_tree()? {
            selector.offer(tree)?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        let num_offered = selector.num_offered();
        let (tree, score) = selector.finish()?;
        info!(%criterion, score, num_offered, "Selected target tree");
        Ok((tree, score))
    }

    fn collect_attributes(
        &self,
        source: &mut TreeSource,
        target: &CompactTree,
    ) -> Result<(CollectedClades, usize)> {
        let _span = info_span!("stage", stage = %Stage::Recounting).entered();
        let bar = self.progress.tree_bar(Stage::Recounting.label(), source.num_trees())?;

        source.reset();
        let Some(first) = source.next_tree()? else {
            return Err(AnnotatorError::NoTreesAfterBurnin {
                burnin: source.num_burnin_trees(),
                total: source.num_total_trees(),
            });
        };
        let names = AttributeNames::discover(&first);
        debug!(
            attributes = ?names.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "Tracking attributes"
        );

        let collect_ca_heights = self.config.heights == HeightsSummary::CommonAncestor;
        let num_taxa = source.labels().num_labels();
        let mut collector = AttributeCollector::new(target, names, num_taxa, collect_ca_heights)?;
        collector.collect(&first)?;
        bar.inc(1);
        let mut num_trees = 1;
        while let Some(tree) = source.next_tree()? {
            collector.collect(&tree)?;
            num_trees += 1;
            bar.inc(1);
        }
        bar.finish_and_clear();

        let collected = collector.finish(num_trees)?;
        info!(num_trees, num_clades = collected.registry().len(), "Collected attributes");
        Ok((collected, num_trees))
    }
}

/// Writes `contents` to a temporary file next to `path` and renames it onto
/// `path`, so an existing file is either fully replaced or left untouched.
fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_out_of_range_settings() {
        let base = AnnotatorConfig::new("in.trees");
        assert!(base.validate().is_ok());
        assert!(base.clone().with_burnin(Burnin::Percentage(1.0)).validate().is_err());
        assert!(base.clone().with_posterior_limit(-0.1).validate().is_err());
        assert!(base.clone().with_hpd_mass(0.0).validate().is_err());
        assert!(base.clone().with_hpd_2d_mass(f64::NAN).validate().is_err());
        assert!(base.clone().with_output("in.trees").validate().is_err());
        assert!(matches!(
            TreeAnnotator::new(base.with_posterior_limit(2.0)),
            Err(AnnotatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn replaced_file_has_new_contents_and_no_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcc.tree");
        std::fs::write(&path, "old").unwrap();

        replace_file(&path, b"#NEXUS\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#NEXUS\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("mcc.tree");
        assert!(matches!(replace_file(&path, b"x"), Err(AnnotatorError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn stages_display_lowercase() {
        assert_eq!(Stage::Recounting.to_string(), "recounting");
    }
}
