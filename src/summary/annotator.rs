//! Annotating a target tree with per-clade summaries.

use crate::clade::{SampleValue, vertex_clades};
use crate::error::{AnnotatorError, Result};
use crate::model::{AnnotationValue, CompactTree, VertexIndex};
use crate::summary::collector::{Attribute, CollectedClades};
use crate::summary::contour::ContourStrategy;
use crate::summary::stats;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How vertex heights of the target tree are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeightsSummary {
    /// Leave heights and branch lengths untouched
    Keep,
    /// Mean of the sampled heights of each clade
    Mean,
    /// Median of the sampled heights of each clade
    #[default]
    Median,
    /// Mean height of the common ancestor of each clade's taxa
    CommonAncestor,
}

impl FromStr for HeightsSummary {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(HeightsSummary::Keep),
            "mean" => Ok(HeightsSummary::Mean),
            "median" => Ok(HeightsSummary::Median),
            "ca" => Ok(HeightsSummary::CommonAncestor),
            other => Err(format!(
                "unknown heights option '{other}', expected one of keep, mean, median, ca"
            )),
        }
    }
}

impl fmt::Display for HeightsSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HeightsSummary::Keep => "keep",
            HeightsSummary::Mean => "mean",
            HeightsSummary::Median => "median",
            HeightsSummary::CommonAncestor => "ca",
        };
        f.write_str(name)
    }
}

/// Counts of what happened while annotating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Vertices that received attribute summaries
    pub num_annotated: usize,
    /// Internal vertices below the posterior limit
    pub num_filtered: usize,
    /// Branches clamped to zero after setting heights
    pub num_clamped: usize,
    /// Bivariate summaries with more than one HPD region
    pub num_multimodal: usize,
}

/// Writes summaries of [CollectedClades] onto the vertices of a target tree.
pub struct SummaryAnnotator<'a, C> {
    collected: &'a CollectedClades,
    contours: C,
    posterior_limit: f64,
    heights: HeightsSummary,
    hpd_mass: f64,
    hpd_2d_mass: f64,
}

impl<'a, C: ContourStrategy> SummaryAnnotator<'a, C> {
    /// Annotator with posterior limit 0, median heights and HPD masses of
    /// 0.95 (univariate) and 0.80 (bivariate).
    pub fn new(collected: &'a CollectedClades, contours: C) -> Self {
        SummaryAnnotator {
            collected,
            contours,
            posterior_limit: 0.0,
            heights: HeightsSummary::default(),
            hpd_mass: 0.95,
            hpd_2d_mass: 0.80,
        }
    }

    pub fn with_posterior_limit(mut self, limit: f64) -> Self {
        self.posterior_limit = limit;
        self
    }

    pub fn with_heights(mut self, heights: HeightsSummary) -> Self {
        self.heights = heights;
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

    /// Replaces all annotations of `target` with clade summaries and, unless
    /// heights are kept, resets its heights.
    ///
    /// Internal vertices get `posterior`; vertices below the posterior limit
    /// get nothing else. Every vertex then gets a summary of each tracked
    /// attribute that was sampled for its clade.
    ///
    /// # Errors
    /// [AnnotatorError::MissingTargetClade] if a clade of `target` was not
    /// tracked by the collector.
    pub fn annotate(&self, target: &mut CompactTree) -> Result<AnnotationReport> {
        let clades = vertex_clades(target, self.collected.num_taxa())?;
        let order: Vec<(VertexIndex, bool)> = target
            .post_order_iter()
            .map(|vertex| (vertex.index(), vertex.is_leaf()))
            .collect();
        let height_slot = self.collected.names().position("height");

        target.clear_annotations();
        let mut heights = target.vertex_heights();
        let mut report = AnnotationReport::default();

        for (index, is_leaf) in order {
            let clade_key = &clades[index];
            let clade = self
                .collected
                .clade(clade_key)
                .ok_or_else(|| AnnotatorError::MissingTargetClade(clade_key.to_string()))?;

            let height_samples: Vec<f64> = height_slot
                .map(|slot| numbers(clade.attribute_values().iter().map(|t| &t[slot])))
                .unwrap_or_default();
            let summarized_height = match self.heights {
                HeightsSummary::Keep => None,
                HeightsSummary::Mean => stats::mean(&height_samples),
                HeightsSummary::Median => stats::median(&height_samples),
                HeightsSummary::CommonAncestor => self.collected.ca_height(clade_key),
            };
            if let Some(height) = summarized_height {
                heights[index] = height;
            }

            let mut values: Vec<(String, AnnotationValue)> = Vec::new();
            if !is_leaf {
                let posterior = clade.credibility();
                values.push((String::from("posterior"), posterior.into()));
                if posterior < self.posterior_limit {
                    report.num_filtered += 1;
                    write_all(target, index, values);
                    continue;
                }
            }

            for (slot, attribute) in self.collected.names().iter().enumerate() {
                let samples = clade.attribute_values().iter().map(|t| &t[slot]);
                self.summarize(attribute, samples, &mut values, &mut report);
            }
            report.num_annotated += 1;
            write_all(target, index, values);
        }

        if self.heights != HeightsSummary::Keep {
            report.num_clamped = target.apply_heights(&heights);
            if report.num_clamped > 0 {
                warn!(
                    num_clamped = report.num_clamped,
                    "Negative branch lengths after setting {} heights were set to zero",
                    self.heights
                );
            }
        }

        debug!(?report, "Annotated target tree");
        Ok(report)
    }

    /// Appends the summary of one attribute, chosen by the kind of its
    /// first sampled value.
    fn summarize<'s>(
        &self,
        attribute: &Attribute,
        samples: impl Iterator<Item = &'s Option<SampleValue>> + Clone,
        values: &mut Vec<(String, AnnotationValue)>,
        report: &mut AnnotationReport,
    ) {
        let name = attribute.name.as_str();
        let Some(first) = samples.clone().flatten().next() else {
            return;
        };

        match first {
            SampleValue::Number(_) => {
                self.summarize_numbers(name, &numbers(samples), values);
            }
            SampleValue::Bool(_) => {
                let flags: Vec<bool> = samples
                    .flatten()
                    .filter_map(|v| match v {
                        SampleValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                if let Some(fraction) = stats::fraction_true(&flags) {
                    values.push((name.to_string(), fraction.into()));
                }
            }
            SampleValue::Discrete(_) => {
                let labels: Vec<&str> = samples
                    .flatten()
                    .filter_map(|v| match v {
                        SampleValue::Discrete(s) => Some(s.as_str()),
                        _ => None,
                    })
                    .collect();
                if let Some(summary) = stats::discrete_summary(&labels) {
                    values.push((name.to_string(), summary.mode.into()));
                    values.push((format!("{name}.prob"), summary.mode_probability.into()));
                    values.push((
                        format!("{name}.set"),
                        AnnotationValue::Array(
                            summary.set.into_iter().map(AnnotationValue::String).collect(),
                        ),
                    ));
                    values.push((format!("{name}.set.prob"), summary.set_probabilities.into()));
                }
            }
            SampleValue::Pair(..) => {
                let (xs, ys): (Vec<f64>, Vec<f64>) = samples
                    .flatten()
                    .filter_map(|v| match v {
                        SampleValue::Pair(x, y) => Some((*x, *y)),
                        _ => None,
                    })
                    .unzip();
                let varies_x = self.summarize_numbers(&format!("{name}1"), &xs, values);
                let varies_y = self.summarize_numbers(&format!("{name}2"), &ys, values);
                if varies_x && varies_y {
                    self.summarize_contours(name, &xs, &ys, values, report);
                }
            }
        }
    }

    /// Mean and, for varying values, median, HPD interval and range.
    ///
    /// # Returns
    /// Whether the values vary.
    fn summarize_numbers(
        &self,
        name: &str,
        numbers: &[f64],
        values: &mut Vec<(String, AnnotationValue)>,
    ) -> bool {
        let (Some(mean), Some((min, max))) = (stats::mean(numbers), stats::range(numbers)) else {
            return false;
        };
        values.push((name.to_string(), mean.into()));
        if min >= max {
            return false;
        }

        if let Some(median) = stats::median(numbers) {
            values.push((format!("{name}_median"), median.into()));
        }
        if let Some((lo, hi)) = stats::hpd_interval(numbers, self.hpd_mass) {
            values.push((
                format!("{name}_{}%_HPD", percent(self.hpd_mass)),
                vec![lo, hi].into(),
            ));
        }
        values.push((format!("{name}_range"), vec![min, max].into()));
        true
    }

    fn summarize_contours(
        &self,
        name: &str,
        xs: &[f64],
        ys: &[f64],
        values: &mut Vec<(String, AnnotationValue)>,
        report: &mut AnnotationReport,
    ) {
        let contours = self.contours.hpd_contours(xs, ys, self.hpd_2d_mass);
        let label = format!("{}%HPD", percent(self.hpd_2d_mass));
        for (k, contour) in contours.iter().enumerate() {
            values.push((format!("{name}1_{label}_{}", k + 1), contour.xs.clone().into()));
            values.push((format!("{name}2_{label}_{}", k + 1), contour.ys.clone().into()));
        }
        values.push((format!("{name}_{label}_modality"), contours.len().into()));

        if contours.len() > 1 {
            report.num_multimodal += 1;
            warn!(
                attribute = name,
                modality = contours.len(),
                "Multimodal {label} region"
            );
        }
    }
}

fn numbers<'s>(samples: impl Iterator<Item = &'s Option<SampleValue>>) -> Vec<f64> {
    samples.flatten().filter_map(SampleValue::as_number).collect()
}

fn write_all(target: &mut CompactTree, index: VertexIndex, values: Vec<(String, AnnotationValue)>) {
    let annotations = target.annotations_mut();
    for (key, value) in values {
        annotations.add(key, index, value);
    }
}

/// Mass as a percentage label, e.g. `95` for 0.95 and `97.5` for 0.975.
fn percent(mass: f64) -> String {
    let p = mass * 100.0;
    if (p - p.round()).abs() < 1e-9 {
        format!("{}", p.round() as i64)
    } else {
        format!("{p}")
    }
}
