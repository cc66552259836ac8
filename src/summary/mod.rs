//! Summarizing the sampled attributes of a target tree's clades.
//!
//! After a target tree is chosen, an [AttributeCollector] re-reads the tree
//! sample and records, for every clade of the target, the values of the
//! tracked [AttributeNames] at each occurrence. A [SummaryAnnotator] then
//! writes posterior, means, medians, HPD intervals, ranges, discrete modes
//! and 2D HPD contours onto the target's vertices.
//!
//! The numeric building blocks are in [stats], [kde] and [contour].

pub mod annotator;
pub mod collector;
pub mod contour;
pub mod kde;
pub mod stats;

pub use annotator::{AnnotationReport, HeightsSummary, SummaryAnnotator};
pub use collector::{Attribute, AttributeCollector, AttributeKind, AttributeNames, CollectedClades};
pub use contour::{Contour, ContourStrategy, KdeContourStrategy};
