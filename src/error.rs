//! Crate-level error type of the annotation pipeline.
//!
//! Parser failures keep their own [ParsingError] (with byte position and
//! context) and are wrapped here; everything else that aborts a run is an
//! [AnnotatorError] variant.

use crate::parser::ParsingError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {0}")]
    Parsing(#[from] ParsingError),

    #[error("No trees found in '{}'", path.display())]
    EmptyTreeStream { path: PathBuf },

    #[error("No trees to use: burn-in of {burnin} trees consumes all {total} trees")]
    NoTreesAfterBurnin { burnin: usize, total: usize },

    #[error("Taxon mismatch: {0}")]
    TaxonMismatch(String),

    #[error("Unknown taxon '{0}' in target tree")]
    UnknownTaxon(String),

    #[error("Target tree clade {0} was not observed in the sample")]
    MissingTargetClade(String),

    #[error("No target tree could be selected")]
    NoTargetTree,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Progress bar template error: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),
}

pub type Result<T> = std::result::Result<T, AnnotatorError>;
