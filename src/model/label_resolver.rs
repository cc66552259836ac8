//! Label resolution for Nexus file and Newick tree parsing.
//!
//! [`LabelResolver`] resolves string labels during parsing into
//! [`LabelIndex`] references into a [`LeafLabelMap`].

use crate::model::{LabelIndex, LeafLabelMap};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

// =#========================================================================#=
// LABEL RESOLVER
// =#========================================================================€=
/// Resolves labels in Newick strings during parsing against a [`LeafLabelMap`].
///
/// Different variants handle different scenarios:
/// - [`VerbatimLabels`](Self::VerbatimLabels): raw Newick or NEXUS without TRANSLATE
/// - [`FixedLabels`](Self::FixedLabels): Newick after the taxon set is known
/// - [`NexusLabels`](Self::NexusLabels): NEXUS with arbitrary TRANSLATE keys
/// - [`NexusIntegerLabels`](Self::NexusIntegerLabels): NEXUS with integer TRANSLATE keys
#[derive(Debug)]
pub enum LabelResolver {
    /// Resolves and stores labels verbatim, adding unknown ones.
    VerbatimLabels(LeafLabelMap),

    /// Resolves labels verbatim against a frozen map.
    ///
    /// Unknown labels are errors, so every tree of a sample stays on the
    /// taxa of the first one.
    FixedLabels(LeafLabelMap),

    /// Resolves labels using Nexus TRANSLATE command mapping.
    ///
    /// As the NEXUS format allows, tries to resolve in order:
    /// 1. Key provided by TRANSLATE map
    ///    (e.g. "terny" -> "White-fronted tern")
    /// 2. Integer as 1-based index of label in TAXA block
    ///    (e.g. 12 -> "White-fronted tern")
    /// 3. Verbatim label match
    NexusLabels {
        /// Pre-computed mapping: TRANSLATE key -> label index
        index_map: HashMap<String, LabelIndex>,
        /// Taxa of the TAXA block
        storage: LeafLabelMap,
    },

    /// Resolves labels using integer-only TRANSLATE keys `(1, 2, 3, ...)`,
    /// enabling direct array lookup instead of hash map access.
    NexusIntegerLabels {
        /// Direct mapping: array index → label index (0-based internally)
        index_array: Vec<LabelIndex>,
        /// Taxa of the TAXA block
        storage: LeafLabelMap,
    },
}

impl LabelResolver {
    /// Creates a [`VerbatimLabels`](Self::VerbatimLabels) resolver.
    pub(crate) fn new_verbatim_labels_resolver(storage: LeafLabelMap) -> Self {
        LabelResolver::VerbatimLabels(storage)
    }

    /// Creates a [`NexusLabels`](Self::NexusLabels) resolver.
    ///
    /// # Arguments
    /// * `translation` - TRANSLATE block mapping (key → full taxon label)
    /// * `storage` - The taxa (must already contain all labels)
    ///
    /// # Errors
    /// If any label in `translation` is not found in `storage`.
    pub(crate) fn new_nexus_labels_resolver(
        translation: HashMap<String, String>,
        storage: LeafLabelMap,
    ) -> Result<Self, LabelResolvingError> {
        let mut index_map = HashMap::with_capacity(translation.len());
        for (key, actual_label) in translation {
            let label_ref = storage.get_index(&actual_label).ok_or_else(|| {
                LabelResolvingError(format!(
                    "Label '{actual_label}' of TRANSLATE key '{key}' not in TAXA block"
                ))
            })?;
            index_map.insert(key, label_ref);
        }

        Ok(LabelResolver::NexusLabels { index_map, storage })
    }

    /// Creates a [`NexusIntegerLabels`](Self::NexusIntegerLabels) resolver.
    ///
    /// # Errors
    /// If a key is not an integer in `1..=num_labels`, a label is not in
    /// `storage`, or some index has no translation.
    pub(crate) fn new_nexus_integer_labels_resolver(
        translation: HashMap<String, String>,
        storage: LeafLabelMap,
    ) -> Result<Self, LabelResolvingError> {
        let num_labels = storage.num_labels();
        // Position `i` holds NEXUS index `i + 1`
        let mut index_array: Vec<Option<LabelIndex>> = vec![None; num_labels];

        for (key, actual_label) in &translation {
            let nexus_index = key.parse::<usize>().map_err(|_| {
                LabelResolvingError(format!("TRANSLATE key '{key}' is not a valid integer"))
            })?;

            if nexus_index == 0 || nexus_index > num_labels {
                return Err(LabelResolvingError(format!(
                    "TRANSLATE index {nexus_index} out of bounds \
                     (1-based indexing, valid range: 1-{num_labels})"
                )));
            }

            let label_ref = storage.get_index(actual_label).ok_or_else(|| {
                LabelResolvingError(format!(
                    "Label '{actual_label}' of TRANSLATE key '{key}' not in TAXA block"
                ))
            })?;
            index_array[nexus_index - 1] = Some(label_ref);
        }

        let index_array = index_array
            .into_iter()
            .enumerate()
            .map(|(i, label_ref)| {
                label_ref.ok_or_else(|| {
                    LabelResolvingError(format!("Missing translation for index {}", i + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LabelResolver::NexusIntegerLabels {
            index_array,
            storage,
        })
    }

    /// Stops a [`VerbatimLabels`](Self::VerbatimLabels) resolver from
    /// accepting new labels; other variants are returned unchanged.
    pub(crate) fn freeze(self) -> Self {
        match self {
            LabelResolver::VerbatimLabels(storage) => LabelResolver::FixedLabels(storage),
            other => other,
        }
    }

    /// Resolves a parsed label string to its index in the taxa.
    ///
    /// # Errors
    /// If the label is not known to a frozen or NEXUS resolver.
    pub(crate) fn resolve_label(
        &mut self,
        parsed_label: &str,
    ) -> Result<LabelIndex, LabelResolvingError> {
        match self {
            LabelResolver::VerbatimLabels(storage) => Ok(storage.get_or_insert(parsed_label)),

            LabelResolver::FixedLabels(storage) => {
                storage.get_index(parsed_label).ok_or_else(|| {
                    LabelResolvingError(format!(
                        "Label '{parsed_label}' does not occur in the first tree"
                    ))
                })
            }

            LabelResolver::NexusLabels { index_map, storage } => {
                if let Some(&label_ref) = index_map.get(parsed_label) {
                    return Ok(label_ref);
                }

                if let Ok(nexus_index) = parsed_label.parse::<usize>() {
                    if nexus_index == 0 || nexus_index > storage.num_labels() {
                        return Err(LabelResolvingError(format!(
                            "Nexus label index {nexus_index} out of bounds \
                             (1-based indexing, max {})",
                            storage.num_labels()
                        )));
                    }
                    return Ok(nexus_index - 1);
                }

                storage.get_index(parsed_label).ok_or_else(|| {
                    LabelResolvingError(format!("Could not resolve label '{parsed_label}'"))
                })
            }

            LabelResolver::NexusIntegerLabels { index_array, .. } => {
                let nexus_index = parsed_label.parse::<usize>().map_err(|_| {
                    LabelResolvingError(format!(
                        "Integer TRANSLATE keys in use, got label '{parsed_label}'"
                    ))
                })?;
                if nexus_index == 0 || nexus_index > index_array.len() {
                    return Err(LabelResolvingError(format!(
                        "Index {} out of bounds (1-based indexing, valid range: 1-{})",
                        nexus_index,
                        index_array.len()
                    )));
                }
                Ok(index_array[nexus_index - 1])
            }
        }
    }

    /// Consumes the resolver and returns the taxa.
    pub(crate) fn into_label_storage(self) -> LeafLabelMap {
        match self {
            LabelResolver::VerbatimLabels(storage)
            | LabelResolver::FixedLabels(storage)
            | LabelResolver::NexusLabels { storage, .. }
            | LabelResolver::NexusIntegerLabels { storage, .. } => storage,
        }
    }

    /// Returns a reference to the taxa.
    pub(crate) fn label_storage(&self) -> &LeafLabelMap {
        match self {
            LabelResolver::VerbatimLabels(storage)
            | LabelResolver::FixedLabels(storage)
            | LabelResolver::NexusLabels { storage, .. }
            | LabelResolver::NexusIntegerLabels { storage, .. } => storage,
        }
    }
}

impl Display for LabelResolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LabelResolver::VerbatimLabels(_) => writeln!(f, "LabelResolver::VerbatimLabels"),
            LabelResolver::FixedLabels(storage) => writeln!(
                f,
                "LabelResolver::FixedLabels on {} labels",
                storage.num_labels()
            ),
            LabelResolver::NexusLabels { index_map, .. } => {
                writeln!(f, "LabelResolver::NexusLabels with internal mapping:")?;
                for (key, value) in index_map {
                    writeln!(f, "  {} -> {}", key, value)?;
                }
                Ok(())
            }
            LabelResolver::NexusIntegerLabels { index_array, .. } => {
                writeln!(f, "LabelResolver::NexusIntegerLabels with array mapping:")?;
                for (i, label_index) in index_array.iter().enumerate() {
                    writeln!(f, "  {} -> {}", i + 1, label_index)?;
                }
                Ok(())
            }
        }
    }
}

// =#========================================================================#=
// LABEL RESOLVING ERROR
// =#========================================================================$=
/// Error returned when a [`LabelResolver`] cannot be built or cannot
/// resolve a label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelResolvingError(pub(crate) String);

impl Display for LabelResolvingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for LabelResolvingError {}
