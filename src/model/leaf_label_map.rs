//! Joined storage and lookup for leaf labels of trees on the same taxa.
//!
//! The [LeafLabelMap] is the taxon index space of a tree sample: each taxon
//! gets a [LabelIndex] in `0..N`, which clades use as bit positions.

use std::collections::HashMap;
use std::fmt;

/// Index of a leaf label in a [LeafLabelMap].
pub type LabelIndex = usize;

// =#========================================================================#=
// LEAF LABEL MAP
// =#========================================================================#=
/// Maps leaf labels (strings) to compact indices for efficient storage.
///
/// This bidirectional mapping allows multiple trees with the same taxa to share
/// a single label storage, with each leaf referencing labels by [LabelIndex].
/// Labels are deduplicated automatically - inserting the same label twice returns
/// the same index.
///
/// # Example
/// ```
/// use treeannotator::model::LeafLabelMap;
///
/// let mut labels = LeafLabelMap::with_capacity(3);
///
/// let idx_a = labels.get_or_insert("A");  // idx_a = 0
/// let idx_b = labels.get_or_insert("B");  // idx_b = 1
/// let idx_a2 = labels.get_or_insert("A"); // idx_a2 = 0 (deduplicated)
///
/// assert_eq!(idx_a, idx_a2);
/// assert_eq!(labels.get_label(idx_b), Some("B"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafLabelMap {
    /// List of unique labels
    labels: Vec<String>,
    /// Map from label to its index
    map: HashMap<String, LabelIndex>,
}

impl LeafLabelMap {
    /// Creates a new LeafLabelMap with pre-allocated capacity.
    ///
    /// # Arguments
    /// * `num_leaves` - Expected number of unique leaf labels
    pub fn with_capacity(num_leaves: usize) -> Self {
        LeafLabelMap {
            labels: Vec::with_capacity(num_leaves),
            map: HashMap::with_capacity(num_leaves),
        }
    }

    /// Gets the index for a label, inserting it if it doesn't exist.
    ///
    /// # Arguments
    /// * `label` - The label string to look up or insert
    pub fn get_or_insert(&mut self, label: &str) -> LabelIndex {
        if let Some(&index) = self.map.get(label) {
            return index;
        }

        let index = self.labels.len();
        self.labels.push(label.to_string());
        self.map.insert(label.to_string(), index);
        index
    }

    /// Retrieves the index for a given label, `None` if unknown.
    pub fn get_index(&self, label: &str) -> Option<LabelIndex> {
        self.map.get(label).copied()
    }

    /// Retrieves the leaf label for a given index, `None` if out of range.
    pub fn get_label(&self, index: LabelIndex) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    /// Checks if a label exists in the map.
    pub fn contains_label(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    /// Returns the number of labels currently stored.
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl fmt::Display for LeafLabelMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "LeafLabelMap ({} labels):", self.labels.len())?;
        for (idx, label) in self.labels.iter().enumerate() {
            writeln!(f, "  [{}] {}", idx, label)?;
        }
        Ok(())
    }
}

impl std::ops::Index<LabelIndex> for LeafLabelMap {
    type Output = str;

    fn index(&self, index: LabelIndex) -> &Self::Output {
        &self.labels[index]
    }
}
