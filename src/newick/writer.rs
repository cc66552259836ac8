//! Newick string writing, optionally with `[&key=value,...]` annotations.

use crate::model::leaf_label_map::LeafLabelMap;
use crate::model::tree::VertexIndex;
use crate::model::vertex::{BranchLength, Vertex};
use crate::model::{Annotations, CompactTree};
use crate::parser::utils::escape_label;

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Characters that force an annotation key into double quotes
const ANNOTATION_KEY_SPECIAL_CHARS: &[char] = &[',', '=', '[', ']', '{', '}', '"', ' '];

/// Style for serializing tree to Newick format,
/// controlling how leaf labels are represented in the output string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewickStyle {
    /// Use full leaf labels from the LeafLabelMap
    Label,
    /// Use 0-based indices (0, 1, 2, ...)
    ZeroIndexed,
    /// Use 1-based indices (1, 2, 3, ...) (as in Nexus files)
    OneIndexed,
}

/// Returns the Newick representation of this tree with closing semicolon.
///
/// # Arguments
/// * `style` - The [NewickStyle] used to represent leaf labels in the output
/// * `leaf_label_map` - [Mapping](LeafLabelMap) required when using [NewickStyle::Label], otherwise can be `None`
///
/// # Returns
/// A Newick format string terminated with `;`. Returns an empty string if
/// `NewickStyle::Label` is used without providing a [LeafLabelMap].
///
/// # Example
/// ```
/// use treeannotator::newick::{to_newick, NewickStyle};
/// use treeannotator::model::{CompactTree, LeafLabelMap};
/// use treeannotator::model::vertex::BranchLength;
///
/// let mut tree = CompactTree::new(2);
/// let mut labels = LeafLabelMap::with_capacity(2);
/// let a = tree.add_leaf(Some(BranchLength::new(1.0)), labels.get_or_insert("A"));
/// let b = tree.add_leaf(Some(BranchLength::new(2.0)), labels.get_or_insert("B"));
/// tree.add_root_without_branch(vec![a, b]);
///
/// assert_eq!(to_newick(&NewickStyle::Label, &tree, Some(&labels)), "(A:1,B:2);");
/// ```
pub fn to_newick(
    style: &NewickStyle,
    tree: &CompactTree,
    leaf_label_map: Option<&LeafLabelMap>,
) -> String {
    write_tree(style, tree, leaf_label_map, false)
}

/// Like [to_newick], but writes each vertex's annotations as a
/// `[&key=value,...]` block right after its label or closing parenthesis.
///
/// # Example
/// ```
/// use treeannotator::newick::{to_annotated_newick, NewickStyle};
/// use treeannotator::model::{CompactTree, LeafLabelMap};
/// use treeannotator::model::vertex::BranchLength;
///
/// let mut tree = CompactTree::new(2);
/// let a = tree.add_leaf(Some(BranchLength::new(1.0)), 0);
/// let b = tree.add_leaf(Some(BranchLength::new(1.0)), 1);
/// let root = tree.add_root_without_branch(vec![a, b]);
/// tree.annotations_mut().add("posterior", root, 1.0.into());
/// tree.annotations_mut().add("rate", a, vec![0.5, 0.7].into());
///
/// let newick = to_annotated_newick(&NewickStyle::OneIndexed, &tree, None);
/// assert_eq!(newick, "(1[&rate={0.5,0.7}]:1,2:1)[&posterior=1];");
/// ```
pub fn to_annotated_newick(
    style: &NewickStyle,
    tree: &CompactTree,
    leaf_label_map: Option<&LeafLabelMap>,
) -> String {
    write_tree(style, tree, leaf_label_map, true)
}

fn write_tree(
    style: &NewickStyle,
    tree: &CompactTree,
    leaf_label_map: Option<&LeafLabelMap>,
    with_annotations: bool,
) -> String {
    // Abort right away if arguments don't match
    if matches!(style, NewickStyle::Label) && leaf_label_map.is_none() {
        return String::new();
    }
    if !tree.is_root_set() {
        return String::new();
    }

    let mut capacity = estimate_newick_len(style, tree, leaf_label_map);
    if with_annotations {
        capacity += estimate_annotations_len(tree);
    }
    let mut writer = NewickBuilder {
        tree,
        style,
        leaf_label_map,
        annotations: with_annotations.then(|| tree.annotations()),
        newick: String::with_capacity(capacity),
    };
    writer.build(tree.root_index());
    writer.newick.push(';');
    writer.newick
}

/// Recursive helper state for building a Newick string
struct NewickBuilder<'a> {
    tree: &'a CompactTree,
    style: &'a NewickStyle,
    leaf_label_map: Option<&'a LeafLabelMap>,
    annotations: Option<&'a Annotations>,
    newick: String,
}

impl NewickBuilder<'_> {
    fn build(&mut self, index: VertexIndex) {
        let tree = self.tree;
        match &tree[index] {
            Vertex::Leaf {
                label,
                branch_length,
                ..
            } => {
                self.push_label(*label);
                self.push_annotations(index);
                self.push_branch_length(*branch_length);
            }
            Vertex::Internal {
                children,
                branch_length,
                ..
            } => {
                self.push_children(children);
                self.push_annotations(index);
                self.push_branch_length(*branch_length);
            }
            Vertex::Root { children, .. } => {
                self.push_children(children);
                self.push_annotations(index);
            }
        }
    }

    fn push_children(&mut self, children: &[VertexIndex]) {
        self.newick.push('(');
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                self.newick.push(',');
            }
            self.build(child);
        }
        self.newick.push(')');
    }

    fn push_label(&mut self, label_index: usize) {
        match (self.style, self.leaf_label_map) {
            (NewickStyle::Label, Some(map)) => match map.get_label(label_index) {
                Some(label) => self.newick.push_str(&escape_label(label)),
                None => self.newick.push_str(&label_index.to_string()),
            },
            (NewickStyle::OneIndexed, _) => self.newick.push_str(&(label_index + 1).to_string()),
            _ => self.newick.push_str(&label_index.to_string()),
        }
    }

    fn push_branch_length(&mut self, branch_length: Option<BranchLength>) {
        if let Some(branch_length) = branch_length {
            self.newick.push(':');
            self.newick.push_str(&branch_length.to_string());
        }
    }

    fn push_annotations(&mut self, index: VertexIndex) {
        let Some(annotations) = self.annotations else {
            return;
        };
        let mut entries = annotations.for_vertex(index).peekable();
        if entries.peek().is_none() {
            return;
        }

        self.newick.push_str("[&");
        for (i, (key, value)) in entries.enumerate() {
            if i > 0 {
                self.newick.push(',');
            }
            if key.contains(ANNOTATION_KEY_SPECIAL_CHARS) {
                self.newick.push('"');
                self.newick.push_str(key);
                self.newick.push('"');
            } else {
                self.newick.push_str(key);
            }
            self.newick.push('=');
            self.newick.push_str(&value.to_string());
        }
        self.newick.push(']');
    }
}

/// Estimates the length of a Newick string for a given tree, accounting for
/// structure, labels/indices, and branch lengths.
pub(crate) fn estimate_newick_len(
    style: &NewickStyle,
    tree: &CompactTree,
    leaf_label_map: Option<&LeafLabelMap>,
) -> usize {
    // Each internal node: "(,)"
    const INTERNAL_NODE_CHARS: usize = 3;
    // Branch lengths: ~20 chars each (e.g., ":0.009529961339106089")
    const BRANCH_LENGTH_CHARS: usize = 20;

    let num_internal = tree.num_internal() + 1; // +1 for root
    let structure_capacity = num_internal * INTERNAL_NODE_CHARS;

    let num_leaves = tree.num_leaves();
    let label_capacity = match (style, leaf_label_map) {
        (NewickStyle::Label, Some(map)) => map.labels().iter().map(|s| escape_label(s).len()).sum(),
        (NewickStyle::OneIndexed, _) => calculate_index_digit_capacity(num_leaves, false),
        _ => calculate_index_digit_capacity(num_leaves, true),
    };

    let branch_capacity = if tree.vertices_have_branch_lengths() {
        (num_leaves + num_internal - 1) * BRANCH_LENGTH_CHARS
    } else {
        0
    };

    structure_capacity + label_capacity + branch_capacity + BUFFER_CHARS
}

/// Rough guess of the characters needed for all annotation blocks.
fn estimate_annotations_len(tree: &CompactTree) -> usize {
    // Key, '=', value and separator
    const ENTRY_CHARS: usize = 30;
    tree.annotations().keys().len() * tree.num_vertices() * ENTRY_CHARS
}

/// Calculates the total number of characters needed to represent all indices,
/// as `count * max_digits - overcounting_adjustment`.
///
/// # Examples
/// - 14 leaves, 1-indexed (1-14): 14*2 - 9 = 19 chars
/// - 102 leaves, 1-indexed (1-102): 102*3 - 9 - 90 = 198 chars
/// - 10 leaves, 0-indexed (0-9): 10*1 = 10 chars
fn calculate_index_digit_capacity(count: usize, zero_indexed: bool) -> usize {
    if count == 0 {
        return 0;
    }

    let max_index = if zero_indexed { count - 1 } else { count };
    if max_index == 0 {
        return 1; // Just "0"
    }

    let max_digits = max_index.ilog10() as usize + 1;

    // Overestimate as if all indices had max_digits, then subtract
    // 9, 99, 999, ... for lower digit counts
    let mut total = max_index * max_digits;
    let mut cumulative_count = 9;
    for digits in 1..max_digits {
        total -= cumulative_count * (max_digits - digits);
        cumulative_count = cumulative_count * 10 + 9;
    }

    // ZeroIndexed has one extra 1-digit number: the 0
    if zero_indexed {
        total += 1;
    }

    total
}
