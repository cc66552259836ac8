//! Per-clade attribute sampling over a second pass of the tree sample.

use crate::clade::{AttributeTuple, BitsetClade, Clade, CladeRegistry, SampleValue, vertex_clades};
use crate::error::Result;
use crate::model::{AnnotationValue, CompactTree, VertexIndex};
use std::collections::HashMap;
use tracing::debug;

/// Keys written by the annotator itself; input annotations of these names
/// are not tracked
const RESERVED_KEYS: [&str; 3] = ["height", "length", "posterior"];

// =#========================================================================#=
// ATTRIBUTE NAMES
// =#========================================================================$=
/// Where the values of a tracked attribute come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Vertex height derived from branch lengths
    Height,
    /// Branch length above the vertex
    Length,
    /// Annotation with a univariate value
    Annotation(String),
    /// Two annotations `<base>1` and `<base>2` forming one bivariate value
    SplitPair(String, String),
    /// Annotation holding a two-element numeric array
    ArrayPair(String),
}

/// Named attribute tracked at every clade occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn is_bivariate(&self) -> bool {
        matches!(
            self.kind,
            AttributeKind::SplitPair(..) | AttributeKind::ArrayPair(_)
        )
    }
}

/// Ordered list of tracked attributes; slot `i` of every [AttributeTuple]
/// holds the value of attribute `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    attributes: Vec<Attribute>,
}

impl AttributeNames {
    /// Tracks `height`, `length`, and then the annotation keys of `tree` in
    /// the order they were first seen. Input annotations named `height`,
    /// `length` or `posterior` are ignored.
    ///
    /// Keys `<base>1` and `<base>2` are merged into a bivariate `<base>`,
    /// as are keys whose first value is a two-element numeric array. Other
    /// array-valued keys cannot be summarized and are skipped.
    ///
    /// # Example
    /// ```
    /// use treeannotator::newick::NewickParser;
    /// use treeannotator::parser::ByteParser;
    /// use treeannotator::summary::AttributeNames;
    ///
    /// let newick = "((A[&rate=0.5,location1=1,location2=2]:1,B:1):1,C:2);";
    /// let mut parser = NewickParser::new().with_annotations();
    /// let tree = parser.parse_all(ByteParser::for_str(newick))?.remove(0);
    ///
    /// let names = AttributeNames::discover(&tree);
    /// let names: Vec<&str> = names.iter().map(|a| a.name.as_str()).collect();
    /// assert_eq!(names, ["height", "length", "rate", "location"]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn discover(tree: &CompactTree) -> Self {
        let mut attributes = vec![
            Attribute {
                name: String::from("height"),
                kind: AttributeKind::Height,
            },
            Attribute {
                name: String::from("length"),
                kind: AttributeKind::Length,
            },
        ];

        let annotations = tree.annotations();
        let keys = annotations.keys();
        for key in keys {
            if RESERVED_KEYS.contains(&key.as_str()) {
                debug!(key = %key, "Ignoring annotation with reserved name");
                continue;
            }
            if let Some(base) = key.strip_suffix('2')
                && annotations.contains_key(&format!("{base}1"))
            {
                continue;
            }

            let kind = if let Some(base) = key.strip_suffix('1')
                && annotations.contains_key(&format!("{base}2"))
            {
                Some((base.to_string(), AttributeKind::SplitPair(key.clone(), format!("{base}2"))))
            } else {
                let first = annotations
                    .get_all_for_key(key)
                    .and_then(|column| column.iter().flatten().next());
                match first {
                    Some(value @ AnnotationValue::Array(_)) => {
                        if SampleValue::pair_from_annotation(value).is_some() {
                            Some((key.clone(), AttributeKind::ArrayPair(key.clone())))
                        } else {
                            debug!(key = %key, "Skipping array-valued annotation");
                            None
                        }
                    }
                    _ => Some((key.clone(), AttributeKind::Annotation(key.clone()))),
                }
            };

            if let Some((name, kind)) = kind {
                attributes.push(Attribute { name, kind });
            }
        }

        AttributeNames { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Slot of the attribute called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Values of all attributes at `vertex` of `tree`.
    fn extract(&self, tree: &CompactTree, heights: &[f64], vertex: VertexIndex) -> AttributeTuple {
        let annotations = tree.annotations();
        self.attributes
            .iter()
            .map(|attribute| match &attribute.kind {
                AttributeKind::Height => Some(SampleValue::Number(heights[vertex])),
                AttributeKind::Length => tree[vertex]
                    .branch_length()
                    .map(|length| SampleValue::Number(*length)),
                AttributeKind::Annotation(key) => annotations
                    .get(key, vertex)
                    .and_then(SampleValue::from_annotation),
                AttributeKind::SplitPair(first, second) => {
                    let x = annotations.get(first, vertex)?.as_f64()?;
                    let y = annotations.get(second, vertex)?.as_f64()?;
                    Some(SampleValue::Pair(x, y))
                }
                AttributeKind::ArrayPair(key) => annotations
                    .get(key, vertex)
                    .and_then(SampleValue::pair_from_annotation),
            })
            .collect()
    }
}

// =#========================================================================#=
// ATTRIBUTE COLLECTOR
// =#========================================================================$=
/// Collects attribute samples for the clades of a target tree.
///
/// The internal registry is seeded with every clade of the target
/// (including tips), so only those clades are tracked. Seeding adds one
/// count per clade, which [finish](AttributeCollector::finish) removes
/// again before computing credibilities.
pub struct AttributeCollector {
    registry: CladeRegistry,
    names: AttributeNames,
    target: CompactTree,
    target_clades: Vec<BitsetClade>,
    ca_heights: Option<Vec<(f64, usize)>>,
}

impl AttributeCollector {
    /// Creates a collector for the clades of `target` over `num_taxa` taxa.
    ///
    /// With `collect_ca_heights`, additionally averages the height of the
    /// most recent common ancestor of each target clade's taxa.
    pub fn new(
        target: &CompactTree,
        names: AttributeNames,
        num_taxa: usize,
        collect_ca_heights: bool,
    ) -> Result<Self> {
        let mut registry = CladeRegistry::new(num_taxa);
        registry.add(target, true)?;
        let target_clades = vertex_clades(target, num_taxa)?;
        let ca_heights = collect_ca_heights.then(|| vec![(0.0, 0); target_clades.len()]);

        Ok(AttributeCollector {
            registry,
            names,
            target: target.clone(),
            target_clades,
            ca_heights,
        })
    }

    pub fn names(&self) -> &AttributeNames {
        &self.names
    }

    /// Records the attribute values at every vertex of `tree` whose clade
    /// is tracked.
    pub fn collect(&mut self, tree: &CompactTree) -> Result<()> {
        let clades = vertex_clades(tree, self.registry.num_taxa())?;
        let heights = tree.vertex_heights();

        for vertex in tree.post_order_iter() {
            let index = vertex.index();
            if let Some(clade) = self.registry.get_mut(&clades[index]) {
                clade.push_attribute_values(self.names.extract(tree, &heights, index));
                clade.increment();
            }
        }

        if let Some(ca_heights) = self.ca_heights.as_mut() {
            let leaf_of_taxon = leaf_vertices(tree, self.registry.num_taxa());
            let clades_and_sums = self.target_clades.iter().zip(ca_heights.iter_mut());
            for (target_clade, (sum, count)) in clades_and_sums {
                if let Some(mrca) = common_ancestor(tree, &clades, &leaf_of_taxon, target_clade) {
                    *sum += heights[mrca];
                    *count += 1;
                }
            }
        }
        Ok(())
    }

    /// Removes the seeding counts and computes credibilities over
    /// `total_trees_used` trees.
    pub fn finish(mut self, total_trees_used: usize) -> Result<CollectedClades> {
        self.registry.remove_clades(&self.target, true)?;
        self.registry
            .calculate_clade_credibilities(total_trees_used);

        let ca_heights = self.ca_heights.map(|sums| {
            self.target_clades
                .into_iter()
                .zip(sums)
                .filter(|(_, (_, count))| *count > 0)
                .map(|(clade, (sum, count))| (clade, sum / count as f64))
                .collect()
        });

        Ok(CollectedClades {
            registry: self.registry,
            names: self.names,
            ca_heights,
        })
    }
}

/// Vertex of the leaf of each taxon.
fn leaf_vertices(tree: &CompactTree, num_taxa: usize) -> Vec<Option<VertexIndex>> {
    let mut leaves = vec![None; num_taxa];
    for vertex in tree.vertices() {
        if let Some(&label) = vertex.label()
            && label < num_taxa
        {
            leaves[label] = Some(vertex.index());
        }
    }
    leaves
}

/// Walks up from a leaf of `target` to the first vertex whose clade covers
/// all of `target`.
fn common_ancestor(
    tree: &CompactTree,
    clades: &[BitsetClade],
    leaf_of_taxon: &[Option<VertexIndex>],
    target: &BitsetClade,
) -> Option<VertexIndex> {
    let first_taxon = target.taxa().next()?;
    let mut current = leaf_of_taxon.get(first_taxon).copied().flatten()?;
    while !clades[current].is_superset(target) {
        current = tree[current].parent()?;
    }
    Some(current)
}

// =#========================================================================#=
// COLLECTED CLADES
// =#========================================================================€=
/// Result of the attribute pass: credibilities and attribute samples of the
/// target's clades.
#[derive(Debug, Clone)]
pub struct CollectedClades {
    registry: CladeRegistry,
    names: AttributeNames,
    ca_heights: Option<HashMap<BitsetClade, f64>>,
}

impl CollectedClades {
    pub fn registry(&self) -> &CladeRegistry {
        &self.registry
    }

    pub fn names(&self) -> &AttributeNames {
        &self.names
    }

    pub fn num_taxa(&self) -> usize {
        self.registry.num_taxa()
    }

    pub fn clade(&self, clade: &BitsetClade) -> Option<&Clade> {
        self.registry.get(clade)
    }

    /// Mean height of the common ancestor of the clade's taxa, if common
    /// ancestor heights were collected.
    pub fn ca_height(&self, clade: &BitsetClade) -> Option<f64> {
        self.ca_heights.as_ref()?.get(clade).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::NewickParser;
    use crate::parser::ByteParser;

    fn parse(newick: &str) -> Vec<CompactTree> {
        NewickParser::new()
            .with_annotations()
            .parse_all(ByteParser::for_str(newick))
            .unwrap()
    }

    #[test]
    fn array_pairs_are_bivariate_and_other_arrays_skipped() {
        let trees = parse("((A[&loc={1.0,2.0},xs={1,2,3},flag=true]:1,B:1):1,C:2);");
        let names = AttributeNames::discover(&trees[0]);
        let loc = names.iter().find(|a| a.name == "loc").unwrap();

        assert!(loc.is_bivariate());
        assert_eq!(names.position("xs"), None);
        assert_eq!(names.position("flag"), Some(3));
    }

    #[test]
    fn reserved_keys_are_not_tracked() {
        let trees = parse("((A:1,B:1)[&posterior=0.9,height=7,rate=1]:1,C:2)[&posterior=1];");
        let names = AttributeNames::discover(&trees[0]);
        let names: Vec<&str> = names.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["height", "length", "rate"]);
    }

    #[test]
    fn multifurcating_target_collects_its_clades() {
        let sample = parse("((A:1,B:1):1,C:2,D:2); ((A:2,B:2):1,(C:1,D:1):2);");
        let target = &sample[0];
        let names = AttributeNames::discover(target);
        let mut collector = AttributeCollector::new(target, names, 4, true).unwrap();
        for tree in &sample {
            collector.collect(tree).unwrap();
        }
        let collected = collector.finish(2).unwrap();

        let clades = vertex_clades(target, 4).unwrap();
        let ab = target.root().children().unwrap()[0];
        let ab_clade = collected.clade(&clades[ab]).unwrap();
        assert_eq!(ab_clade.count(), 2);
        assert_eq!(ab_clade.credibility(), 1.0);
        assert_eq!(collected.ca_height(&clades[ab]), Some(1.5));
        // Root heights 2 and 3
        assert_eq!(collected.ca_height(&clades[target.root_index()]), Some(2.5));
        // Tips and the two internal vertices, no {C,D}
        assert_eq!(collected.registry().len(), 6);
    }

    #[test]
    fn collects_values_of_target_clades_only() {
        let sample = parse(
            "((A[&rate=1]:1,B[&rate=2]:1)[&rate=3]:1,C[&rate=4]:2); \
             ((A[&rate=5]:2,C[&rate=6]:2)[&rate=7]:1,B[&rate=8]:3);",
        );
        let target = &sample[0];
        let names = AttributeNames::discover(target);
        let mut collector = AttributeCollector::new(target, names, 3, false).unwrap();
        for tree in &sample {
            collector.collect(tree).unwrap();
        }
        let collected = collector.finish(2).unwrap();

        let clades = vertex_clades(target, 3).unwrap();
        let &[ab, _] = target.root().children().unwrap() else {
            panic!("expected two children")
        };
        let ab_clade = collected.clade(&clades[ab]).unwrap();
        assert_eq!(ab_clade.count(), 1);
        assert_eq!(ab_clade.credibility(), 0.5);
        assert_eq!(ab_clade.attribute_values().len(), 1);
        // height 1, length 1, rate 3
        assert_eq!(
            ab_clade.attribute_values()[0],
            vec![
                Some(SampleValue::Number(1.0)),
                Some(SampleValue::Number(1.0)),
                Some(SampleValue::Number(3.0))
            ]
        );

        let root_clade = collected.clade(&clades[target.root_index()]).unwrap();
        assert_eq!(root_clade.count(), 2);
        assert_eq!(root_clade.attribute_values()[1][1], None);
        // {A,C} was never seeded
        assert_eq!(collected.registry().len(), 5);
    }

    #[test]
    fn common_ancestor_height_of_unseen_clade() {
        let sample = parse("((A:1,B:1):1,C:2); ((A:3,C:3):1,B:4);");
        let target = &sample[0];
        let names = AttributeNames::discover(target);
        let mut collector = AttributeCollector::new(target, names, 3, true).unwrap();
        for tree in &sample {
            collector.collect(tree).unwrap();
        }
        let collected = collector.finish(2).unwrap();

        let clades = vertex_clades(target, 3).unwrap();
        let &[ab, _] = target.root().children().unwrap() else {
            panic!("expected two children")
        };
        // {A,B}: own vertex at height 1, then the root at height 4
        assert_eq!(collected.ca_height(&clades[ab]), Some(2.5));
        assert_eq!(collected.ca_height(&clades[target.root_index()]), Some(3.0));
    }
}
