use std::path::{Path, PathBuf};
use tempfile::tempdir;
use treeannotator::clade::{BitsetClade, ScoringCriterion, vertex_clades};
use treeannotator::error::AnnotatorError;
use treeannotator::model::{AnnotationValue, CompactTree, LeafLabelMap, VertexIndex};
use treeannotator::newick::{NewickStyle, to_annotated_newick, to_newick};
use treeannotator::nexus::Burnin;
use treeannotator::parse_nexus_file;
use treeannotator::pipeline::{
    AnnotatedTree, AnnotatorConfig, HeightsSummary, TargetOption, TreeAnnotator,
};

const EPS: f64 = 1e-9;

fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

fn sample_config() -> AnnotatorConfig {
    AnnotatorConfig::new(fixture("kiwi_t5_n4.trees")).with_burnin(Burnin::Count(1))
}

fn annotate(config: AnnotatorConfig) -> AnnotatedTree {
    TreeAnnotator::new(config).unwrap().annotate().unwrap()
}

/// Vertex of `tree` whose clade is exactly `taxa`.
fn vertex_of(tree: &CompactTree, labels: &LeafLabelMap, taxa: &[&str]) -> VertexIndex {
    let n = labels.num_labels();
    let wanted = taxa
        .iter()
        .map(|taxon| BitsetClade::singleton(n, labels.get_index(taxon).unwrap()))
        .reduce(|a, b| a.union(&b))
        .unwrap();
    vertex_clades(tree, n)
        .unwrap()
        .iter()
        .position(|clade| *clade == wanted)
        .unwrap()
}

fn number(annotated: &AnnotatedTree, key: &str, vertex: VertexIndex) -> f64 {
    annotated
        .tree
        .annotations()
        .get(key, vertex)
        .and_then(AnnotationValue::as_f64)
        .unwrap()
}

const CD: &[&str] = &["Apteryx_owenii", "Dinornis_robustus"];
const AB: &[&str] = &["Apteryx_australis", "Apteryx_haastii"];

#[test]
fn test_mcc_tree_with_median_heights() {
    let annotated = annotate(sample_config());
    let tree = &annotated.tree;

    assert_eq!(annotated.num_trees, 4);
    // First of the three trees with {A,B}: 1 and {C,D}: 3/4
    assert!((annotated.target_score.unwrap() - 0.75f64.ln()).abs() < EPS);
    assert_eq!(
        to_newick(&NewickStyle::Label, tree, Some(&annotated.labels)),
        "((Apteryx_australis:1.25,Apteryx_haastii:1.25):1.75,(Apteryx_owenii:1,Dinornis_robustus:1):2);"
    );
    assert_eq!(annotated.report.num_annotated, tree.num_vertices());
    assert_eq!(annotated.report.num_filtered, 0);
    assert_eq!(annotated.report.num_clamped, 0);

    let root = tree.root_index();
    let ab = vertex_of(tree, &annotated.labels, AB);
    let cd = vertex_of(tree, &annotated.labels, CD);
    assert_eq!(number(&annotated, "posterior", root), 1.0);
    assert_eq!(number(&annotated, "posterior", ab), 1.0);
    assert!((number(&annotated, "posterior", cd) - 0.75).abs() < EPS);
    assert!((number(&annotated, "height", cd) - 2.5 / 3.0).abs() < EPS);
    assert_eq!(number(&annotated, "height_median", cd), 1.0);
    assert_eq!(
        tree.annotations().get("height_range", root),
        Some(&AnnotationValue::from(vec![2.0, 4.0]))
    );
}

#[test]
fn test_leaves_get_statistics_but_no_posterior() {
    let annotated = annotate(sample_config());
    let tree = &annotated.tree;
    let a = vertex_of(tree, &annotated.labels, &["Apteryx_australis"]);

    assert_eq!(tree.annotations().get("posterior", a), None);
    assert!((number(&annotated, "rate", a) - 1.0).abs() < EPS);
    assert_eq!(
        tree.annotations().get("rate_range", a),
        Some(&AnnotationValue::from(vec![0.8, 1.2]))
    );
    // Leaf heights are all zero, so only the mean is written
    assert_eq!(number(&annotated, "height", a), 0.0);
    assert_eq!(tree.annotations().get("height_median", a), None);
}

#[test]
fn test_constant_values_only_get_a_mean() {
    let annotated = annotate(sample_config());
    let ab = vertex_of(&annotated.tree, &annotated.labels, AB);
    assert_eq!(number(&annotated, "rate", ab), 2.0);
    assert_eq!(annotated.tree.annotations().get("rate_range", ab), None);
    assert_eq!(annotated.tree.annotations().get("rate_95%_HPD", ab), None);
}

#[test]
fn test_discrete_trait_mode() {
    let annotated = annotate(sample_config());
    let annotations = annotated.tree.annotations();
    let cd = vertex_of(&annotated.tree, &annotated.labels, CD);

    // [north, north, south]
    assert_eq!(annotations.get("state", cd), Some(&AnnotationValue::from("north")));
    assert!((number(&annotated, "state.prob", cd) - 2.0 / 3.0).abs() < EPS);
    assert_eq!(
        annotations.get("state.set", cd),
        Some(&AnnotationValue::Array(vec!["north".into(), "south".into()]))
    );

    let root = annotated.tree.root_index();
    assert_eq!(annotations.get("state", root), Some(&AnnotationValue::from("north")));
    assert_eq!(number(&annotated, "state.prob", root), 1.0);
}

#[test]
fn test_keep_heights_leaves_branch_lengths() {
    let annotated = annotate(sample_config().with_heights(HeightsSummary::Keep));
    assert_eq!(
        to_newick(&NewickStyle::Label, &annotated.tree, Some(&annotated.labels)),
        "((Apteryx_australis:1,Apteryx_haastii:1):1,(Apteryx_owenii:0.5,Dinornis_robustus:0.5):1.5);"
    );
    let root = annotated.tree.root_index();
    assert_eq!(number(&annotated, "posterior", root), 1.0);
}

#[test]
fn test_mean_heights() {
    let annotated = annotate(sample_config().with_heights(HeightsSummary::Mean));
    let heights = annotated.tree.vertex_heights();
    let ab = vertex_of(&annotated.tree, &annotated.labels, AB);
    let cd = vertex_of(&annotated.tree, &annotated.labels, CD);

    assert!((heights[annotated.tree.root_index()] - 3.0).abs() < EPS);
    assert!((heights[ab] - 1.375).abs() < EPS);
    assert!((heights[cd] - 2.5 / 3.0).abs() < EPS);
}

#[test]
fn test_common_ancestor_heights() {
    let annotated = annotate(sample_config().with_heights(HeightsSummary::CommonAncestor));
    let heights = annotated.tree.vertex_heights();
    let cd = vertex_of(&annotated.tree, &annotated.labels, CD);

    // 0.5, 1 and 1 where {C,D} is a clade, 3 at the root of the last tree
    assert!((heights[cd] - 1.375).abs() < EPS);
    assert!((heights[annotated.tree.root_index()] - 3.0).abs() < EPS);
}

#[test]
fn test_posterior_limit_filters_statistics() {
    let annotated = annotate(sample_config().with_posterior_limit(0.8));
    let cd = vertex_of(&annotated.tree, &annotated.labels, CD);

    assert_eq!(annotated.report.num_filtered, 1);
    assert!((number(&annotated, "posterior", cd) - 0.75).abs() < EPS);
    assert_eq!(annotated.tree.annotations().get("state", cd), None);
    assert_eq!(annotated.tree.annotations().get("rate", cd), None);
}

#[test]
fn test_sum_criterion_picks_same_tree() {
    let mcc = annotate(sample_config());
    let msc = annotate(sample_config().with_target(TargetOption::Select(
        ScoringCriterion::MaxSumCladeCredibility,
    )));
    // {A,B}: 1, {C,D}: 3/4, root: 1
    assert!((msc.target_score.unwrap() - 2.75).abs() < EPS);
    assert_eq!(
        to_newick(&NewickStyle::Label, &mcc.tree, Some(&mcc.labels)),
        to_newick(&NewickStyle::Label, &msc.tree, Some(&msc.labels))
    );
}

#[test]
fn test_newick_sample_matches_nexus_sample() {
    let from_nexus = annotate(sample_config());
    let newick_config =
        AnnotatorConfig::new(fixture("kiwi_t5_n4.nwk")).with_burnin(Burnin::Count(1));
    let from_newick = annotate(newick_config);

    assert_eq!(from_newick.num_trees, 4);
    assert_eq!(
        to_newick(&NewickStyle::Label, &from_nexus.tree, Some(&from_nexus.labels)),
        to_newick(&NewickStyle::Label, &from_newick.tree, Some(&from_newick.labels))
    );
}

#[test]
fn test_buffered_reading_gives_same_result() {
    use treeannotator::nexus::ReadStrategy;

    let in_memory = annotate(sample_config().with_read_strategy(ReadStrategy::InMemory));
    let buffered = annotate(sample_config().with_read_strategy(ReadStrategy::Buffered));
    assert_eq!(
        to_annotated_newick(&NewickStyle::ZeroIndexed, &in_memory.tree, None),
        to_annotated_newick(&NewickStyle::ZeroIndexed, &buffered.tree, None)
    );
}

#[test]
fn test_user_target_tree() {
    let annotated = annotate(
        sample_config().with_target(TargetOption::UserTree(fixture("kiwi_target.nwk"))),
    );
    assert_eq!(annotated.target_score, None);
    assert_eq!(
        to_newick(&NewickStyle::Label, &annotated.tree, Some(&annotated.labels)),
        "((Apteryx_owenii:1,Dinornis_robustus:1):2,(Apteryx_australis:1.25,Apteryx_haastii:1.25):1.75);"
    );
    let cd = vertex_of(&annotated.tree, &annotated.labels, CD);
    assert!((number(&annotated, "posterior", cd) - 0.75).abs() < EPS);
}

#[test]
fn test_multifurcating_user_target() {
    let annotated = annotate(
        sample_config().with_target(TargetOption::UserTree(fixture("kiwi_polytomy_target.nwk"))),
    );
    let tree = &annotated.tree;
    // Median heights: {A,B} of 1, 1, 1.5, 2 and root of 2, 3, 3, 4
    assert_eq!(
        to_newick(&NewickStyle::Label, tree, Some(&annotated.labels)),
        "((Apteryx_australis:1.25,Apteryx_haastii:1.25):1.75,Apteryx_owenii:3,Dinornis_robustus:3);"
    );
    assert_eq!(tree.root().children().map(<[_]>::len), Some(3));

    let ab = vertex_of(tree, &annotated.labels, AB);
    assert_eq!(number(&annotated, "posterior", tree.root_index()), 1.0);
    assert_eq!(number(&annotated, "posterior", ab), 1.0);
    assert_eq!(number(&annotated, "rate", ab), 2.0);
}

#[test]
fn test_unrooted_sample_with_three_root_children() {
    let annotated = annotate(
        AnnotatorConfig::new(fixture("moa_unrooted.t")).with_heights(HeightsSummary::Keep),
    );
    let tree = &annotated.tree;

    assert_eq!(annotated.num_trees, 3);
    // Root and {C,D,E} in every tree, {C,D} in two of three
    assert!((annotated.target_score.unwrap() - (2.0f64 / 3.0).ln()).abs() < EPS);
    assert_eq!(tree.name().map(String::as_str), Some("gen.1000"));
    assert_eq!(
        to_newick(&NewickStyle::Label, tree, Some(&annotated.labels)),
        "(Anomalopteryx_didiformis:0.1,Megalapteryx_didinus:0.1,\
         ((Dinornis_robustus:0.1,Dinornis_novaezealandiae:0.1):0.1,Pachyornis_elephantopus:0.2):0.1);"
    );

    let dinornis = vertex_of(
        tree,
        &annotated.labels,
        &["Dinornis_robustus", "Dinornis_novaezealandiae"],
    );
    let cde = vertex_of(
        tree,
        &annotated.labels,
        &["Dinornis_robustus", "Dinornis_novaezealandiae", "Pachyornis_elephantopus"],
    );
    assert!((number(&annotated, "posterior", dinornis) - 2.0 / 3.0).abs() < EPS);
    assert_eq!(number(&annotated, "posterior", cde), 1.0);
    assert_eq!(number(&annotated, "posterior", tree.root_index()), 1.0);
}

#[test]
fn test_user_target_with_unknown_taxon() {
    let target = TargetOption::UserTree(fixture("kiwi_foreign_target.nwk"));
    let config = sample_config().with_target(target);
    let result = TreeAnnotator::new(config).unwrap().annotate();
    assert!(matches!(
        result,
        Err(AnnotatorError::UnknownTaxon(label)) if label == "Dinornis_giganteus"
    ));
}

#[test]
fn test_run_writes_nexus_that_parses_again() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("kiwi.mcc.tree");
    TreeAnnotator::new(sample_config().with_output(&output))
        .unwrap()
        .run()
        .unwrap();

    let (trees, labels) = parse_nexus_file(&output).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(labels.num_labels(), 4);
    let tree = &trees[0];
    let cd = vertex_of(tree, &labels, CD);
    let posterior = tree.annotations().get("posterior", cd).and_then(AnnotationValue::as_f64);
    assert_eq!(posterior, Some(0.75));
    assert_eq!(
        tree.annotations().get("state", cd),
        Some(&AnnotationValue::from("north"))
    );
}

#[test]
fn test_reruns_are_identical() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.tree");
    let second = dir.path().join("second.tree");
    for output in [&first, &second] {
        TreeAnnotator::new(sample_config().with_output(output))
            .unwrap()
            .run()
            .unwrap();
    }
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_burnin_of_all_trees_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("none.tree");
    let config = sample_config()
        .with_burnin(Burnin::Count(5))
        .with_output(&output);

    let result = TreeAnnotator::new(config).unwrap().run();
    assert!(matches!(
        result,
        Err(AnnotatorError::NoTreesAfterBurnin { burnin: 5, total: 5 })
    ));
    assert!(!output.exists());
}

#[test]
fn test_failed_run_keeps_existing_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("previous.tree");
    std::fs::write(&output, "#NEXUS\n[previous run]\n").unwrap();
    let config = sample_config()
        .with_burnin(Burnin::Count(5))
        .with_output(&output);

    assert!(TreeAnnotator::new(config).unwrap().run().is_err());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "#NEXUS\n[previous run]\n"
    );
}

#[test]
fn test_rerun_replaces_output_without_leftovers() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("kiwi.mcc.tree");
    std::fs::write(&output, "stale").unwrap();

    TreeAnnotator::new(sample_config().with_output(&output))
        .unwrap()
        .run()
        .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("#NEXUS"));
    assert!(!text.contains("stale"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_missing_input_is_io_error() {
    let result = TreeAnnotator::new(AnnotatorConfig::new(fixture("no_such_file.trees")))
        .unwrap()
        .annotate();
    assert!(result.is_err());
}
