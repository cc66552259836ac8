use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use treeannotator::clade::{CladeRegistry, ScoringCriterion, TreeScorer};
use treeannotator::model::CompactTree;
use treeannotator::newick::NewickParser;
use treeannotator::parser::byte_parser::ByteParser;
use treeannotator::summary::stats;
use treeannotator::summary::{ContourStrategy, KdeContourStrategy};

const NUM_TAXA: usize = 64;
const NUM_TREES: usize = 500;

/// Deterministic pseudo-random numbers in [0, 1).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Random binary tree by joining random pairs of subtrees.
fn random_newick(rng: &mut Lcg) -> String {
    let mut subtrees: Vec<String> = (0..NUM_TAXA).map(|i| format!("t{i}:0.1")).collect();
    while subtrees.len() > 1 {
        let a = subtrees.swap_remove((rng.next() * subtrees.len() as f64) as usize);
        let b = subtrees.swap_remove((rng.next() * subtrees.len() as f64) as usize);
        subtrees.push(format!("({a},{b}):0.1"));
    }
    format!("{};", subtrees[0].trim_end_matches(":0.1"))
}

fn sample_trees() -> Vec<CompactTree> {
    let mut rng = Lcg(7);
    let newick: String = (0..NUM_TREES)
        .map(|_| random_newick(&mut rng))
        .collect::<Vec<_>>()
        .join("\n");
    NewickParser::new()
        .parse_all(ByteParser::for_str(&newick))
        .unwrap()
}

fn count_clades(trees: &[CompactTree]) -> CladeRegistry {
    let mut registry = CladeRegistry::new(NUM_TAXA);
    for tree in trees {
        registry.add(tree, false).unwrap();
    }
    registry.calculate_clade_credibilities(trees.len());
    registry
}

fn clade_counting(c: &mut Criterion) {
    let trees = sample_trees();
    c.bench_function("count_clades", |b| {
        b.iter(|| count_clades(black_box(&trees)));
    });
}

fn tree_scoring(c: &mut Criterion) {
    let trees = sample_trees();
    let registry = count_clades(&trees);
    for criterion in [
        ScoringCriterion::MaxCladeCredibility,
        ScoringCriterion::MaxSumCladeCredibility,
    ] {
        let scorer = TreeScorer::new(&registry, criterion);
        c.bench_function(&format!("score_{criterion}"), |b| {
            b.iter(|| {
                trees
                    .iter()
                    .map(|tree| scorer.score(tree).unwrap())
                    .fold(f64::NEG_INFINITY, f64::max)
            });
        });
    }
}

fn hpd_intervals(c: &mut Criterion) {
    let mut rng = Lcg(11);
    let values: Vec<f64> = (0..10_000).map(|_| rng.next() + rng.next()).collect();
    c.bench_function("hpd_interval_10k", |b| {
        b.iter(|| stats::hpd_interval(black_box(&values), 0.95));
    });
}

fn hpd_contours(c: &mut Criterion) {
    let mut rng = Lcg(13);
    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..2_000)
        .map(|i| {
            let shift = if i % 2 == 0 { 0.0 } else { 3.0 };
            (rng.next() + shift, rng.next() + rng.next())
        })
        .unzip();
    let strategy = KdeContourStrategy::default();
    c.bench_function("hpd_contours_2k", |b| {
        b.iter(|| strategy.hpd_contours(black_box(&xs), black_box(&ys), 0.8));
    });
}

criterion_group!(clades, clade_counting, tree_scoring);
criterion_group! {
    name = summaries;
    config = Criterion::default().sample_size(20);
    targets = hpd_intervals, hpd_contours
}
criterion_main!(clades, summaries);
