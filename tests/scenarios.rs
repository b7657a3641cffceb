//! End-to-end scenarios: vectors in, coordinates and tree edges out.

use carta::distance::jaccard_similarity;
use carta::{
    build_graph, layout, layout_from_forest, ForestParams, LayoutConfiguration, LshForest,
    MinHash, MinHashParams, Pipeline,
};
use rand::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn index(vectors: &[Vec<u8>], d: usize, l: usize) -> LshForest {
    let mh = MinHash::new(vectors[0].len(), d).expect("encoder");
    let sigs = mh.encode_all(vectors).expect("encode");
    let mut forest = LshForest::new(ForestParams {
        signature_len: d,
        num_tables: l,
        ..Default::default()
    })
    .expect("forest");
    forest.add_batch(&sigs).expect("add");
    forest.build_index().expect("index");
    forest
}

fn dist(res: &carta::LayoutResult, a: usize, b: usize) -> f32 {
    res.distance(a, b).expect("node in range")
}

fn random_sets(n: usize, dim: usize, density: f64, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| u8::from(rng.random_bool(density))).collect())
        .collect()
}

// =============================================================================
// Two pairs
// =============================================================================

#[test]
fn two_pairs_link_within_and_separate_between() {
    init_tracing();
    let vectors = vec![
        vec![1u8, 1, 0, 0],
        vec![1, 1, 0, 1],
        vec![0, 0, 1, 1],
        vec![0, 0, 1, 0],
    ];
    let forest = index(&vectors, 256, 16);

    let graph = build_graph(&forest, 1).expect("graph");
    assert!(graph.edge_weight(0, 1).is_some());
    assert!(graph.edge_weight(2, 3).is_some());
    assert!(graph.edge_weight(0, 3).is_none());
    assert!(graph.edge_weight(0, 2).is_none());
    assert_eq!(graph.num_components(), 2);

    let res = layout(&graph, &LayoutConfiguration::default()).expect("layout");
    assert_eq!(res.len(), 4);

    let within = dist(&res, 0, 1).max(dist(&res, 2, 3));
    let between = [(0, 2), (0, 3), (1, 2), (1, 3)]
        .iter()
        .map(|&(a, b)| dist(&res, a, b))
        .fold(f32::INFINITY, f32::min);
    assert!(
        between > within,
        "pairs overlap: within {within}, between {between}"
    );
}

// =============================================================================
// Degenerate datasets
// =============================================================================

#[test]
fn single_item_dataset() {
    let pipeline = Pipeline::new(
        MinHashParams::default(),
        ForestParams::default(),
        LayoutConfiguration::default(),
    )
    .expect("pipeline");

    let res = pipeline.run(&[vec![1u8, 0, 1, 1]]).expect("run");
    assert_eq!(res.len(), 1);
    assert!(res.sources.is_empty());
    assert!(res.targets.is_empty());
    assert_eq!(res.position(0), Some((0.0, 0.0)));
}

#[test]
fn identical_vectors_form_one_zero_weight_tree() {
    let vectors = vec![vec![1u8, 0, 1, 1, 0, 0, 1, 0]; 5];
    let forest = index(&vectors, 128, 8);

    for a in 0..5 {
        for b in 0..5 {
            assert_eq!(forest.distance(a, b).expect("distance"), 0.0);
        }
    }

    let res = layout_from_forest(&forest, &LayoutConfiguration::default()).expect("layout");
    assert_eq!(res.sources.len(), 4);
    assert_eq!(res.properties.connected_components, 1);
    assert_eq!(res.properties.mst_weight, 0.0);
    assert!(res.x.iter().chain(&res.y).all(|v| v.is_finite()));
}

// =============================================================================
// Graph and tree shape
// =============================================================================

#[test]
fn full_k_gives_complete_graph() {
    let vectors = random_sets(15, 64, 0.3, 7);
    let forest = index(&vectors, 128, 8);
    let graph = build_graph(&forest, 14).expect("graph");
    assert_eq!(graph.num_edges(), 15 * 14 / 2);
}

#[test]
fn spanning_forest_has_n_minus_c_edges() {
    // Three disjoint blocks of active positions; k = 2 keeps each block to itself.
    let vectors: Vec<Vec<u8>> = (0..9)
        .map(|i| {
            let block = i / 3;
            (0..48)
                .map(|j| u8::from(j / 16 == block && (j % 16 != i % 3)))
                .collect()
        })
        .collect();
    let forest = index(&vectors, 128, 8);
    let graph = build_graph(&forest, 2).expect("graph");
    let components = graph.num_components();
    assert_eq!(components, 3);

    let res = layout(&graph, &LayoutConfiguration::default()).expect("layout");
    assert_eq!(res.sources.len(), 9 - components);
    assert_eq!(res.properties.connected_components, components);
}

#[test]
fn same_seed_reproduces_layout() {
    init_tracing();
    let vectors = random_sets(40, 96, 0.2, 3);
    let pipeline = Pipeline::new(
        MinHashParams { num_hashes: 64, seed: 9 },
        ForestParams { signature_len: 64, num_tables: 8, ..Default::default() },
        LayoutConfiguration { k: 4, iterations: 300, ..Default::default() },
    )
    .expect("pipeline");

    let a = pipeline.run(&vectors).expect("first");
    let b = pipeline.run(&vectors).expect("second");
    assert_eq!(a.len(), 40);
    assert_eq!(a.x, b.x);
    assert_eq!(a.y, b.y);
    assert_eq!(a.sources, b.sources);
    assert_eq!(a.targets, b.targets);
}

// =============================================================================
// Estimator accuracy
// =============================================================================

#[test]
fn long_signatures_estimate_jaccard() {
    let mh = MinHash::with_seed(2000, 1024, 17).expect("encoder");
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..5 {
        let a: Vec<u8> = (0..2000).map(|_| u8::from(rng.random_bool(0.3))).collect();
        // Keep most of a, add some fresh positions.
        let b: Vec<u8> = a
            .iter()
            .map(|&x| {
                if x == 1 {
                    u8::from(rng.random_bool(0.7))
                } else {
                    u8::from(rng.random_bool(0.1))
                }
            })
            .collect();

        let truth = jaccard_similarity(&a, &b);
        let sa = mh.from_binary(&a).expect("a");
        let sb = mh.from_binary(&b).expect("b");
        let est = sa.jaccard(&sb);
        assert!(
            (est - truth).abs() < 0.05,
            "estimate {est} too far from {truth}"
        );
    }
}
