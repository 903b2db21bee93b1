#![cfg(test)]

use std::{env, fs, sync::Arc, thread};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::{EngineConfig, NestingConfig},
    engine::LinearAlgebraEngine,
    expression::{ComputationNode, Operator, parser, writer},
};

const TOLERANCE: f64 = 1e-9;

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.random_range(-10.0..10.0)).collect())
        .collect()
}

fn naive_add(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.iter().zip(y).map(|(x, y)| x + y).collect())
        .collect()
}

fn naive_multiply(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = b.first().map_or(0, Vec::len);

    a.iter()
        .map(|row| {
            (0..cols)
                .map(|j| row.iter().zip(b).map(|(x, b_row)| x * b_row[j]).sum())
                .collect()
        })
        .collect()
}

fn assert_close(got: &[Vec<f64>], expected: &[Vec<f64>]) {
    assert_eq!(got.len(), expected.len());

    for (got, expected) in got.iter().zip(expected) {
        assert_eq!(got.len(), expected.len());

        for (x, y) in got.iter().zip(expected) {
            assert!((x - y).abs() < TOLERANCE, "{x} != {y}");
        }
    }
}

fn leaf(data: Vec<Vec<f64>>) -> ComputationNode {
    ComputationNode::matrix(data)
}

fn engine(threads: usize) -> LinearAlgebraEngine {
    LinearAlgebraEngine::from_config(&EngineConfig::new(threads).with_seed(42)).unwrap()
}

fn evaluate(engine: &LinearAlgebraEngine, root: ComputationNode) -> Vec<Vec<f64>> {
    engine.run(root).unwrap().into_matrix().unwrap()
}

#[test]
fn add_matches_naive_sum() {
    let mut rng = StdRng::seed_from_u64(1);
    let a = random_matrix(&mut rng, 17, 9);
    let b = random_matrix(&mut rng, 17, 9);

    let root = ComputationNode::operation(Operator::Add, vec![leaf(a.clone()), leaf(b.clone())]);
    assert_close(&evaluate(&engine(4), root), &naive_add(&a, &b));
}

#[test]
fn multiply_matches_naive_product() {
    let mut rng = StdRng::seed_from_u64(2);
    let a = random_matrix(&mut rng, 12, 7);
    let b = random_matrix(&mut rng, 7, 5);

    let root = ComputationNode::operation(Operator::Multiply, vec![leaf(a.clone()), leaf(b.clone())]);
    let result = evaluate(&engine(4), root);

    assert_eq!((result.len(), result[0].len()), (12, 5));
    assert_close(&result, &naive_multiply(&a, &b));
}

#[test]
fn multiply_by_a_matrix_without_columns() {
    let root = parser::parse_str(r#"{"operator": "*", "operands": [[[1, 2], [3, 4], [5, 6]], [[], []]]}"#).unwrap();
    let result = evaluate(&engine(2), root);

    assert_eq!(result, vec![Vec::<f64>::new(); 3]);
}

#[test]
fn double_negation_is_identity() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_matrix(&mut rng, 6, 4);

    let root = ComputationNode::operation(
        Operator::Negate,
        vec![ComputationNode::operation(Operator::Negate, vec![leaf(a.clone())])],
    );

    assert_eq!(evaluate(&engine(2), root), a);
}

#[test]
fn transpose_swaps_dimensions_and_twice_is_identity() {
    let mut rng = StdRng::seed_from_u64(4);
    let a = random_matrix(&mut rng, 3, 8);
    let engine = engine(3);

    let once = evaluate(&engine, ComputationNode::operation(Operator::Transpose, vec![leaf(a.clone())]));
    assert_eq!((once.len(), once[0].len()), (8, 3));
    assert_eq!(once[5][2], a[2][5]);

    let twice = evaluate(
        &engine,
        ComputationNode::operation(
            Operator::Transpose,
            vec![ComputationNode::operation(Operator::Transpose, vec![leaf(a.clone())])],
        ),
    );
    assert_eq!(twice, a);
}

#[test]
fn nary_add_matches_nested_binary_add_under_every_nesting() {
    let mut rng = StdRng::seed_from_u64(5);
    let (a, b, c) = (
        random_matrix(&mut rng, 4, 4),
        random_matrix(&mut rng, 4, 4),
        random_matrix(&mut rng, 4, 4),
    );

    let nested = ComputationNode::operation(
        Operator::Add,
        vec![
            ComputationNode::operation(Operator::Add, vec![leaf(a.clone()), leaf(b.clone())]),
            leaf(c.clone()),
        ],
    );
    let expected = evaluate(&engine(2), nested);

    for nesting in [NestingConfig::LeftLeaning, NestingConfig::Balanced] {
        let config = EngineConfig::new(2).with_seed(7).with_nesting(nesting);
        let engine = LinearAlgebraEngine::from_config(&config).unwrap();

        let flat = ComputationNode::operation(
            Operator::Add,
            vec![leaf(a.clone()), leaf(b.clone()), leaf(c.clone())],
        );
        assert_close(&evaluate(&engine, flat), &expected);
    }
}

#[test]
fn nary_multiply_of_rectangular_chain() {
    let mut rng = StdRng::seed_from_u64(6);
    let a = random_matrix(&mut rng, 2, 3);
    let b = random_matrix(&mut rng, 3, 4);
    let c = random_matrix(&mut rng, 4, 5);

    let expected = naive_multiply(&naive_multiply(&a, &b), &c);

    for nesting in [NestingConfig::LeftLeaning, NestingConfig::Balanced] {
        let config = EngineConfig::new(3).with_seed(8).with_nesting(nesting);
        let engine = LinearAlgebraEngine::from_config(&config).unwrap();

        let root = ComputationNode::operation(
            Operator::Multiply,
            vec![leaf(a.clone()), leaf(b.clone()), leaf(c.clone())],
        );
        assert_close(&evaluate(&engine, root), &expected);
    }
}

#[test]
fn shared_engine_evaluates_concurrent_trees() {
    const CALLERS: usize = 4;
    const ROUNDS: usize = 10;

    let engine = Arc::new(engine(4));

    let handles: Vec<_> = (0..CALLERS)
        .map(|caller| {
            let engine = Arc::clone(&engine);

            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + caller as u64);

                for _ in 0..ROUNDS {
                    let a = random_matrix(&mut rng, 8, 6);
                    let b = random_matrix(&mut rng, 8, 6);
                    let c = random_matrix(&mut rng, 6, 5);

                    let root = ComputationNode::operation(
                        Operator::Multiply,
                        vec![
                            ComputationNode::operation(
                                Operator::Add,
                                vec![leaf(a.clone()), leaf(b.clone())],
                            ),
                            leaf(c.clone()),
                        ],
                    );

                    let expected = naive_multiply(&naive_add(&a, &b), &c);
                    assert_close(&evaluate(&engine, root), &expected);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let report = engine.worker_report();
    let tasks: u64 = report.iter().map(|stats| stats.tasks).sum();

    // Eight add rows plus eight multiply rows per round.
    assert_eq!(tasks, (CALLERS * ROUNDS * 16) as u64);
    assert_eq!(engine.executor().in_flight(), 0);
}

#[test]
fn parse_run_and_write_round_trip() {
    let dir = env::temp_dir().join(format!("lae-round-trip-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let (input, output) = (dir.join("input.json"), dir.join("output.json"));

    fs::write(
        &input,
        r#"{"operator": "*", "operands": [
            [[1, 2], [3, 4]],
            {"operator": "T", "operands": [[[1, 0], [1, 1]]]}
        ]}"#,
    )
    .unwrap();

    let root = parser::parse_file(&input).unwrap();
    let result = evaluate(&engine(2), root);
    writer::write_result(&output, &result).unwrap();

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({ "result": [[1.0, 3.0], [3.0, 7.0]] }));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn evaluation_errors_are_written_as_messages() {
    let dir = env::temp_dir().join(format!("lae-error-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let output = dir.join("output.json");

    let root = parser::parse_str(r#"{"operator": "+", "operands": [[[1, 2]], [[1], [2]]]}"#).unwrap();
    let err = engine(2).run(root).unwrap_err();
    writer::write_error(&output, &err.to_string()).unwrap();

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let message = written["error"].as_str().unwrap();
    assert!(message.starts_with("Illegal operation: dimensions mismatch"));

    fs::remove_dir_all(&dir).unwrap();
}
