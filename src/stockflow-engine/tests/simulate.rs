// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::error::Error;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use stockflow_engine::{Category, File, InitOrder, Results, SimSpecs, Simulation, check};

static TEST_MODELS: &[&str] = &[
    "tests/models/bathtub",
    "tests/models/population",
    "tests/models/chained_initialization",
    "tests/models/lagged_variables",
];

fn model_dir(dir: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(dir)
}

fn load_model(dir: &str) -> File {
    let f = fs::File::open(model_dir(dir).join("model.json")).unwrap();
    File::from_reader(BufReader::new(f)).unwrap()
}

/// Expected results are tab separated: a `step` column, then one column per
/// stock and variable.
fn load_expected(dir: &str) -> Result<(Vec<String>, Vec<Vec<i64>>), Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(model_dir(dir).join("output.tab"))?;

    let header: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| field.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    Ok((header, rows))
}

fn ensure_results(expected: &(Vec<String>, Vec<Vec<i64>>), results: &Results) {
    let (header, rows) = expected;
    assert_eq!("step", header[0]);
    assert_eq!(&header[1..], results.columns.as_slice());
    assert_eq!(rows.len(), results.step_count());

    for (i, (row, snapshot)) in rows.iter().zip(results.iter()).enumerate() {
        assert_eq!(i as i64 + 1, row[0]);
        for (column, expected) in header[1..].iter().zip(row[1..].iter()) {
            assert_eq!(
                Some(expected),
                snapshot.get(column),
                "step {} column {column}",
                i + 1
            );
        }
    }
}

fn simulate_path(dir: &str) {
    eprintln!("model: {dir}");
    let file = load_model(dir);
    let project = &file.projects[0];
    let model = file.model(project.id).unwrap();
    let specs = file.sim_specs.clone().unwrap_or_default();

    assert!(check(&model).is_empty(), "{dir} has lint findings");

    let sim = Simulation::new(&model.stocks, &model.variables, &model.flows);
    let results = sim.run(&specs).unwrap();
    let expected = load_expected(dir).unwrap();
    ensure_results(&expected, &results);

    // the TSV writer produces exactly the fixture
    let mut out: Vec<u8> = Vec::new();
    results.write_tsv(&mut out).unwrap();
    let fixture = fs::read_to_string(model_dir(dir).join("output.tab")).unwrap();
    assert_eq!(fixture, String::from_utf8(out).unwrap());

    // a second run over the same inputs is identical
    assert_eq!(results, sim.run(&specs).unwrap());
}

#[test]
fn simulates_models_correctly() {
    for &dir in TEST_MODELS.iter() {
        simulate_path(dir);
    }
}

#[test]
fn declared_order_reads_zero_for_forward_references() {
    let file = load_model("tests/models/chained_initialization");
    let model = file.model(1).unwrap();
    let specs = SimSpecs {
        steps: 1,
        init_order: InitOrder::Declared,
    };
    let results = Simulation::new(&model.stocks, &model.variables, &model.flows)
        .run(&specs)
        .unwrap();
    // a sees b before b is computed, b sees c before c is computed
    assert_eq!(Some(vec![0]), results.series("a"));
    assert_eq!(Some(vec![1]), results.series("b"));
    assert_eq!(Some(vec![4]), results.series("c"));
    assert_eq!(Some(vec![5]), results.series("total"));
}

#[test]
fn failing_model_aborts() {
    let json = r#"{
        "projects": [{"id": 1, "name": "broken"}],
        "stocks": [{"id": 1, "name": "tank", "initial_value": "30", "project_id": 1}],
        "variables": [{"id": 1, "name": "ratio", "equation": "60 / [tank]", "project_id": 1}],
        "flows": [{"id": 1, "name": "drain", "equation": "10", "from_stock": 1}]
    }"#;
    let file = File::from_reader(json.as_bytes()).unwrap();
    let model = file.model(1).unwrap();
    let sim = Simulation::new(&model.stocks, &model.variables, &model.flows);

    assert!(sim.run(&SimSpecs::new(3)).is_ok());
    let err = sim.run(&SimSpecs::new(4)).unwrap_err();
    assert_eq!(Category::DivisionByZero, err.category());
    assert!(err.to_string().contains("variable 'ratio'"));
}
