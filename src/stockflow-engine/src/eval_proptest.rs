// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the evaluator and the stepper.
//!
//! These tests verify that:
//! 1. Bracket-free expressions evaluate exactly as checked integer arithmetic
//! 2. A bracket token behaves exactly like the text of its value
//! 3. Runs are repeatable and flows between stocks conserve their total

use proptest::prelude::*;

use crate::common::{Category, EquationResult};
use crate::datamodel::{Flow, Stock};
use crate::eval::{ValueTable, evaluate, substitute};
use crate::sim::simulate;

/// A small arithmetic expression alongside the value checked `i64`
/// arithmetic gives it, or `None` for a division by zero or an overflow.
#[derive(Clone, Debug)]
struct Arith {
    text: String,
    value: Option<i64>,
}

fn literal_strategy() -> impl Strategy<Value = Arith> {
    prop_oneof![
        (0i64..1000),
        Just(0i64),
        Just(i64::MAX),
    ]
    .prop_map(|n| Arith {
        text: n.to_string(),
        value: Some(n),
    })
}

fn arith_strategy() -> impl Strategy<Value = Arith> {
    literal_strategy().prop_recursive(4, 32, 2, |inner| {
        (inner.clone(), 0usize..4, inner).prop_map(|(l, op, r)| {
            let (sym, f): (&str, fn(i64, i64) -> Option<i64>) = match op {
                0 => ("+", i64::checked_add),
                1 => ("-", i64::checked_sub),
                2 => ("*", i64::checked_mul),
                _ => ("/", i64::checked_div),
            };
            let value = match (l.value, r.value) {
                (Some(l), Some(r)) => f(l, r),
                _ => None,
            };
            Arith {
                text: format!("({} {sym} {})", l.text, r.text),
                value,
            }
        })
    })
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 _]{0,11}".prop_map(|s| s.to_string())
}

fn eval_plain(text: &str) -> EquationResult<i64> {
    evaluate(text, &ValueTable::new(), &ValueTable::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn bracket_free_matches_integer_arithmetic(expr in arith_strategy()) {
        match (expr.value, eval_plain(&expr.text)) {
            (Some(expected), Ok(actual)) => prop_assert_eq!(expected, actual),
            (None, Err(err)) => prop_assert!(
                matches!(err.category(), Category::DivisionByZero | Category::Overflow),
                "{} failed with {}", expr.text, err
            ),
            (expected, actual) => prop_assert!(
                false,
                "{}: expected {:?}, got {:?}", expr.text, expected, actual
            ),
        }
    }

    #[test]
    fn reference_equals_literal(
        name in name_strategy(),
        value in -10_000i64..10_000,
        other in 1i64..100,
        in_stocks in any::<bool>(),
    ) {
        let mut table = ValueTable::new();
        table.insert(name.clone(), value);
        let (stocks, variables) = if in_stocks {
            (table, ValueTable::new())
        } else {
            (ValueTable::new(), table)
        };

        let with_ref = format!("[{name}] * {other} - {other}");
        let expanded = substitute(&with_ref, &stocks, &variables);
        prop_assert_eq!(format!("{value} * {other} - {other}"), expanded.as_ref());

        // evaluating the reference is evaluating its expanded text
        let result = evaluate(&with_ref, &stocks, &variables);
        prop_assert_eq!(eval_plain(&expanded), result.clone());
        if value >= 0 {
            prop_assert_eq!(Ok(value * other - other), result);
        } else {
            // a negative value expands to a unary minus
            prop_assert_eq!(
                Some(Category::UnsupportedExpression),
                result.err().map(|err| err.category())
            );
        }
    }

    #[test]
    fn adjacent_references_concatenate(a in 0i64..1000, b in 0i64..1000) {
        let mut stocks = ValueTable::new();
        stocks.insert("a".to_owned(), a);
        stocks.insert("b".to_owned(), b);
        let expected: i64 = format!("{a}{b}").parse().unwrap();
        prop_assert_eq!(Ok(expected), evaluate("[a][b]", &stocks, &ValueTable::new()));
    }

    #[test]
    fn transfers_conserve_total(
        initial in (0i64..1_000, 0i64..1_000),
        divisor in 1i64..10,
        steps in 0usize..20,
    ) {
        let stocks = vec![
            Stock {
                id: 1,
                name: "left".to_owned(),
                initial_value: initial.0.to_string(),
                project_id: 1,
            },
            Stock {
                id: 2,
                name: "right".to_owned(),
                initial_value: initial.1.to_string(),
                project_id: 1,
            },
        ];
        let flows = vec![
            Flow {
                id: 1,
                name: "across".to_owned(),
                equation: format!("[left] / {divisor}"),
                from_stock: Some(1),
                to_stock: Some(2),
            },
            Flow {
                id: 2,
                name: "back".to_owned(),
                equation: "[right] / 5".to_owned(),
                from_stock: Some(2),
                to_stock: Some(1),
            },
        ];

        let results = simulate(&stocks, &[], &flows, steps).unwrap();
        prop_assert_eq!(steps, results.step_count());
        for snapshot in results.iter() {
            prop_assert_eq!(initial.0 + initial.1, snapshot["left"] + snapshot["right"]);
        }
        prop_assert_eq!(&results, &simulate(&stocks, &[], &flows, steps).unwrap());
    }
}
