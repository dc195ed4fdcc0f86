// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Static checks over a model.  None of these findings stop a simulation:
//! unknown names resolve to zero and dangling flow endpoints are skipped.
//! They are reported so a modeler can find the typo before trusting a run.

use std::collections::{HashMap, HashSet};

use crate::common::{Error, ErrorCode, ErrorKind};
use crate::datamodel::{Model, StockId};
use crate::eval::{Equation, ValueTable, substitute};

fn model_error(code: ErrorCode, details: String) -> Error {
    Error::new(ErrorKind::Model, code, Some(details))
}

struct Checker<'a> {
    known: HashSet<&'a str>,
    errors: Vec<Error>,
}

impl<'a> Checker<'a> {
    fn equation(&mut self, element: &str, text: &str) {
        let equation = Equation::new(text);
        if let Err(err) = equation.check_syntax() {
            // positions refer to the text with every reference read as zero
            let empty = ValueTable::new();
            let expanded = substitute(text, &empty, &empty);
            self.errors
                .push(Error::from_equation(ErrorKind::Model, element, &expanded, &err));
            return;
        }
        for name in equation.references() {
            if !self.known.contains(name) {
                self.errors.push(model_error(
                    ErrorCode::UnknownDependency,
                    format!("{element}: '{text}' refers to unknown '{name}'"),
                ));
            }
        }
    }
}

/// Every problem found in `model`, in declaration order: stocks first,
/// then variables, then flows.
pub fn check(model: &Model) -> Vec<Error> {
    let mut errors = Vec::new();

    let mut declared: HashMap<&str, &str> = HashMap::new();
    let elements = model
        .stocks
        .iter()
        .map(|s| ("stock", s.name.as_str()))
        .chain(model.variables.iter().map(|v| ("variable", v.name.as_str())));
    for (kind, name) in elements {
        if let Some(first) = declared.insert(name, kind) {
            errors.push(model_error(
                ErrorCode::DuplicateVariable,
                format!("{kind} '{name}' was already declared as a {first}"),
            ));
        }
    }

    let mut checker = Checker {
        known: declared.keys().copied().collect(),
        errors,
    };

    for stock in model.stocks.iter() {
        checker.equation(&format!("stock '{}'", stock.name), &stock.initial_value);
    }
    for var in model.variables.iter() {
        checker.equation(&format!("variable '{}'", var.name), &var.equation);
    }

    let stock_ids: HashSet<StockId> = model.stocks.iter().map(|s| s.id).collect();
    for flow in model.flows.iter() {
        let element = if flow.name.is_empty() {
            format!("flow #{}", flow.id)
        } else {
            format!("flow '{}'", flow.name)
        };
        checker.equation(&element, &flow.equation);
        for (end, id) in [("from_stock", flow.from_stock), ("to_stock", flow.to_stock)] {
            if let Some(id) = id.filter(|id| !stock_ids.contains(id)) {
                checker.errors.push(model_error(
                    ErrorCode::DoesNotExist,
                    format!("{element}: {end} {id} is not a stock in this model"),
                ));
            }
        }
    }

    checker.errors
}
