// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;

mod ast;
pub mod analysis;
pub mod datamodel;
mod deps;
pub mod eval;
mod parser;
mod results;
pub mod sim;
mod token;

#[cfg(test)]
mod eval_proptest;

pub use self::analysis::check;
pub use self::common::{
    Category, EquationError, EquationResult, Error, ErrorCode, ErrorKind, Result,
};
pub use self::datamodel::{
    File, Flow, InitOrder, Model, Project, SimRequest, SimSpecs, Stock, Variable,
};
pub use self::eval::{Equation, ValueTable, evaluate, references, substitute};
pub use self::results::{Results, Snapshot};
pub use self::sim::{Simulation, simulate};
