// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Integer expression evaluation.
//!
//! Evaluating an equation happens in two steps.  First every `[name]`
//! token is replaced with the decimal text of the named stock or
//! variable's current value: stocks are searched first, then variables,
//! and a name found in neither becomes `0`.  The resulting text is then
//! parsed and evaluated as integer arithmetic over literals, `+ - * /`
//! and parentheses.  Substitution is purely textual, so a negative value
//! turns into a unary minus (which is unsupported) and adjacent tokens
//! run together into a single literal.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::ast::{BinaryOp, Expr, Loc};
use crate::common::{EquationError, EquationResult, ErrorCode};
use crate::parser;

lazy_static! {
    static ref REFERENCE_RE: Regex = Regex::new(r"\[([^\]]+)\]").unwrap();
}

/// Current values by name.
pub type ValueTable = HashMap<String, i64>;

/// The pair of tables bracket references are resolved against.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    stocks: &'a ValueTable,
    variables: &'a ValueTable,
}

impl<'a> Scope<'a> {
    pub fn new(stocks: &'a ValueTable, variables: &'a ValueTable) -> Self {
        Scope { stocks, variables }
    }

    pub fn get(&self, name: &str) -> i64 {
        self.stocks
            .get(name)
            .or_else(|| self.variables.get(name))
            .copied()
            .unwrap_or(0)
    }
}

/// An equation that is evaluated many times, as a stock, variable or
/// flow's equation is over a run.  Text without references is parsed once,
/// and the outcome reused; text with references is parsed after every
/// substitution.  Either way, failures surface from [`Equation::eval`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equation {
    text: String,
    constant: Option<EquationResult<Expr>>,
}

impl Equation {
    pub fn new(text: &str) -> Self {
        let constant = if REFERENCE_RE.is_match(text) {
            None
        } else {
            Some(parser::parse(text))
        };
        Equation {
            text: text.to_owned(),
            constant,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn eval(&self, stocks: &ValueTable, variables: &ValueTable) -> EquationResult<i64> {
        match self.constant {
            Some(Ok(ref ast)) => eval(ast),
            Some(Err(ref err)) => Err(err.clone()),
            None => evaluate(&self.text, stocks, variables),
        }
    }

    /// Parse the equation with every reference read as zero.  This finds
    /// text that can never parse, whatever the values involved.
    pub fn check_syntax(&self) -> EquationResult<()> {
        match self.constant {
            Some(ref result) => result.as_ref().map(|_| ()).map_err(|err| err.clone()),
            None => {
                let empty = ValueTable::new();
                parser::parse(&substitute(&self.text, &empty, &empty)).map(|_| ())
            }
        }
    }

    /// The distinct names this equation refers to in brackets.
    pub fn references(&self) -> BTreeSet<&str> {
        references(&self.text)
    }
}

/// The distinct names `equation` refers to in brackets.
pub fn references(equation: &str) -> BTreeSet<&str> {
    REFERENCE_RE
        .captures_iter(equation)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Substitute every reference in `equation`, then parse and evaluate the
/// result.  Error positions refer to the substituted text.
pub fn evaluate(equation: &str, stocks: &ValueTable, variables: &ValueTable) -> EquationResult<i64> {
    let expanded = substitute(equation, stocks, variables);
    eval(&parser::parse(&expanded)?)
}

/// Return `equation` with every `[name]` token replaced by the decimal text
/// of its value.
pub fn substitute<'a>(equation: &'a str, stocks: &ValueTable, variables: &ValueTable) -> Cow<'a, str> {
    let scope = Scope::new(stocks, variables);
    REFERENCE_RE.replace_all(equation, |caps: &Captures| scope.get(&caps[1]).to_string())
}

fn err<T>(code: ErrorCode, loc: Loc) -> EquationResult<T> {
    Err(EquationError {
        start: loc.start,
        end: loc.end,
        code,
    })
}

fn apply(op: BinaryOp, l: i64, r: i64, loc: Loc) -> EquationResult<i64> {
    let result = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return err(ErrorCode::DivisionByZero, loc);
            }
            // truncates toward zero; only i64::MIN / -1 overflows
            l.checked_div(r)
        }
        BinaryOp::Mod
        | BinaryOp::Gt
        | BinaryOp::Gte
        | BinaryOp::Lt
        | BinaryOp::Lte
        | BinaryOp::Eq
        | BinaryOp::Neq
        | BinaryOp::And
        | BinaryOp::Or => return err(ErrorCode::UnsupportedBinaryOp, loc),
    };
    match result {
        Some(n) => Ok(n),
        None => err(ErrorCode::IntegerOverflow, loc),
    }
}

fn eval(expr: &Expr) -> EquationResult<i64> {
    match expr {
        Expr::Const(n, _) => Ok(*n),
        Expr::Float(_, loc) => err(ErrorCode::UnsupportedFloat, *loc),
        Expr::Var(_, loc) => err(ErrorCode::UnsupportedIdent, *loc),
        Expr::App(_, _, loc) => err(ErrorCode::UnsupportedCall, *loc),
        Expr::Op1(_, _, loc) => err(ErrorCode::UnsupportedUnaryOp, *loc),
        Expr::Op2(..) => {
            // walk the left spine iteratively: a chain like `1+2+...+n` is
            // as deep as it is long
            let mut spine = Vec::new();
            let mut leftmost = expr;
            while let Expr::Op2(op, l, r, loc) = leftmost {
                spine.push((*op, r, *loc));
                leftmost = &**l;
            }
            let mut acc = eval(leftmost)?;
            for (op, r, loc) in spine.into_iter().rev() {
                let r = eval(r)?;
                acc = apply(op, acc, r, loc)?;
            }
            Ok(acc)
        }
    }
}
