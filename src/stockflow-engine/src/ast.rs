// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::{fmt, mem};

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct Loc {
    pub start: u16,
    pub end: u16,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        // positions past u16::MAX saturate rather than wrap
        Loc {
            start: u16::try_from(start).unwrap_or(u16::MAX),
            end: u16::try_from(end).unwrap_or(u16::MAX),
        }
    }

    /// union takes a second Loc and returns the inclusive range from the
    /// start of the earlier token to the end of the later token.
    pub fn union(&self, rhs: &Self) -> Self {
        Loc {
            start: self.start.min(rhs.start),
            end: self.end.max(rhs.end),
        }
    }
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

/// Expr is the parsed form of an equation.  The parser accepts a wider
/// language than the evaluator supports so that well-formed but
/// unsupported constructs can be told apart from malformed text.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Expr {
    Const(i64, Loc),
    Float(String, Loc),
    Var(String, Loc),
    App(String, Vec<Expr>, Loc),
    Op1(UnaryOp, Box<Expr>, Loc),
    Op2(BinaryOp, Box<Expr>, Box<Expr>, Loc),
}

impl Expr {
    pub fn get_loc(&self) -> Loc {
        match self {
            Expr::Const(_, loc) => *loc,
            Expr::Float(_, loc) => *loc,
            Expr::Var(_, loc) => *loc,
            Expr::App(_, _, loc) => *loc,
            Expr::Op1(_, _, loc) => *loc,
            Expr::Op2(_, _, _, loc) => *loc,
        }
    }

    /// Move this node's children onto `stack`, leaving placeholders.
    fn take_children(&mut self, stack: &mut Vec<Expr>) {
        let placeholder = || Expr::Const(0, Loc::default());
        match self {
            Expr::Const(..) | Expr::Float(..) | Expr::Var(..) => {}
            Expr::App(_, args, _) => stack.append(args),
            Expr::Op1(_, r, _) => stack.push(mem::replace(&mut **r, placeholder())),
            Expr::Op2(_, l, r, _) => {
                stack.push(mem::replace(&mut **l, placeholder()));
                stack.push(mem::replace(&mut **r, placeholder()));
            }
        }
    }
}

// A long chain like `1+1+...+1` is as deep as it is long; tear it down
// without recursing once per level.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.take_children(&mut stack);
        while let Some(mut expr) = stack.pop() {
            expr.take_children(&mut stack);
        }
    }
}

#[test]
fn test_loc_union() {
    let a = Loc::new(2, 4);
    let b = Loc::new(7, 9);
    assert_eq!(Loc::new(2, 9), a.union(&b));
    assert_eq!(Loc::new(2, 9), b.union(&a));
    assert_eq!("2:9", format!("{}", a.union(&b)));
}

#[test]
fn test_loc_saturates() {
    let loc = Loc::new(70_000, 1 << 20);
    assert_eq!((u16::MAX, u16::MAX), (loc.start, loc.end));
}

#[test]
fn test_drop_long_chain() {
    let mut expr = Expr::Const(1, Loc::default());
    for _ in 0..200_000 {
        let one = Expr::Const(1, Loc::default());
        expr = Expr::Op2(BinaryOp::Add, Box::new(expr), Box::new(one), Loc::default());
    }
    drop(expr);
}
