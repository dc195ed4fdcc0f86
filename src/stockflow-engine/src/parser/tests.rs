// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::*;
use crate::common::ErrorCode;

fn op2(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    let loc = l.get_loc().union(&r.get_loc());
    Expr::Op2(op, Box::new(l), Box::new(r), loc)
}

fn num(n: i64, start: usize, end: usize) -> Expr {
    Expr::Const(n, Loc::new(start, end))
}

fn parse_err(input: &str) -> EquationError {
    parse(input).unwrap_err()
}

// ============================================================================
// Atoms
// ============================================================================

#[test]
fn test_parse_number() {
    assert_eq!(num(42, 0, 2), parse("42").unwrap());
}

#[test]
fn test_parse_float() {
    let ast = parse("2.75").unwrap();
    assert!(matches!(ast, Expr::Float(ref s, _) if s == "2.75"));
}

#[test]
fn test_parse_bare_identifier() {
    let ast = parse("population").unwrap();
    assert!(matches!(ast, Expr::Var(ref s, _) if s == "population"));
}

#[test]
fn test_parse_parens_are_transparent() {
    assert_eq!(num(7, 2, 3), parse("((7))").unwrap());
}

#[test]
fn test_parse_literal_overflow() {
    let err = parse_err("99999999999999999999");
    assert_eq!(ErrorCode::IntegerOverflow, err.code);
    assert_eq!((0, 20), (err.start, err.end));
}

// ============================================================================
// Precedence and associativity
// ============================================================================

#[test]
fn test_mul_binds_tighter_than_add() {
    let expected = op2(
        BinaryOp::Add,
        num(2, 0, 1),
        op2(BinaryOp::Mul, num(3, 2, 3), num(4, 4, 5)),
    );
    assert_eq!(expected, parse("2+3*4").unwrap());
}

#[test]
fn test_parens_override_precedence() {
    let ast = parse("(2+3)*4").unwrap();
    match &ast {
        Expr::Op2(BinaryOp::Mul, l, r, _) => {
            assert!(matches!(**l, Expr::Op2(BinaryOp::Add, _, _, _)));
            assert_eq!(num(4, 6, 7), **r);
        }
        _ => panic!("expected multiplication at the root, got {ast:?}"),
    }
}

#[test]
fn test_subtraction_is_left_associative() {
    let expected = op2(
        BinaryOp::Sub,
        op2(BinaryOp::Sub, num(10, 0, 2), num(3, 3, 4)),
        num(2, 5, 6),
    );
    assert_eq!(expected, parse("10-3-2").unwrap());
}

#[test]
fn test_division_is_left_associative() {
    let expected = op2(
        BinaryOp::Div,
        op2(BinaryOp::Div, num(100, 0, 3), num(10, 4, 6)),
        num(5, 7, 8),
    );
    assert_eq!(expected, parse("100/10/5").unwrap());
}

#[test]
fn test_comparison_below_additive() {
    let ast = parse("1 + 2 < 4").unwrap();
    assert!(matches!(ast, Expr::Op2(BinaryOp::Lt, _, _, _)));
}

#[test]
fn test_logical_operators() {
    let ast = parse("1 < 2 && 3 > 2 || 0 == 1").unwrap();
    match &ast {
        Expr::Op2(BinaryOp::Or, l, _, _) => {
            assert!(matches!(**l, Expr::Op2(BinaryOp::And, _, _, _)));
        }
        _ => panic!("expected || at the root, got {ast:?}"),
    }
}

#[test]
fn test_unary() {
    let ast = parse("-3").unwrap();
    assert_eq!(
        Expr::Op1(UnaryOp::Negative, Box::new(num(3, 1, 2)), Loc::new(0, 2)),
        ast
    );
    assert!(matches!(
        parse("+a").unwrap(),
        Expr::Op1(UnaryOp::Positive, _, _)
    ));
    assert!(matches!(parse("!1").unwrap(), Expr::Op1(UnaryOp::Not, _, _)));
    // unary binds tighter than multiplication
    assert!(matches!(
        parse("-2*3").unwrap(),
        Expr::Op2(BinaryOp::Mul, _, _, _)
    ));
}

#[test]
fn test_call() {
    let ast = parse("max(a, 3)").unwrap();
    match &ast {
        Expr::App(name, args, loc) => {
            assert_eq!("max", name.as_str());
            assert_eq!(2, args.len());
            assert_eq!(Loc::new(0, 9), *loc);
        }
        _ => panic!("expected call, got {ast:?}"),
    }
    assert!(matches!(parse("f()").unwrap(), Expr::App(_, ref args, _) if args.is_empty()));
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_empty_equation() {
    assert_eq!(ErrorCode::EmptyEquation, parse_err("").code);
    assert_eq!(ErrorCode::EmptyEquation, parse_err("   ").code);
}

#[test]
fn test_unbalanced_parens() {
    let err = parse_err("(1+2");
    assert_eq!(ErrorCode::UnrecognizedEof, err.code);
    assert_eq!((4, 5), (err.start, err.end));

    let err = parse_err("1+2)");
    assert_eq!(ErrorCode::ExtraToken, err.code);
    assert_eq!((3, 4), (err.start, err.end));
}

#[test]
fn test_trailing_operator() {
    assert_eq!(ErrorCode::UnrecognizedEof, parse_err("1 +").code);
    assert_eq!(ErrorCode::UnrecognizedEof, parse_err("2 *").code);
}

#[test]
fn test_missing_operand() {
    let err = parse_err("1 + * 2");
    assert_eq!(ErrorCode::UnrecognizedToken, err.code);
    assert_eq!((4, 5), (err.start, err.end));
}

#[test]
fn test_adjacent_operands() {
    assert_eq!(ErrorCode::ExtraToken, parse_err("1 2").code);
    assert_eq!(ErrorCode::ExtraToken, parse_err("(1) (2)").code);
}

#[test]
fn test_lexer_errors_surface() {
    assert_eq!(ErrorCode::UnclosedReference, parse_err("[a + 1").code);
    assert_eq!(ErrorCode::EmptyReference, parse_err("2 * []").code);
    assert_eq!(ErrorCode::InvalidToken, parse_err("1 $ 2").code);
}

#[test]
fn test_unclosed_call() {
    assert_eq!(ErrorCode::UnrecognizedEof, parse_err("max(1, 2").code);
}

// ============================================================================
// Nesting
// ============================================================================

#[test]
fn test_moderate_nesting() {
    let depth = 100;
    let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(num(1, depth, depth + 1), parse(&input).unwrap());
    assert!(parse(&format!("{}1", "-".repeat(depth))).is_ok());
}

#[test]
fn test_deep_parens_are_rejected() {
    let depth = 10_000;
    let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let err = parse_err(&input);
    assert_eq!(ErrorCode::NestingTooDeep, err.code);
    assert_eq!(crate::common::Category::ParseError, err.category());
    assert_eq!((128, 129), (err.start, err.end));
}

#[test]
fn test_deep_unary_is_rejected() {
    let input = format!("{}1", "-".repeat(10_000));
    assert_eq!(ErrorCode::NestingTooDeep, parse_err(&input).code);
}

#[test]
fn test_deep_calls_are_rejected() {
    let depth = 10_000;
    let input = format!("{}1{}", "f(".repeat(depth), ")".repeat(depth));
    assert_eq!(ErrorCode::NestingTooDeep, parse_err(&input).code);
}

#[test]
fn test_long_flat_chain() {
    let input = vec!["1"; 50_000].join("+");
    assert!(matches!(
        parse(&input).unwrap(),
        Expr::Op2(BinaryOp::Add, _, _, _)
    ));
}
