// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for stock and flow equations.
//!
//! Precedence, loosest first: `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, application.  Binary operators of equal
//! precedence associate to the left.

use crate::ast::{BinaryOp, Expr, Loc, UnaryOp};
use crate::common::{EquationError, EquationResult};
use crate::eqn_err;
use crate::token::{Lexer, Spanned, Token};

#[cfg(test)]
mod tests;

/// How deeply parentheses, calls and unary operators may nest.
const MAX_NESTING: usize = 128;

/// TokenKind discriminant for efficient peek comparisons without payload matching
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Eq,
    Neq,
    Not,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    LParen,
    RParen,
    Comma,
    Ident,
    Num,
    Float,
}

impl<'a> From<&Token<'a>> for TokenKind {
    fn from(token: &Token<'a>) -> Self {
        match token {
            Token::Eq => TokenKind::Eq,
            Token::Neq => TokenKind::Neq,
            Token::Not => TokenKind::Not,
            Token::Lt => TokenKind::Lt,
            Token::Lte => TokenKind::Lte,
            Token::Gt => TokenKind::Gt,
            Token::Gte => TokenKind::Gte,
            Token::And => TokenKind::And,
            Token::Or => TokenKind::Or,
            Token::Plus => TokenKind::Plus,
            Token::Minus => TokenKind::Minus,
            Token::Mul => TokenKind::Mul,
            Token::Div => TokenKind::Div,
            Token::Mod => TokenKind::Mod,
            Token::LParen => TokenKind::LParen,
            Token::RParen => TokenKind::RParen,
            Token::Comma => TokenKind::Comma,
            Token::Ident(_) => TokenKind::Ident,
            Token::Num(_) => TokenKind::Num,
            Token::Float(_) => TokenKind::Float,
        }
    }
}

struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    depth: usize,
}

impl<'input> Parser<'input> {
    /// Create a new parser from a lexer, collecting all tokens up front.
    /// Returns the first lexer error, if any.
    fn new(lexer: Lexer<'input>) -> EquationResult<Self> {
        let tokens = lexer.collect::<EquationResult<Vec<_>>>()?;
        Ok(Parser {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|(_, tok, _)| TokenKind::from(tok))
    }

    /// Consume the current token.  Only called after a successful peek.
    fn advance(&mut self) -> Spanned<Token<'input>> {
        let tok = self.tokens[self.pos];
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: TokenKind) -> EquationResult<Spanned<Token<'input>>> {
        if self.peek_kind() == Some(expected) {
            Ok(self.advance())
        } else {
            self.unexpected()
        }
    }

    /// The error for whatever sits at the current position: a stray token,
    /// or the end of input.
    fn unexpected<T>(&self) -> EquationResult<T> {
        match self.peek() {
            Some((start, _, end)) => eqn_err!(UnrecognizedToken, *start, *end),
            None => {
                let pos = self.eof_position();
                eqn_err!(UnrecognizedEof, pos, pos + 1)
            }
        }
    }

    /// Enter one more level of nesting at `pos`.  Callers decrement
    /// `depth` once the nested expression is parsed.
    fn descend(&mut self, pos: usize) -> EquationResult<()> {
        if self.depth >= MAX_NESTING {
            return eqn_err!(NestingTooDeep, pos, pos + 1);
        }
        self.depth += 1;
        Ok(())
    }

    fn eof_position(&self) -> usize {
        if let Some((_, _, end)) = self.tokens.last() {
            *end
        } else {
            0
        }
    }

    fn parse_equation(&mut self) -> EquationResult<Expr> {
        if self.tokens.is_empty() {
            return eqn_err!(EmptyEquation, 0, 0);
        }

        let expr = self.parse_expr()?;

        if let Some((start, _, end)) = self.peek() {
            return eqn_err!(ExtraToken, *start, *end);
        }

        Ok(expr)
    }

    fn parse_expr(&mut self) -> EquationResult<Expr> {
        self.parse_or()
    }

    /// Parse one left-associative precedence level: `next` parses the
    /// operands and `op_for` maps the operators that belong to this level.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> EquationResult<Expr>,
        op_for: fn(TokenKind) -> Option<BinaryOp>,
    ) -> EquationResult<Expr> {
        let mut left = next(self)?;

        while let Some(op) = self.peek_kind().and_then(op_for) {
            self.advance();
            let right = next(self)?;
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_and, |kind| match kind {
            TokenKind::Or => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::And => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_comparison, |kind| match kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Neq => Some(BinaryOp::Neq),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Lte => Some(BinaryOp::Lte),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Gte => Some(BinaryOp::Gte),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> EquationResult<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Mul => Some(BinaryOp::Mul),
            TokenKind::Div => Some(BinaryOp::Div),
            TokenKind::Mod => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    /// Parse unary operators (+, -, !)
    fn parse_unary(&mut self) -> EquationResult<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Plus) => UnaryOp::Positive,
            Some(TokenKind::Minus) => UnaryOp::Negative,
            Some(TokenKind::Not) => UnaryOp::Not,
            _ => return self.parse_app(),
        };
        let (lpos, _, _) = self.advance();
        self.descend(lpos)?;
        let operand = self.parse_unary();
        self.depth -= 1;
        let operand = operand?;
        let rpos = operand.get_loc().end as usize;
        Ok(Expr::Op1(op, Box::new(operand), Loc::new(lpos, rpos)))
    }

    /// Parse function application: id(args)
    fn parse_app(&mut self) -> EquationResult<Expr> {
        let is_call = self.peek_kind() == Some(TokenKind::Ident)
            && self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|(_, tok, _)| TokenKind::from(tok) == TokenKind::LParen);
        if !is_call {
            return self.parse_atom();
        }

        let (lpos, tok, _) = self.advance();
        let Token::Ident(name) = tok else {
            unreachable!()
        };

        self.advance(); // consume '('
        self.descend(lpos)?;
        let args = self.parse_comma_separated_exprs();
        self.depth -= 1;
        let args = args?;
        let (_, _, rpos) = self.expect(TokenKind::RParen)?;

        Ok(Expr::App(name.to_string(), args, Loc::new(lpos, rpos)))
    }

    /// Parse an atomic expression (number, identifier, parenthesized expression)
    fn parse_atom(&mut self) -> EquationResult<Expr> {
        let Some(kind) = self.peek_kind() else {
            return self.unexpected();
        };
        match kind {
            TokenKind::Num => {
                let (lpos, tok, rpos) = self.advance();
                let Token::Num(s) = tok else { unreachable!() };
                // the lexer only produces digits here, so the only way
                // for this to fail is a literal too large for i64
                match s.parse::<i64>() {
                    Ok(n) => Ok(Expr::Const(n, Loc::new(lpos, rpos))),
                    Err(_) => eqn_err!(IntegerOverflow, lpos, rpos),
                }
            }
            TokenKind::Float => {
                let (lpos, tok, rpos) = self.advance();
                let Token::Float(s) = tok else { unreachable!() };
                Ok(Expr::Float(s.to_string(), Loc::new(lpos, rpos)))
            }
            TokenKind::Ident => {
                let (lpos, tok, rpos) = self.advance();
                let Token::Ident(name) = tok else {
                    unreachable!()
                };
                Ok(Expr::Var(name.to_string(), Loc::new(lpos, rpos)))
            }
            TokenKind::LParen => {
                let (lpos, _, _) = self.advance(); // consume '('
                self.descend(lpos)?;
                let expr = self.parse_expr();
                self.depth -= 1;
                let expr = expr?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => self.unexpected(),
        }
    }

    /// Parse comma-separated expressions (for function arguments)
    fn parse_comma_separated_exprs(&mut self) -> EquationResult<Vec<Expr>> {
        let mut exprs = Vec::new();

        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(exprs);
        }

        exprs.push(self.parse_expr()?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance(); // consume ','
            exprs.push(self.parse_expr()?);
        }

        Ok(exprs)
    }
}

/// Parse an equation string into an AST.  Empty input is an error: every
/// stock, variable and flow needs an equation.
pub fn parse(input: &str) -> Result<Expr, EquationError> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;

    parser.parse_equation()
}
