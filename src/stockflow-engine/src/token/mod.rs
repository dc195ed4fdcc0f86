// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// derived from both the LALRPOP whitespace tokenizer, and LALRPOP's
// internal tokenizer

use std::str::CharIndices;

use lazy_static::lazy_static;
use unicode_xid::UnicodeXID;

use self::Token::*;
use crate::common::ErrorCode::*;
use crate::common::{EquationError, ErrorCode};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
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
    Ident(&'input str),
    Num(&'input str),
    Float(&'input str),
}

fn error<T>(code: ErrorCode, start: usize, end: usize) -> Result<T, EquationError> {
    Err(EquationError {
        start: u16::try_from(start).unwrap_or(u16::MAX),
        end: u16::try_from(end).unwrap_or(u16::MAX),
        code,
    })
}

pub type Spanned<T> = (usize, T, usize);

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
        };
        t.bump();
        t
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.bump_n(1)
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        assert!(n > 0);
        self.lookahead = self.chars.nth(n - 1);
        self.lookahead
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn identifier(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        let end = self
            .take_while(is_identifier_continue)
            .unwrap_or(self.text.len());
        (idx0, Ident(&self.text[idx0..end]), end)
    }

    fn number(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, EquationError> {
        use regex::{Match, Regex};

        lazy_static! {
            static ref NUMBER_RE: Regex =
                Regex::new(r"^\d*(\.\d*)?([eE][-+]?\d+)?").unwrap();
        }

        // always matches: every component of the pattern is optional
        let m: Match = NUMBER_RE.find(&self.text[idx0..]).unwrap();
        let end = idx0 + m.end();
        let text = &self.text[idx0..end];

        // a lone '.' matches the pattern as an empty number
        if m.end() == 0 || !text.bytes().any(|b| b.is_ascii_digit()) {
            self.bump();
            return error(ExpectedNumber, idx0, idx0 + m.end().max(1));
        }

        self.bump_n(text.chars().count());

        let tok = if text.bytes().all(|b| b.is_ascii_digit()) {
            Num(text)
        } else {
            Float(text)
        };
        Ok((idx0, tok, end))
    }

    /// Bracket references are replaced with their values before an
    /// equation is lexed, so any bracket that reaches the lexer is one
    /// that never formed a reference.
    fn bracket(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, EquationError> {
        // eat the opening '['
        self.bump();

        match self.take_until(|c| c == ']') {
            Some(idx1) => {
                // eat the trailing ']'
                self.bump();
                if idx1 == idx0 + 1 {
                    error(EmptyReference, idx0, idx1 + 1)
                } else {
                    error(UnrecognizedToken, idx0, idx1 + 1)
                }
            }
            None => error(UnclosedReference, idx0, self.text.len()),
        }
    }

    /// Consume a one- or two-character operator.  `second` pairs the
    /// character that may follow with the token it produces; `single` is
    /// the token for the first character alone, if that is legal.
    fn operator(
        &mut self,
        i: usize,
        second: (char, Token<'input>),
        single: Option<Token<'input>>,
    ) -> Result<Spanned<Token<'input>>, EquationError> {
        match self.bump() {
            Some((_, c)) if c == second.0 => {
                self.bump();
                Ok((i, second.1, i + 2))
            }
            // we've already bumped, don't consume
            _ => match single {
                Some(tok) => Ok((i, tok, i + 1)),
                None => error(UnrecognizedToken, i, i + 1),
            },
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    fn consume(
        &mut self,
        i: usize,
        tok: Token<'input>,
        len: usize,
    ) -> Option<Result<Spanned<Token<'input>>, EquationError>> {
        self.bump();
        Some(Ok((i, tok, i + len)))
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned<Token<'input>>, EquationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.lookahead {
                Some((i, '+')) => self.consume(i, Plus, 1),
                Some((i, '-')) => self.consume(i, Minus, 1),
                Some((i, '*')) => self.consume(i, Mul, 1),
                Some((i, '/')) => self.consume(i, Div, 1),
                Some((i, '%')) => self.consume(i, Mod, 1),
                Some((i, '(')) => self.consume(i, LParen, 1),
                Some((i, ')')) => self.consume(i, RParen, 1),
                Some((i, ',')) => self.consume(i, Comma, 1),
                Some((i, '<')) => Some(self.operator(i, ('=', Lte), Some(Lt))),
                Some((i, '>')) => Some(self.operator(i, ('=', Gte), Some(Gt))),
                Some((i, '!')) => Some(self.operator(i, ('=', Neq), Some(Not))),
                Some((i, '=')) => Some(self.operator(i, ('=', Eq), None)),
                Some((i, '&')) => Some(self.operator(i, ('&', And), None)),
                Some((i, '|')) => Some(self.operator(i, ('|', Or), None)),
                Some((i, '[')) => Some(self.bracket(i)),
                Some((i, c)) if is_identifier_start(c) => Some(Ok(self.identifier(i))),
                Some((i, c)) if is_number_start(c) => Some(self.number(i)),
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((i, _)) => {
                    self.bump(); // eat whatever is killing us
                    let end = match self.lookahead {
                        Some((end, _)) => end,
                        None => self.text.len(),
                    };
                    Some(error(InvalidToken, i, end))
                }
                None => None,
            };
        }
    }
}

fn is_number_start(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}
