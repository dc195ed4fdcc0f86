// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    DoesNotExist,
    JsonDeserialization,
    // lexing and parsing
    InvalidToken,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    EmptyEquation,
    UnclosedReference,
    EmptyReference,
    ExpectedNumber,
    NestingTooDeep,
    // well-formed, but outside the integer arithmetic subset
    UnsupportedFloat,
    UnsupportedUnaryOp,
    UnsupportedBinaryOp,
    UnsupportedIdent,
    UnsupportedCall,
    // evaluation
    DivisionByZero,
    IntegerOverflow,
    // model level
    BadSimSpecs,
    CircularDependency,
    DuplicateVariable,
    UnknownDependency,
    Generic,
}

/// The broad class an [`ErrorCode`] belongs to.  Callers that only care
/// about why an expression could not be evaluated match on this rather than
/// on individual codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    ParseError,
    UnsupportedExpression,
    DivisionByZero,
    Overflow,
    Model,
}

impl ErrorCode {
    pub fn category(self) -> Category {
        use ErrorCode::*;
        match self {
            InvalidToken | UnrecognizedEof | UnrecognizedToken | ExtraToken | EmptyEquation
            | UnclosedReference | EmptyReference | ExpectedNumber | NestingTooDeep => {
                Category::ParseError
            }
            UnsupportedFloat | UnsupportedUnaryOp | UnsupportedBinaryOp | UnsupportedIdent
            | UnsupportedCall => Category::UnsupportedExpression,
            DivisionByZero => Category::DivisionByZero,
            IntegerOverflow => Category::Overflow,
            NoError | DoesNotExist | JsonDeserialization | BadSimSpecs | CircularDependency
            | DuplicateVariable | UnknownDependency | Generic => Category::Model,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            JsonDeserialization => "json_deserialization",
            InvalidToken => "invalid_token",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            EmptyEquation => "empty_equation",
            UnclosedReference => "unclosed_reference",
            EmptyReference => "empty_reference",
            ExpectedNumber => "expected_number",
            NestingTooDeep => "nesting_too_deep",
            UnsupportedFloat => "unsupported_float",
            UnsupportedUnaryOp => "unsupported_unary_op",
            UnsupportedBinaryOp => "unsupported_binary_op",
            UnsupportedIdent => "unsupported_ident",
            UnsupportedCall => "unsupported_call",
            DivisionByZero => "division_by_zero",
            IntegerOverflow => "integer_overflow",
            BadSimSpecs => "bad_sim_specs",
            CircularDependency => "circular_dependency",
            DuplicateVariable => "duplicate_variable",
            UnknownDependency => "unknown_dependency",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

/// A failure evaluating a single equation.  `start` and `end` are byte
/// offsets into the equation text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EquationError {
    pub start: u16,
    pub end: u16,
    pub code: ErrorCode,
}

impl EquationError {
    pub fn category(&self) -> Category {
        self.code.category()
    }
}

impl fmt::Display for EquationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.code)
    }
}

impl error::Error for EquationError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Model,
    Simulation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn category(&self) -> Category {
        self.code.category()
    }

    /// Lift an equation failure into a model-level error, recording which
    /// element's equation failed and where.
    pub fn from_equation(
        kind: ErrorKind,
        element: &str,
        equation: &str,
        err: &EquationError,
    ) -> Self {
        Error {
            kind,
            code: err.code,
            details: Some(format!(
                "{element}: '{equation}' at {}:{}",
                err.start, err.end
            )),
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Import => "ImportError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Simulation => "SimulationError",
        };
        match self.details {
            Some(ref details) => write!(f, "{kind}{{{}: {details}}}", self.code),
            None => write!(f, "{kind}{{{}}}", self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
pub type EquationResult<T> = result::Result<T, EquationError>;

#[macro_export]
macro_rules! eqn_err(
    ($code:tt, $start:expr, $end:expr) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(EquationError{
            start: u16::try_from($start).unwrap_or(u16::MAX),
            end: u16::try_from($end).unwrap_or(u16::MAX),
            code: ErrorCode::$code,
        })
    }}
);

#[macro_export]
macro_rules! model_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Model,
            ErrorCode::$code,
            Some($str),
        ))
    }}
);

#[macro_export]
macro_rules! sim_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Simulation,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Simulation, ErrorCode::$code, None))
    }};
}

#[test]
fn test_error_code_categories() {
    assert_eq!(Category::ParseError, ErrorCode::ExtraToken.category());
    assert_eq!(Category::ParseError, ErrorCode::UnclosedReference.category());
    assert_eq!(Category::ParseError, ErrorCode::NestingTooDeep.category());
    assert_eq!(
        Category::UnsupportedExpression,
        ErrorCode::UnsupportedFloat.category()
    );
    assert_eq!(Category::DivisionByZero, ErrorCode::DivisionByZero.category());
    assert_eq!(Category::Overflow, ErrorCode::IntegerOverflow.category());
    assert_eq!(Category::Model, ErrorCode::CircularDependency.category());
}

#[test]
fn test_error_display() {
    let err = EquationError {
        start: 2,
        end: 3,
        code: ErrorCode::DivisionByZero,
    };
    assert_eq!("2:3:division_by_zero", format!("{err}"));

    let err = Error::from_equation(ErrorKind::Simulation, "flow 'drain'", "10/0", &err);
    assert_eq!(
        "SimulationError{division_by_zero: flow 'drain': '10/0' at 2:3}",
        format!("{err}")
    );

    let err = Error::new(ErrorKind::Model, ErrorCode::DoesNotExist, None);
    assert_eq!("ModelError{does_not_exist}", format!("{err}"));
}
