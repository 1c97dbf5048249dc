use std::io;

use thiserror::Error;

/// The single failure a run can end with.
///
/// The language only knows two kinds of error and only ever reports the
/// category, so the `Display` of the first two variants is the exact message
/// shown to the user. The wrapped detail is kept for logging and tests.
#[derive(Debug, Error)]
pub enum Error {
    #[error("SYNTAX ERROR")]
    Syntax(#[from] SyntaxError),
    #[error("SEMANTIC ERROR")]
    Semantic(#[from] SemanticError),
    #[error("could not write program output")]
    Output(#[from] io::Error),
}

impl Error {
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax(_))
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Error::Semantic(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unrecognized input {text:?} on line {line}")]
    UnrecognizedInput { text: String, line: usize },
    #[error("invalid literal {text:?} on line {line}")]
    InvalidLiteral { text: String, line: usize },
    #[error("unexpected {found} on line {line}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        line: usize,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("`{op}` cannot be applied to {found}")]
    TypeMismatch { op: &'static str, found: String },
    #[error("variable `{0}` is not defined")]
    UnknownVariable(String),
    #[error("function `{0}` is not defined")]
    UnknownFunction(String),
    #[error("function `{name}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("tuple field #{index} is out of range for a tuple of {len}")]
    TupleIndexOutOfRange { index: i64, len: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{0}` has no real-valued result")]
    NoRealResult(&'static str),
    #[error("arithmetic overflow in `{0}`")]
    Overflow(&'static str),
    #[error("condition evaluated to {0}, expected a boolean")]
    NonBooleanCondition(&'static str),
    #[error("call depth exceeded the limit of {0}")]
    CallDepthExceeded(usize),
}
