//! # sbml
//!
//! A tree-walking interpreter for a small imperative scripting language with
//! booleans, integers, reals, strings, lists, tuples, `if`/`while` control
//! flow and first-order functions.
//!
//! Source text goes through [`lexer::lex`], then [`parser::parse`], and the
//! resulting [`ast::Program`] is executed directly by
//! [`interpreter::interpret`]. A run either completes or stops at the first
//! [`Error`], which is always reported as `SYNTAX ERROR` or `SEMANTIC ERROR`.

use std::io::Write;

pub mod ast;
pub mod builtin;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
mod stack;
pub mod value;

pub use config::Config;
pub use error::{Error, SemanticError, SyntaxError};
pub use value::Value;

/// Tokenizes and parses a whole program without running it.
pub fn parse_program(source: &str) -> Result<ast::Program, SyntaxError> {
    let tokens = lexer::lex(source)?;
    parser::parse(&tokens)
}

/// Runs `source`, writing one line to `out` for every executed `print`.
///
/// Lines printed before a failure stay written; the error is returned for the
/// caller to report.
///
/// ```
/// let mut out = Vec::new();
/// sbml::run("{ print(7 div 2); }", &sbml::Config::default(), &mut out).unwrap();
/// assert_eq!(out, b"3\n");
/// ```
pub fn run(source: &str, config: &Config, out: &mut impl Write) -> Result<(), Error> {
    let result = parse_program(source)
        .map_err(Error::from)
        .and_then(|program| interpreter::interpret(&program, config, out));
    if let Err(error) = &result {
        tracing::debug!(detail = ?error, "{error}");
    }
    result
}

/// Runs `source` and returns the printed lines along with the outcome.
pub fn run_captured(source: &str, config: &Config) -> (Vec<String>, Result<(), Error>) {
    let mut out = Vec::new();
    let result = run(source, config, &mut out);
    let lines = String::from_utf8_lossy(&out)
        .lines()
        .map(str::to_owned)
        .collect();
    (lines, result)
}
