//! FILENAME: parser/src/error.rs
//! PURPOSE: Error types produced while lexing/parsing formula text and while
//! evaluating the resulting AST.
//! CONTEXT: `ParseError` aborts formula construction (syntax errors never
//! reach a cell). `FormulaError` is a value-level result of evaluation and
//! propagates through arithmetic like any other CellValue variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure produced by evaluating a formula against a cell lookup.
/// Unlike `ParseError`, this is never thrown — it is returned as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    /// A formula dereferenced a position outside the sheet's bounds.
    Ref,
    /// A formula dereferenced a cell whose text is not a valid number.
    Value,
    /// Division by zero, or an operation whose result is NaN or infinite.
    Div0,
}

impl FormulaError {
    /// The short code rendered by `Sheet::print_values`.
    pub fn code(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::error::Error for FormulaError {}

/// A syntax error raised while lexing or parsing formula text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("formula syntax error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}
