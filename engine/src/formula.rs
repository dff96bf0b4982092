//! FILENAME: engine/src/formula.rs
//! PURPOSE: Owns a parsed AST and adapts it to the cell graph.
//! CONTEXT: `Formula` is the wrapper described by the core design: it parses
//! formula text once, exposes `evaluate`/`expression`/`referenced_cells`,
//! and is the place where a lookup failure (an out-of-range reference, a
//! non-numeric text cell, a propagated error) turns into a `CellValue`
//! rather than a Rust error.

use crate::cell::CellValue;
use sheetcalc_parser::{parse, Expr, FormulaError, ParseError, Position};

/// A parsed formula, independent of any particular cell's cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    ast: Expr,
}

impl Formula {
    /// Parses `text` (the formula body, without the leading `=`).
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Formula { ast: parse(text)? })
    }

    /// Evaluates the formula against `lookup`, converting any raised
    /// `FormulaError` into `CellValue::Error` rather than propagating it.
    pub fn evaluate<F>(&self, lookup: F) -> CellValue
    where
        F: Fn(Position) -> Result<f64, FormulaError>,
    {
        match self.ast.evaluate(&lookup) {
            Ok(n) => CellValue::Number(n),
            Err(e) => CellValue::Error(e),
        }
    }

    /// The canonical (re-parseable, minimally parenthesized) formula text.
    pub fn expression(&self) -> String {
        self.ast.to_canonical_string()
    }

    /// Valid positions the formula references, de-duplicated and sorted.
    pub fn referenced_cells(&self) -> Vec<Position> {
        self.ast.referenced_cells()
    }
}
