//! FILENAME: engine/src/cell.rs
//! PURPOSE: A single spreadsheet cell: its content, its cache, and the
//! dependency edges it participates in.
//! CONTEXT: A cell is one of three things — empty, literal text, or a
//! formula with an optional cached result. Edges between cells are stored
//! as positions, not pointers (see `sheet.rs`), so a cell can be dropped and
//! re-materialized at the same position without dangling references.

use crate::formula::Formula;
use serde::{Deserialize, Serialize};
use sheetcalc_parser::{FormulaError, ParseError, Position};
use std::cell::RefCell;
use std::collections::HashSet;

/// The escape marker that keeps text beginning with `=` from being read as
/// a formula: a leading `'` is stripped by `value()` and kept verbatim by
/// `text()`.
const ESCAPE_SIGN: char = '\'';
/// The marker that turns a cell's text into a formula.
const FORMULA_SIGN: char = '=';

/// The evaluated or literal content of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl CellValue {
    /// The text `Sheet::print_values` renders for this value.
    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => format!("{}", n),
            CellValue::Text(s) => s.clone(),
            CellValue::Error(e) => e.code().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum CellKind {
    Empty,
    Text(String),
    Formula(Formula),
}

/// A single cell in the grid. Outgoing/incoming edges are positions, never
/// direct references to other `Cell`s — see module docs.
#[derive(Debug)]
pub struct Cell {
    position: Position,
    kind: CellKind,
    cache: RefCell<Option<CellValue>>,
    outgoing: HashSet<Position>,
    incoming: HashSet<Position>,
}

impl Cell {
    pub fn new(position: Position) -> Self {
        Cell {
            position,
            kind: CellKind::Empty,
            cache: RefCell::new(None),
            outgoing: HashSet::new(),
            incoming: HashSet::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, CellKind::Empty)
    }

    pub fn incoming(&self) -> &HashSet<Position> {
        &self.incoming
    }

    pub fn outgoing(&self) -> &HashSet<Position> {
        &self.outgoing
    }

    pub fn incoming_mut(&mut self) -> &mut HashSet<Position> {
        &mut self.incoming
    }

    /// True once another formula references this cell — the condition under
    /// which a cleared cell must remain allocated as a placeholder.
    pub fn is_referenced(&self) -> bool {
        !self.incoming.is_empty()
    }

    /// Builds the `(kind, outgoing)` that `text` would produce, without
    /// committing it. Returns a syntax error rather than mutating anything,
    /// so the caller can cycle-check before committing — step 1-2 of the
    /// edit protocol.
    pub fn build_candidate(text: &str) -> Result<(CandidateKind, HashSet<Position>), ParseError> {
        if text.is_empty() {
            return Ok((CandidateKind::Empty, HashSet::new()));
        }

        let mut chars = text.chars();
        let first = chars.next();
        if text.len() >= 2 && first == Some(FORMULA_SIGN) {
            let body = &text[FORMULA_SIGN.len_utf8()..];
            let formula = Formula::parse(body)?;
            let outgoing = formula.referenced_cells().into_iter().collect();
            return Ok((CandidateKind::Formula(formula), outgoing));
        }

        Ok((CandidateKind::Text(text.to_string()), HashSet::new()))
    }

    /// Commits a previously-built candidate. The caller (`Sheet::set_cell`)
    /// is responsible for the cycle check, edge rewiring, and cache
    /// invalidation that must happen around this — this step only swaps the
    /// cell's own content.
    pub fn commit(&mut self, kind: CandidateKind, outgoing: HashSet<Position>) {
        self.kind = match kind {
            CandidateKind::Empty => CellKind::Empty,
            CandidateKind::Text(s) => CellKind::Text(s),
            CandidateKind::Formula(f) => CellKind::Formula(f),
        };
        self.outgoing = outgoing;
        *self.cache.borrow_mut() = None;
    }

    /// Resets the cell to empty. Does not touch incoming edges or remove the
    /// cell from the grid — `Sheet::clear_cell` decides that.
    pub fn clear(&mut self) {
        self.kind = CellKind::Empty;
        self.outgoing.clear();
        *self.cache.borrow_mut() = None;
    }

    /// Drops the cached evaluation, if any. Returns whether a cache was
    /// actually present, so callers doing reverse-BFS invalidation can stop
    /// at already-clean cells.
    pub fn invalidate_cache(&self) -> bool {
        self.cache.borrow_mut().take().is_some()
    }

    /// `GetValue()`. For a formula cell, evaluates (and caches) lazily via
    /// `lookup`; for text, applies the escape-marker rule; empty is blank.
    pub fn value<F>(&self, lookup: F) -> CellValue
    where
        F: Fn(Position) -> Result<f64, FormulaError>,
    {
        match &self.kind {
            CellKind::Empty => CellValue::Text(String::new()),
            CellKind::Text(s) => {
                if let Some(rest) = s.strip_prefix(ESCAPE_SIGN) {
                    CellValue::Text(rest.to_string())
                } else {
                    CellValue::Text(s.clone())
                }
            }
            CellKind::Formula(formula) => {
                if let Some(cached) = self.cache.borrow().as_ref() {
                    return cached.clone();
                }
                let value = formula.evaluate(lookup);
                *self.cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// `GetText()`: the text that would reproduce this cell if re-entered.
    pub fn text(&self) -> String {
        match &self.kind {
            CellKind::Empty => String::new(),
            CellKind::Text(s) => s.clone(),
            CellKind::Formula(formula) => format!("{}{}", FORMULA_SIGN, formula.expression()),
        }
    }
}

/// The content a candidate edit would install, produced by
/// `Cell::build_candidate` and consumed by `Cell::commit`.
#[derive(Debug, Clone)]
pub enum CandidateKind {
    Empty,
    Text(String),
    Formula(Formula),
}
