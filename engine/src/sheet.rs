//! FILENAME: engine/src/sheet.rs
//! PURPOSE: The grid of cells and the atomic edit protocol that keeps their
//! dependency edges and caches consistent.
//! CONTEXT: `Sheet` is the only thing that is allowed to touch more than one
//! `Cell` at a time. Every public mutator either fully commits or fully
//! rejects an edit — there's no half-applied state visible to the caller,
//! because a referenced-but-cyclic formula is rejected before anything is
//! written.
//!
//! Storage is sparse (`HashMap<Position, Cell>`): a spreadsheet with a
//! handful of used cells in row 16000 must not allocate 16000 empty rows.

use crate::cell::{Cell, CellValue};
use crate::cycle;
use log::{debug, trace};
use sheetcalc_parser::{FormulaError, ParseError, Position, Size};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;
use thiserror::Error;

/// Errors that abort an edit before anything is written. These never reach
/// a cell's stored value — contrast with `FormulaError`, which is itself a
/// valid `CellValue`.
#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("position out of range")]
    InvalidPosition,
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("formula would create a circular dependency")]
    CircularDependency,
}

/// The grid of cells, keyed by position. Cells referenced by a formula but
/// never explicitly set are materialized as empty placeholders so their
/// incoming edge has somewhere to live; they're dropped again once nothing
/// references them (see `clear_cell`).
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
        }
    }

    pub(crate) fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    /// `GetCell`: the stored cell, unless it doesn't exist or has been
    /// cleared back to empty text — a materialized placeholder with no
    /// content of its own is not visible to callers.
    pub fn get_cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos).filter(|c| !c.text().is_empty())
    }

    fn lookup_number(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        match self.cells.get(&pos) {
            None => Ok(0.0),
            Some(cell) => match cell.value(|p| self.lookup_number(p)) {
                CellValue::Number(n) => Ok(n),
                CellValue::Text(s) => {
                    if s.is_empty() {
                        Ok(0.0)
                    } else {
                        // Whole-string only: a leading/trailing non-numeric
                        // character (including whitespace) is Value, not a
                        // tolerant partial parse.
                        s.parse::<f64>().map_err(|_| FormulaError::Value)
                    }
                }
                CellValue::Error(e) => Err(e),
            },
        }
    }

    /// `GetValue`: the evaluated/displayed value of the cell at `pos`.
    /// Unset positions behave like empty cells (blank text).
    pub fn value_at(&self, pos: Position) -> CellValue {
        match self.cells.get(&pos) {
            None => CellValue::Text(String::new()),
            Some(cell) => cell.value(|p| self.lookup_number(p)),
        }
    }

    /// `SetCell`: parses `text`, cycle-checks it, and only then commits it
    /// and rewires the affected edges. On any error nothing in the sheet
    /// has changed.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), EditError> {
        if !pos.is_valid() {
            debug!("rejected edit at {}: position out of range", pos);
            return Err(EditError::InvalidPosition);
        }

        let (kind, new_outgoing) = Cell::build_candidate(text).map_err(|e| {
            debug!("rejected edit at {}: {}", pos, e);
            e
        })?;

        if !new_outgoing.is_empty() && cycle::would_create_cycle(self, pos, &new_outgoing) {
            debug!("rejected edit at {}: would create a circular dependency", pos);
            return Err(EditError::CircularDependency);
        }

        for &target in &new_outgoing {
            self.cells.entry(target).or_insert_with(|| Cell::new(target));
        }

        let old_outgoing: HashSet<Position> = self
            .cells
            .get(&pos)
            .map(|c| c.outgoing().clone())
            .unwrap_or_default();

        self.cells
            .entry(pos)
            .or_insert_with(|| Cell::new(pos))
            .commit(kind, new_outgoing.clone());

        for removed in old_outgoing.difference(&new_outgoing) {
            if let Some(cell) = self.cells.get_mut(removed) {
                cell.incoming_mut().remove(&pos);
            }
        }
        for added in new_outgoing.difference(&old_outgoing) {
            if let Some(cell) = self.cells.get_mut(added) {
                cell.incoming_mut().insert(pos);
            }
        }

        self.invalidate_downstream(pos);
        self.garbage_collect_unreferenced_empties(&old_outgoing);
        Ok(())
    }

    /// `ClearCell`: resets the cell to empty, then drops it from the sheet
    /// entirely unless another formula still points at it.
    pub fn clear_cell(&mut self, pos: Position) {
        let old_outgoing = match self.cells.get_mut(&pos) {
            Some(cell) => {
                let old = cell.outgoing().clone();
                cell.clear();
                old
            }
            None => return,
        };

        for removed in &old_outgoing {
            if let Some(cell) = self.cells.get_mut(removed) {
                cell.incoming_mut().remove(&pos);
            }
        }

        self.invalidate_downstream(pos);
        self.garbage_collect_unreferenced_empties(&old_outgoing);

        if !self
            .cells
            .get(&pos)
            .map(Cell::is_referenced)
            .unwrap_or(false)
        {
            self.cells.remove(&pos);
        }
    }

    /// Drops materialized-empty placeholders that lost their last referrer.
    fn garbage_collect_unreferenced_empties(&mut self, candidates: &HashSet<Position>) {
        for &pos in candidates {
            let should_remove = self
                .cells
                .get(&pos)
                .map(|c| c.is_empty() && !c.is_referenced())
                .unwrap_or(false);
            if should_remove {
                self.cells.remove(&pos);
            }
        }
    }

    /// Reverse-BFS over incoming edges, dropping cached values. Stops the
    /// moment a cell's cache is already clear, since everything past it was
    /// already invalidated by an earlier edit.
    fn invalidate_downstream(&self, origin: Position) {
        let mut queue: VecDeque<Position> = VecDeque::new();
        let mut visited: HashSet<Position> = HashSet::new();
        queue.push_back(origin);
        visited.insert(origin);

        while let Some(pos) = queue.pop_front() {
            let Some(cell) = self.cells.get(&pos) else {
                continue;
            };
            if pos != origin && !cell.invalidate_cache() {
                continue;
            }
            for &dependent in cell.incoming() {
                if visited.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        trace!(
            "invalidated {} cell(s) downstream of {}",
            visited.len() - 1,
            origin
        );
    }

    /// `GetPrintableSize`: the smallest rectangle anchored at (0, 0) that
    /// contains every cell whose text is non-empty.
    pub fn printable_size(&self) -> Size {
        let mut rows: u32 = 0;
        let mut cols: u32 = 0;
        for (pos, cell) in &self.cells {
            if cell.text().is_empty() {
                continue;
            }
            rows = rows.max((pos.row + 1) as u32);
            cols = cols.max((pos.col + 1) as u32);
        }
        Size { rows, cols }
    }

    /// `PrintValues`: tab-separated evaluated values, one newline-terminated
    /// row per line, over the printable rectangle.
    pub fn print_values(&self) -> String {
        self.print_with(|pos| self.value_at(pos).display())
    }

    /// `PrintTexts`: tab-separated raw cell text, same rectangle as
    /// `print_values`.
    pub fn print_texts(&self) -> String {
        self.print_with(|pos| {
            self.cells
                .get(&pos)
                .map(Cell::text)
                .unwrap_or_default()
        })
    }

    fn print_with<F>(&self, render: F) -> String
    where
        F: Fn(Position) -> String,
    {
        let size = self.printable_size();
        let mut out = String::new();
        for row in 0..size.rows as i64 {
            for col in 0..size.cols as i64 {
                if col > 0 {
                    out.push('\t');
                }
                let _ = write!(out, "{}", render(Position::new(row, col)));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i64, col: i64) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn set_and_read_simple_arithmetic() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "1").unwrap();
        sheet.set_cell(pos(0, 1), "2").unwrap();
        sheet.set_cell(pos(0, 2), "=A1+B1").unwrap();
        assert_eq!(sheet.value_at(pos(0, 2)), CellValue::Number(3.0));
    }

    #[test]
    fn editing_a_dependency_invalidates_downstream_cache() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "1").unwrap();
        sheet.set_cell(pos(0, 1), "=A1*10").unwrap();
        assert_eq!(sheet.value_at(pos(0, 1)), CellValue::Number(10.0));
        sheet.set_cell(pos(0, 0), "2").unwrap();
        assert_eq!(sheet.value_at(pos(0, 1)), CellValue::Number(20.0));
    }

    #[test]
    fn non_numeric_text_in_arithmetic_is_value_error() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "hello").unwrap();
        sheet.set_cell(pos(0, 1), "=A1+1").unwrap();
        assert_eq!(
            sheet.value_at(pos(0, 1)),
            CellValue::Error(FormulaError::Value)
        );
    }

    #[test]
    fn division_by_zero_surfaces_as_div0() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "0").unwrap();
        sheet.set_cell(pos(0, 1), "=10/A1").unwrap();
        assert_eq!(
            sheet.value_at(pos(0, 1)),
            CellValue::Error(FormulaError::Div0)
        );
    }

    #[test]
    fn direct_cycle_is_rejected_and_nothing_is_written() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "=B1").unwrap();
        let err = sheet.set_cell(pos(1, 0), "=A1").unwrap_err();
        assert_eq!(err, EditError::CircularDependency);
        assert!(sheet.get_cell(pos(1, 0)).is_none());
    }

    #[test]
    fn self_cycle_is_rejected() {
        let mut sheet = Sheet::new();
        let err = sheet.set_cell(pos(0, 0), "=A1").unwrap_err();
        assert_eq!(err, EditError::CircularDependency);
    }

    #[test]
    fn referencing_an_unset_cell_materializes_it_then_clear_drops_it() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 1), "=A1").unwrap();
        // A1 now exists as a placeholder but has no text of its own.
        assert!(sheet.get_cell(pos(0, 0)).is_none());
        assert_eq!(sheet.value_at(pos(0, 1)), CellValue::Number(0.0));

        sheet.clear_cell(pos(0, 1));
        // Nothing references A1 anymore, so the placeholder is gone too.
        assert!(sheet.get_cell(pos(0, 0)).is_none());
    }

    #[test]
    fn clearing_a_referenced_cell_keeps_the_placeholder() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "5").unwrap();
        sheet.set_cell(pos(0, 1), "=A1").unwrap();
        sheet.clear_cell(pos(0, 0));
        assert!(sheet.get_cell(pos(0, 0)).is_none());
        assert_eq!(sheet.value_at(pos(0, 1)), CellValue::Number(0.0));
    }

    #[test]
    fn printable_size_and_rendering() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "1").unwrap();
        sheet.set_cell(pos(1, 1), "2").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });
        assert_eq!(sheet.print_values(), "1\t\n\t2\n");
        assert_eq!(sheet.print_texts(), "1\t\n\t2\n");
    }

    #[test]
    fn invalid_position_is_rejected() {
        let mut sheet = Sheet::new();
        let err = sheet.set_cell(Position::invalid(), "1").unwrap_err();
        assert_eq!(err, EditError::InvalidPosition);
    }
}
