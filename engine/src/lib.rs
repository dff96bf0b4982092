//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//! The evaluation pipeline: `Sheet::set_cell` parses and cycle-checks a
//! formula via `Cell`, which wraps a `Formula` built by the sibling parser
//! crate around `sheetcalc_parser::Expr`.

pub mod cell;
pub mod cycle;
pub mod formula;
pub mod sheet;

pub use cell::{CandidateKind, Cell, CellValue};
pub use formula::Formula;
pub use sheet::{EditError, Sheet};
pub use sheetcalc_parser::{FormulaError, ParseError, Position, Size, MAX_COLS, MAX_ROWS};
