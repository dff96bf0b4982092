//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree for formula expressions, and
//! evaluates it against a caller-supplied cell lookup.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser builds
//! this tree. `Expr::evaluate` then walks it, resolving `CellRef` nodes
//! through the lookup closure and propagating `FormulaError` the moment any
//! operand raises one.
//!
//! SUPPORTED EXPRESSIONS:
//! - Numeric literals
//! - Single-cell references (A1, AB27, ...)
//! - Binary operations: +, -, *, /
//! - Unary negation: -x
//! - Parenthesized grouping (structural, not a node — precedence is
//!   recovered losslessly by the parser, so there is nothing to keep)

use crate::error::FormulaError;
use crate::position::Position;
use std::collections::BTreeSet;

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    CellRef(Position),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Negate,
}

impl Expr {
    /// Evaluates the tree. `lookup` maps a referenced position to a `f64`,
    /// raising a `FormulaError` per the same rules a cell's text-to-number
    /// coercion uses. The first error encountered, in evaluation order,
    /// wins and short-circuits the rest of the tree.
    pub fn evaluate<F>(&self, lookup: &F) -> Result<f64, FormulaError>
    where
        F: Fn(Position) -> Result<f64, FormulaError>,
    {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::CellRef(pos) => lookup(*pos),
            Expr::UnaryOp { op, operand } => {
                let value = operand.evaluate(lookup)?;
                match op {
                    UnaryOperator::Negate => finite_or_div0(-value),
                }
            }
            Expr::BinaryOp { left, op, right } => {
                let lhs = left.evaluate(lookup)?;
                let rhs = right.evaluate(lookup)?;
                let result = match op {
                    BinaryOperator::Add => lhs + rhs,
                    BinaryOperator::Subtract => lhs - rhs,
                    BinaryOperator::Multiply => lhs * rhs,
                    BinaryOperator::Divide => {
                        if rhs == 0.0 {
                            return Err(FormulaError::Div0);
                        }
                        lhs / rhs
                    }
                };
                finite_or_div0(result)
            }
        }
    }

    /// All valid positions referenced in the tree, de-duplicated and in
    /// ascending order. Out-of-bounds references are omitted here even
    /// though `evaluate` still visits them (and raises `Ref` for them).
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut set = BTreeSet::new();
        self.collect_refs(&mut set);
        set.into_iter().collect()
    }

    fn collect_refs(&self, set: &mut BTreeSet<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef(pos) => {
                if pos.is_valid() {
                    set.insert(*pos);
                }
            }
            Expr::UnaryOp { operand, .. } => operand.collect_refs(set),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_refs(set);
                right.collect_refs(set);
            }
        }
    }

    /// Renders the tree back into formula text, adding parentheses only
    /// where precedence would otherwise change the parsed structure.
    pub fn to_canonical_string(&self) -> String {
        self.render(Precedence::Lowest)
    }

    fn render(&self, context: Precedence) -> String {
        match self {
            Expr::Number(n) => format!("{}", n),
            Expr::CellRef(pos) => pos.to_text(),
            Expr::UnaryOp { operand, .. } => {
                let inner = operand.render(Precedence::Unary);
                let rendered = format!("-{}", inner);
                if Precedence::Unary < context {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
            Expr::BinaryOp { left, op, right } => {
                let own = Precedence::of(*op);
                let left_str = left.render(own);
                // The right operand always gets parens at an equal or lower
                // precedence: `a - (b - c)` and `a - b - c` parse to
                // different trees, so equality must not be trusted either.
                let right_context = match own {
                    Precedence::Additive | Precedence::Multiplicative => {
                        Precedence::from_u8(own.as_u8() + 1)
                    }
                    other => other,
                };
                let right_str = right.render(right_context);
                let rendered = format!("{}{}{}", left_str, op_text(*op), right_str);
                if own < context {
                    format!("({})", rendered)
                } else {
                    rendered
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use proptest::prelude::*;

    fn arb_position() -> impl Strategy<Value = Position> {
        (0i64..50, 0i64..50).prop_map(|(row, col)| Position::new(row, col))
    }

    fn arb_leaf() -> impl Strategy<Value = Expr> {
        prop_oneof![
            (0i64..1000).prop_map(|n| Expr::Number(n as f64)),
            arb_position().prop_map(Expr::CellRef),
        ]
    }

    /// Numbers stay non-negative in generation: a negated literal renders as
    /// `-5` and reparses as `UnaryOp(Negate, Number(5))`, not `Number(-5)`,
    /// so a generated `Number(-5)` would never round-trip to itself.
    fn arb_expr() -> impl Strategy<Value = Expr> {
        arb_leaf().prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                inner
                    .clone()
                    .prop_map(|operand| Expr::UnaryOp {
                        op: UnaryOperator::Negate,
                        operand: Box::new(operand),
                    }),
                (
                    inner.clone(),
                    prop_oneof![
                        Just(BinaryOperator::Add),
                        Just(BinaryOperator::Subtract),
                        Just(BinaryOperator::Multiply),
                        Just(BinaryOperator::Divide),
                    ],
                    inner,
                )
                    .prop_map(|(left, op, right)| Expr::BinaryOp {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    }),
            ]
        })
    }

    proptest! {
        /// Canonical-form round-trip: reparsing a tree's own canonical text
        /// reproduces the same tree.
        #[test]
        fn canonical_form_round_trips(expr in arb_expr()) {
            let text = expr.to_canonical_string();
            let reparsed = parse(&text).expect("canonical text must reparse");
            prop_assert_eq!(reparsed, expr);
        }
    }
}

fn finite_or_div0(value: f64) -> Result<f64, FormulaError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::Div0)
    }
}

fn op_text(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Additive,
    Multiplicative,
    Unary,
}

impl Precedence {
    fn of(op: BinaryOperator) -> Self {
        match op {
            BinaryOperator::Add | BinaryOperator::Subtract => Precedence::Additive,
            BinaryOperator::Multiply | BinaryOperator::Divide => Precedence::Multiplicative,
        }
    }

    fn as_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(n: u8) -> Self {
        match n {
            0 => Precedence::Lowest,
            1 => Precedence::Additive,
            2 => Precedence::Multiplicative,
            _ => Precedence::Unary,
        }
    }
}
