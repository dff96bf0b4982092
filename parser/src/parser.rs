//! FILENAME: parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into
//! an `Expr` tree.
//! CONTEXT: Second stage of the parsing pipeline.
//!
//! GRAMMAR:
//!   expression     --> additive
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> "-" unary | primary
//!   primary        --> NUMBER | cell_ref | "(" expression ")"
//!   cell_ref       --> IDENTIFIER   -- split into letters+digits by the parser

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::position::Position;
use crate::token::Token;

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the entire input (the formula body, without a leading `=`).
    pub fn parse(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::EOF {
            return Err(ParseError::new("empty expression"));
        }

        let expr = self.parse_additive()?;

        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Identifier(name) => {
                self.advance();
                parse_cell_ref(&name)
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_additive()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(ParseError::new(format!(
                "unexpected token: {}",
                other
            ))),
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "expected {}, found {}",
                expected, self.current_token
            )))
        }
    }
}

/// Splits an identifier like `A1` or `AB27` into a cell reference. There are
/// no named ranges or functions in this grammar, so anything that isn't
/// letters-then-digits is a syntax error.
fn parse_cell_ref(name: &str) -> ParseResult<Expr> {
    let col_part: String = name.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let rest = &name[col_part.len()..];

    if col_part.is_empty() || rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::new(format!("not a valid cell reference: {}", name)));
    }

    Ok(Expr::CellRef(Position::from_str(name)))
}

/// Parses a formula body (the text after a leading `=`).
pub fn parse(input: &str) -> ParseResult<Expr> {
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator as Op, Expr::*};

    #[test]
    fn parses_simple_arithmetic() {
        let expr = parse("1+2*3").unwrap();
        assert_eq!(
            expr,
            BinaryOp {
                left: Box::new(Number(1.0)),
                op: Op::Add,
                right: Box::new(BinaryOp {
                    left: Box::new(Number(2.0)),
                    op: Op::Multiply,
                    right: Box::new(Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse("(1+2)*3").unwrap();
        assert_eq!(
            expr,
            BinaryOp {
                left: Box::new(BinaryOp {
                    left: Box::new(Number(1.0)),
                    op: Op::Add,
                    right: Box::new(Number(2.0)),
                }),
                op: Op::Multiply,
                right: Box::new(Number(3.0)),
            }
        );
    }

    #[test]
    fn parses_cell_references() {
        let expr = parse("A1+A2").unwrap();
        match expr {
            BinaryOp { left, right, .. } => {
                assert_eq!(*left, CellRef(Position::from_str("A1")));
                assert_eq!(*right, CellRef(Position::from_str("A2")));
            }
            _ => panic!("expected BinaryOp"),
        }
    }

    #[test]
    fn parses_unary_minus() {
        let expr = parse("-A1").unwrap();
        assert_eq!(
            expr,
            UnaryOp {
                op: crate::ast::UnaryOperator::Negate,
                operand: Box::new(CellRef(Position::from_str("A1"))),
            }
        );
    }

    #[test]
    fn rejects_empty_formula() {
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn rejects_unmatched_paren() {
        assert!(parse("(1+2").is_err());
    }

    #[test]
    fn rejects_non_cell_identifier() {
        assert!(parse("SUM(A1)").is_err());
        assert!(parse("TAX_RATE").is_err());
    }
}
