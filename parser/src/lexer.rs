//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string (without the leading `=`) and produces
//! a stream of Tokens.
//! CONTEXT: First stage of the parsing pipeline. Identifiers absorb trailing
//! digits so that a cell reference like `A1` lexes as a single token; the
//! parser is responsible for splitting it back into column letters and row
//! number.

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),
            Some(ch) if ch.is_ascii_alphabetic() => self.read_identifier(ch),

            None => Token::EOF,
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(first_char),
        }
    }

    /// Reads letters followed by optional digits, e.g. `A1`, `AA`, `ZZ701`.
    /// Stops at the first character that is neither a letter nor a digit, so
    /// `A1+` lexes as `Identifier("A1")` then `Plus`.
    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphabetic() || ch.is_ascii_digit() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        Token::Identifier(ident.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok == Token::EOF;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_arithmetic() {
        assert_eq!(
            tokens("1+2*3"),
            vec![
                Token::Number(1.0),
                Token::Plus,
                Token::Number(2.0),
                Token::Asterisk,
                Token::Number(3.0),
                Token::EOF
            ]
        );
    }

    #[test]
    fn lexes_cell_reference_as_one_identifier() {
        assert_eq!(
            tokens("A1+B2"),
            vec![
                Token::Identifier("A1".to_string()),
                Token::Plus,
                Token::Identifier("B2".to_string()),
                Token::EOF
            ]
        );
    }

    #[test]
    fn lexes_unary_minus_and_parens() {
        assert_eq!(
            tokens("-(A1)"),
            vec![
                Token::Minus,
                Token::LParen,
                Token::Identifier("A1".to_string()),
                Token::RParen,
                Token::EOF
            ]
        );
    }

    #[test]
    fn skips_whitespace() {
        assert_eq!(
            tokens("  1 +  2 "),
            vec![Token::Number(1.0), Token::Plus, Token::Number(2.0), Token::EOF]
        );
    }
}
