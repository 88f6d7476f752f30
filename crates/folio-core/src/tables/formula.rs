//! Tiny arithmetic language for calculated tables.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | 'x' | func '(' expr ')' | '(' expr ')'
//! func   := 'floor' | 'ceil' | 'round'
//! ```
//!
//! Values are `Decimal`, so `x * 1.5` stays exact.

use crate::error::FolioError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Decimal),
    X,
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Floor,
    Ceil,
    Round,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(Decimal),
    X,
    Neg(Box<Expr>),
    Bin(Op, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

/// A parsed formula over one variable `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FolioError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        if let Some(tok) = parser.peek() {
            return Err(FolioError::Formula(format!(
                "unexpected {tok:?} in '{source}'"
            )));
        }
        Ok(Formula {
            source: source.to_string(),
            expr,
        })
    }

    pub fn eval(&self, x: Decimal) -> Result<Decimal, FolioError> {
        eval(&self.expr, x)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Formula {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, FolioError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = Decimal::from_str(&text)
                    .map_err(|e| FolioError::Formula(format!("bad number '{text}': {e}")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "x" {
                    tokens.push(Token::X);
                } else {
                    tokens.push(Token::Ident(word));
                }
            }
            other => {
                return Err(FolioError::Formula(format!(
                    "unexpected character '{other}' in '{src}'"
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<(), FolioError> {
        match self.next() {
            Some(ref tok) if tok == want => Ok(()),
            Some(tok) => Err(FolioError::Formula(format!(
                "expected {want:?}, found {tok:?}"
            ))),
            None => Err(FolioError::Formula(format!(
                "expected {want:?}, found end of formula"
            ))),
        }
    }

    fn expr(&mut self) -> Result<Expr, FolioError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Op::Add,
                Some(Token::Minus) => Op::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, FolioError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Op::Mul,
                Some(Token::Slash) => Op::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, FolioError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, FolioError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::X) => Ok(Expr::X),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let func = match name.as_str() {
                    "floor" => Func::Floor,
                    "ceil" => Func::Ceil,
                    "round" => Func::Round,
                    _ => return Err(FolioError::Formula(format!("unknown function '{name}'"))),
                };
                self.expect(&Token::LParen)?;
                let arg = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Call(func, Box::new(arg)))
            }
            Some(tok) => Err(FolioError::Formula(format!("unexpected {tok:?}"))),
            None => Err(FolioError::Formula("unexpected end of formula".into())),
        }
    }
}

fn eval(expr: &Expr, x: Decimal) -> Result<Decimal, FolioError> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::X => Ok(x),
        Expr::Neg(inner) => Ok(-eval(inner, x)?),
        Expr::Call(func, arg) => {
            let v = eval(arg, x)?;
            Ok(match func {
                Func::Floor => v.floor(),
                Func::Ceil => v.ceil(),
                Func::Round => v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            })
        }
        Expr::Bin(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, x)?, eval(rhs, x)?);
            let result = match op {
                Op::Add => a.checked_add(b),
                Op::Sub => a.checked_sub(b),
                Op::Mul => a.checked_mul(b),
                Op::Div => {
                    if b.is_zero() {
                        return Err(FolioError::Formula(format!("division by zero at x = {x}")));
                    }
                    a.checked_div(b)
                }
            };
            result.ok_or_else(|| FolioError::Formula(format!("overflow at x = {x}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eval_at(src: &str, x: Decimal) -> Decimal {
        Formula::parse(src).unwrap().eval(x).unwrap()
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(eval_at("2 + x * 3", dec!(4)), dec!(14));
        assert_eq!(eval_at("(2 + x) * 3", dec!(4)), dec!(18));
        assert_eq!(eval_at("x - 2 - 1", dec!(10)), dec!(7));
        assert_eq!(eval_at("x / 2 / 5", dec!(100)), dec!(10));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_at("-x + 1", dec!(3)), dec!(-2));
        assert_eq!(eval_at("2 * -x", dec!(3)), dec!(-6));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval_at("floor(x / 2)", dec!(7)), dec!(3));
        assert_eq!(eval_at("ceil(x / 2)", dec!(7)), dec!(4));
        assert_eq!(eval_at("round(x / 2)", dec!(5)), dec!(3));
        assert_eq!(eval_at("floor((x - 10) / 2)", dec!(15)), dec!(2));
        assert_eq!(eval_at("floor((x - 10) / 2)", dec!(9)), dec!(-1));
    }

    #[test]
    fn test_decimal_is_exact() {
        assert_eq!(eval_at("x * 1.5", dec!(3)), dec!(4.5));
        assert_eq!(eval_at("x * 0.1 + 0.2", dec!(1)), dec!(0.3));
    }

    #[test]
    fn test_division_by_zero_is_formula_error() {
        let f = Formula::parse("10 / (x - 3)").unwrap();
        assert!(f.eval(dec!(4)).is_ok());
        assert!(matches!(f.eval(dec!(3)), Err(FolioError::Formula(_))));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Formula::parse("x +").is_err());
        assert!(Formula::parse("sqrt(x)").is_err());
        assert!(Formula::parse("(x").is_err());
        assert!(Formula::parse("x y").is_err());
        assert!(Formula::parse("x % 2").is_err());
    }
}
