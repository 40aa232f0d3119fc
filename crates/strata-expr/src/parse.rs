//! Recursive-descent parser from tokens to [`Expr`].

use strata_core::ExprError;

use crate::ast::{BinOp, Expr};
use crate::token::{tokenize, Token};

/// Nesting limit for parentheses, unary minus and calls.
const MAX_NESTING: usize = 128;

/// Parse a formula into an expression tree.
///
/// This checks syntax only; function names are resolved by
/// [`Formula::validate`](crate::Formula::validate).
pub fn parse(formula: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser {
        formula,
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    if tokens.is_empty() {
        return Err(parser.error("empty formula".into()));
    }
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(t) => Err(parser.error(format!("unexpected '{t}' after expression"))),
    }
}

struct Parser<'a> {
    formula: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: String) -> ExprError {
        ExprError::Malformed {
            formula: self.formula.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: &Token) -> Result<(), ExprError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(self.error(format!("expected '{want}', found '{t}'"))),
            None => Err(self.error(format!("expected '{want}', found end of formula"))),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep".into()));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(*v)),
            Some(Token::Placeholder(label)) => Ok(Expr::Field(label.clone())),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(self.error(format!(
                        "'{name}' is not a placeholder; write '#{name}#' or call '{name}(...)'"
                    )));
                }
                self.pos += 1;
                self.enter()?;
                let args = self.arguments()?;
                self.depth -= 1;
                Ok(Expr::Call {
                    name: name.clone(),
                    args,
                })
            }
            Some(t) => Err(self.error(format!("unexpected '{t}'"))),
            None => Err(self.error("unexpected end of formula".into())),
        }
    }

    /// Arguments after the opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(t) => return Err(self.error(format!("expected ',' or ')', found '{t}'"))),
                None => return Err(self.error("unclosed argument list".into())),
            }
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
