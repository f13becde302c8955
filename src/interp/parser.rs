//! Recursive-descent parser from the lexer's token stream to `ast::Expr`.
//! Precedence (low to high): lambda/ternary, or, and, not, comparisons,
//! `&`, `+ -`, `* / %`, unary `- ~`, postfix call/index/slice, atom.

use std::rc::Rc;
use thiserror::Error;

use super::ast::{BinOp, Expr, ListItem, UnOp};
use super::lexer::{lex, LexError, Token};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: Option<Token> },
}

pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let e = p.parse_expr()?;
    if p.pos != p.tokens.len() {
        return Err(ParseError::UnexpectedToken(p.tokens[p.pos].clone()));
    }
    Ok(e)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(ParseError::Expected { expected, found: self.peek().cloned() })
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if let Some(Token::Ident(s)) = self.peek() {
            if &**s == name {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if &**s == name)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek_ident("lambda") {
            return self.parse_lambda();
        }
        self.parse_ternary()
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        self.eat_ident("lambda");
        let mut params = Vec::new();
        if !self.eat(&Token::Colon) {
            loop {
                match self.advance() {
                    Some(Token::Ident(name)) => params.push(name),
                    other => {
                        return Err(ParseError::Expected {
                            expected: "parameter name",
                            found: other,
                        })
                    }
                }
                if self.eat(&Token::Comma) {
                    continue;
                }
                break;
            }
            self.expect(&Token::Colon, "':'")?;
        }
        let body = self.parse_expr()?;
        Ok(Expr::Lambda { params, body: Box::new(body) })
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let then = self.parse_or()?;
        if self.eat_ident("if") {
            let cond = self.parse_or()?;
            if !self.eat_ident("else") {
                return Err(ParseError::Expected { expected: "'else'", found: self.peek().cloned() });
            }
            let els = self.parse_ternary()?;
            return Ok(Expr::If { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) });
        }
        Ok(then)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat_ident("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        while self.eat_ident("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_ident("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_bitand()?;
        let op = match self.peek() {
            Some(Token::Lt) => Some(BinOp::Lt),
            Some(Token::Le) => Some(BinOp::Le),
            Some(Token::Gt) => Some(BinOp::Gt),
            Some(Token::Ge) => Some(BinOp::Ge),
            Some(Token::EqEq) => Some(BinOp::Eq),
            Some(Token::NotEq) => Some(BinOp::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let rhs = self.parse_bitand()?;
            return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_add()?;
        while self.eat(&Token::Amp) {
            let rhs = self.parse_add()?;
            lhs = Expr::Binary(BinOp::BitAnd, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinOp::Add
            } else if self.eat(&Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinOp::Mul
            } else if self.eat(&Token::Slash) {
                BinOp::Div
            } else if self.eat(&Token::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Tilde) {
            return Ok(Expr::Unary(UnOp::BitNot, Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.parse_atom()?;
        loop {
            if self.eat(&Token::LParen) {
                let args = self.parse_call_args()?;
                e = Expr::Call { func: Box::new(e), args };
            } else if self.eat(&Token::LBracket) {
                e = self.parse_index_or_slice(e)?;
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        let first = self.parse_expr()?;
        if self.eat_ident("for") {
            let comp = self.parse_comprehension_tail(first)?;
            self.expect(&Token::RParen, "')'")?;
            args.push(comp);
            return Ok(args);
        }
        args.push(first);
        while self.eat(&Token::Comma) {
            if self.peek() == Some(&Token::RParen) {
                break;
            }
            args.push(self.parse_expr()?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(args)
    }

    fn parse_comprehension_tail(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        let var = match self.advance() {
            Some(Token::Ident(name)) => name,
            other => return Err(ParseError::Expected { expected: "comprehension variable", found: other }),
        };
        if !self.eat_ident("in") {
            return Err(ParseError::Expected { expected: "'in'", found: self.peek().cloned() });
        }
        let iter = self.parse_or()?;
        let cond = if self.eat_ident("if") {
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        Ok(Expr::Comprehension { expr: Box::new(expr), var, iter: Box::new(iter), cond })
    }

    fn parse_index_or_slice(&mut self, base: Expr) -> Result<Expr, ParseError> {
        if self.eat(&Token::Colon) {
            let hi = if self.peek() == Some(&Token::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) };
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Slice(Box::new(base), None, hi));
        }
        let first = self.parse_expr()?;
        if self.eat(&Token::Colon) {
            let hi = if self.peek() == Some(&Token::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) };
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Slice(Box::new(base), Some(Box::new(first)), hi));
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::Index(Box::new(base), Box::new(first)))
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        if self.peek_ident("lambda") {
            return self.parse_lambda();
        }
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(e)
            }
            Some(Token::LBracket) => self.parse_list_literal(),
            other => Err(ParseError::Expected { expected: "expression", found: other }),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let spread = self.eat(&Token::Star);
        let first = self.parse_expr()?;
        if !spread && self.eat_ident("for") {
            let comp = self.parse_comprehension_tail(first)?;
            self.expect(&Token::RBracket, "']'")?;
            return Ok(comp);
        }
        let mut items = vec![if spread { ListItem::Spread(first) } else { ListItem::Elem(first) }];
        while self.eat(&Token::Comma) {
            if self.peek() == Some(&Token::RBracket) {
                break;
            }
            let spread = self.eat(&Token::Star);
            let e = self.parse_expr()?;
            items.push(if spread { ListItem::Spread(e) } else { ListItem::Elem(e) });
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic() {
        parse("1 + 1").unwrap();
        parse("input * input + 1").unwrap();
    }

    #[test]
    fn parses_ternary_and_lambda() {
        parse("1 if input < 1 else 0").unwrap();
        parse("lambda x, y: x + y").unwrap();
    }

    #[test]
    fn parses_list_and_slice() {
        parse("[1, 2, *input]").unwrap();
        parse("input[0:2]").unwrap();
        parse("sorted(input)").unwrap();
    }

    #[test]
    fn parses_comprehensions() {
        parse("[x for x in input if x > 0]").unwrap();
        parse("any(x < 0 for x in input)").unwrap();
    }

    #[test]
    fn parses_z_combinator_application() {
        parse("(z(lambda rec: lambda x: 1 if x == 0 else rec(x - 1) * x))(input)").unwrap();
    }
}
