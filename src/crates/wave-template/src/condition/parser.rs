//! Recursive-descent parser for the condition expression language.
//!
//! Precedence, low to high: `??`, `||`, `&&`, unary `!`, comparisons, primaries.

use super::ast::{CompareOp, Expr, Literal};
use super::lexer::{tokenize, Token};

pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_coalesce()?;
    parser.expect(&Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), String> {
        if self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {tok:?}, found {:?}", self.peek()))
        }
    }

    fn expect_ident(&mut self, name: &str) -> Result<(), String> {
        match self.peek() {
            Token::Ident(s) if s == name => {
                self.advance();
                Ok(())
            }
            other => Err(format!("expected '{name}', found {other:?}")),
        }
    }

    fn parse_coalesce(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_or()?;
        while *self.peek() == Token::Coalesce {
            self.advance();
            let rhs = self.parse_or()?;
            lhs = Expr::Coalesce(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_primary()?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_coalesce()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                match name.as_str() {
                    "true" => {
                        self.advance();
                        Ok(Expr::Literal(Literal::Bool(true)))
                    }
                    "false" => {
                        self.advance();
                        Ok(Expr::Literal(Literal::Bool(false)))
                    }
                    "null" => {
                        self.advance();
                        Ok(Expr::Literal(Literal::Null))
                    }
                    "try" => {
                        self.advance();
                        let body = self.parse_coalesce()?;
                        self.expect_ident("catch")?;
                        let fallback = self.parse_coalesce()?;
                        Ok(Expr::TryCatch(Box::new(body), Box::new(fallback)))
                    }
                    _ => {
                        self.advance();
                        if *self.peek() == Token::LParen {
                            self.advance();
                            let mut args = Vec::new();
                            if *self.peek() != Token::RParen {
                                args.push(self.parse_coalesce()?);
                                while *self.peek() == Token::Comma {
                                    self.advance();
                                    args.push(self.parse_coalesce()?);
                                }
                            }
                            self.expect(&Token::RParen)?;
                            Ok(Expr::Call(name, args))
                        } else {
                            let mut segments = vec![name];
                            while *self.peek() == Token::Dot {
                                self.advance();
                                match self.advance() {
                                    Token::Ident(seg) => segments.push(seg),
                                    other => return Err(format!("expected field segment, found {other:?}")),
                                }
                            }
                            Ok(Expr::Field(segments))
                        }
                    }
                }
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_comparison() {
        let expr = parse("input.score >= 80").unwrap();
        assert_eq!(
            expr,
            Expr::Compare(
                CompareOp::Ge,
                Box::new(Expr::Field(vec!["input".into(), "score".into()])),
                Box::new(Expr::Literal(Literal::Number(80.0)))
            )
        );
    }

    #[test]
    fn parses_boolean_connectives_and_precedence() {
        let expr = parse("a == 1 && b == 2 || !c").unwrap();
        // should parse without error and have Or at the top
        matches!(expr, Expr::Or(_, _));
    }

    #[test]
    fn parses_try_catch_and_coalesce() {
        let expr = parse("try fromjson(input.raw) catch null").unwrap();
        matches!(expr, Expr::TryCatch(_, _));
        let expr2 = parse("input.x ?? 0").unwrap();
        matches!(expr2, Expr::Coalesce(_, _));
    }
}
