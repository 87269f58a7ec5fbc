use std::fmt::{Display, Formatter};

use crate::{Expr, LogicError};

type ParseResult<T> = Result<T, LogicError>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum TokenKind {
    Lambda,
    Exists,
    All,
    Dot,
    LParen,
    RParen,
    Comma,
    Not,
    And,
    Or,
    Imp,
    Iff,
    Eq,
    Neq,
    Ident(String),
    FeatVar(String),
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Lambda => f.write_str("'\\'"),
            TokenKind::Exists => f.write_str("'exists'"),
            TokenKind::All => f.write_str("'all'"),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Not => f.write_str("'-'"),
            TokenKind::And => f.write_str("'&'"),
            TokenKind::Or => f.write_str("'|'"),
            TokenKind::Imp => f.write_str("'->'"),
            TokenKind::Iff => f.write_str("'<->'"),
            TokenKind::Eq => f.write_str("'='"),
            TokenKind::Neq => f.write_str("'!='"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::FeatVar(s) => write!(f, "placeholder '?{}'", s),
            TokenKind::Eof => f.write_str("end of expression"),
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.input.get(self.position + ahead).copied()
    }

    fn lex_ident(&mut self) -> String {
        let start = self.position;
        while self.peek(0).map_or(false, is_ident_char) {
            self.position += 1;
        }
        self.input[start..self.position].iter().collect()
    }

    fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            while self.peek(0).map_or(false, char::is_whitespace) {
                self.position += 1;
            }
            let offset = self.position;
            let c = match self.peek(0) {
                Some(c) => c,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        offset,
                    });
                    return Ok(tokens);
                }
            };

            let (kind, width) = match c {
                '\\' => (TokenKind::Lambda, 1),
                '.' => (TokenKind::Dot, 1),
                '(' => (TokenKind::LParen, 1),
                ')' => (TokenKind::RParen, 1),
                ',' => (TokenKind::Comma, 1),
                '&' => (TokenKind::And, 1),
                '|' => (TokenKind::Or, 1),
                '=' => (TokenKind::Eq, 1),
                '-' if self.peek(1) == Some('>') => (TokenKind::Imp, 2),
                '-' => (TokenKind::Not, 1),
                '<' if self.peek(1) == Some('-') && self.peek(2) == Some('>') => {
                    (TokenKind::Iff, 3)
                }
                '!' if self.peek(1) == Some('=') => (TokenKind::Neq, 2),
                '?' if self.peek(1).map_or(false, is_ident_char) => {
                    self.position += 1;
                    let name = self.lex_ident();
                    (TokenKind::FeatVar(name), 0)
                }
                c if is_ident_char(c) => {
                    let name = self.lex_ident();
                    let kind = match name.as_str() {
                        "exists" => TokenKind::Exists,
                        "all" => TokenKind::All,
                        _ => TokenKind::Ident(name),
                    };
                    (kind, 0)
                }
                ch => return Err(LogicError::BadChar { ch, offset }),
            };
            self.position += width;
            tokens.push(Token { kind, offset });
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

/// Parses a lambda term. Binders extend as far to the right as possible; otherwise precedence
/// from tightest to loosest is application, `-`, `=`/`!=`, `&`, `|`, `->`, `<->`.
pub fn parse(input: &str) -> ParseResult<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let expr = parser.parse_expression()?;
    if !parser.is_at_end() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

impl Parser {
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_iff()
    }

    fn parse_iff(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_imp()?;
        while self.check(&TokenKind::Iff) {
            self.advance();
            let right = self.parse_imp()?;
            left = Expr::Iff(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_imp(&mut self) -> ParseResult<Expr> {
        let left = self.parse_or()?;
        if self.check(&TokenKind::Imp) {
            self.advance();
            let right = self.parse_imp()?;
            return Ok(Expr::Imp(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let left = self.parse_unary()?;
        if self.check(&TokenKind::Eq) {
            self.advance();
            let right = self.parse_unary()?;
            Ok(Expr::Eq(Box::new(left), Box::new(right)))
        } else if self.check(&TokenKind::Neq) {
            self.advance();
            let right = self.parse_unary()?;
            Ok(Expr::Not(Box::new(Expr::Eq(Box::new(left), Box::new(right)))))
        } else {
            Ok(left)
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.current().kind {
            TokenKind::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            TokenKind::Lambda | TokenKind::Exists | TokenKind::All => self.parse_binder(),
            _ => self.parse_application(),
        }
    }

    fn parse_binder(&mut self) -> ParseResult<Expr> {
        let binder = self.current().kind.clone();
        self.advance();

        let mut vars = Vec::new();
        while let TokenKind::Ident(name) = &self.current().kind {
            vars.push(name.clone());
            self.advance();
        }
        if vars.is_empty() {
            return Err(self.unexpected("bound variable"));
        }
        self.expect(TokenKind::Dot, "'.'")?;
        let body = self.parse_expression()?;

        Ok(vars.into_iter().rev().fold(body, |body, var| {
            let body = Box::new(body);
            match binder {
                TokenKind::Exists => Expr::Exists(var, body),
                TokenKind::All => Expr::All(var, body),
                _ => Expr::Lambda(var, body),
            }
        }))
    }

    fn parse_application(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        while self.check(&TokenKind::LParen) {
            self.advance();
            let mut args = vec![self.parse_expression()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
            self.expect(TokenKind::RParen, "')'")?;
            expr = Expr::app(expr, args);
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(name))
            }
            TokenKind::FeatVar(name) => {
                self.advance();
                Ok(Expr::FeatVar(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("term")),
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<()> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> LogicError {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => LogicError::UnexpectedEnd(expected),
            _ => LogicError::UnexpectedToken {
                expected,
                found: token.kind.to_string(),
                offset: token.offset,
            },
        }
    }
}
