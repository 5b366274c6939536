use crate::lexer::{LinedToken, Token};
use crate::parser::{InnerParseError, ParseError, Result};

#[derive(Debug)]
pub struct Cursor<'a> {
    tokens: &'a [LinedToken],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [LinedToken]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position).map(LinedToken::get_inner)
    }

    pub fn peek_lined(&self) -> Option<&'a LinedToken> {
        self.tokens.get(self.position)
    }

    pub fn bump(&mut self) {
        self.position += 1;
    }

    pub fn bump_if(&mut self, t: &Token) -> bool {
        let condition = self.peek() == Some(t);
        if condition {
            self.bump();
        }
        condition
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Consumes the next token, failing when it differs from `t`. Returns
    /// the consumed token so callers can anchor AST nodes on it.
    pub fn expect(&mut self, t: &Token) -> Result<LinedToken> {
        let next = self.next_or_error()?;
        if next.get_inner() == t {
            Ok(next.clone())
        } else {
            Err(InnerParseError::ExpectedButGot(t.clone(), next.get_inner().clone()).at(next))
        }
    }

    /// Consumes an identifier token and returns it.
    pub fn expect_ident(&mut self) -> Result<(String, LinedToken)> {
        let next = self.next_or_error()?;
        if let Token::Ident(name) = next.get_inner() {
            Ok((name.clone(), next.clone()))
        } else {
            Err(InnerParseError::ExpectedIdentifierButGot(next.get_inner().clone()).at(next))
        }
    }

    pub fn peek_or_error(&self) -> Result<&'a LinedToken> {
        self.peek_lined()
            .ok_or_else(|| InnerParseError::UnexpectedEof.at_eof())
    }

    pub fn next_or_error(&mut self) -> Result<&'a LinedToken> {
        let next = self
            .tokens
            .get(self.position)
            .ok_or_else(|| InnerParseError::UnexpectedEof.at_eof())?;
        self.position += 1;
        Ok(next)
    }
}
