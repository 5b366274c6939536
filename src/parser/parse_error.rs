use crate::lexer::{LinedToken, Token};
use crate::symbols::Identifier;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, PartialEq)]
pub enum InnerParseError {
    ExpectedButGot(Token, Token),
    ExpectedIdentifierButGot(Token),
    UndeclaredIdentifier(Identifier),
    Redeclaration(Identifier),
    NotAProcedure(Identifier),
    StatementExpected(Token),
    FactorExpected(Token),
    ConstantInitializerExpected(Identifier),
    ConstantTypeMismatch(Identifier),
    DimensionExpected(Token),
    BadArrayDimension(i64),
    OpenArrayNotAllowed,
    ClosingIdentMismatch(Identifier, Identifier),
    TrailingInput(Token),
    UnexpectedEof,
}

/// First syntactic error; carries the offending token (absent only at
/// end-of-input).
#[derive(Debug, PartialEq)]
pub struct ParseError {
    pub inner: InnerParseError,
    token: Option<LinedToken>,
}

impl ParseError {
    pub fn get_token(&self) -> Option<&LinedToken> {
        self.token.as_ref()
    }
}

impl InnerParseError {
    pub(super) fn at(self, token: &LinedToken) -> ParseError {
        ParseError {
            inner: self,
            token: Some(token.clone()),
        }
    }

    pub(super) fn at_eof(self) -> ParseError {
        ParseError {
            inner: self,
            token: None,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.token {
            Some(t) => write!(f, "{}:{}: {}", t.get_ln(), t.get_col(), self.inner),
            None => write!(f, "{}", self.inner),
        }
    }
}

impl Display for InnerParseError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        use InnerParseError as PE;
        match self {
            PE::ExpectedButGot(expected, got) => {
                write!(f, "expected token {expected:?}, but got {got:?}")
            }
            PE::ExpectedIdentifierButGot(token) => {
                write!(f, "expected identifier, but got {token:?}")
            }
            PE::UndeclaredIdentifier(name) => write!(f, "undeclared identifier \"{name}\""),
            PE::Redeclaration(name) => write!(f, "re-declaration of \"{name}\""),
            PE::NotAProcedure(name) => write!(f, "\"{name}\" is not a subroutine"),
            PE::StatementExpected(t) => write!(f, "statement expected, but got {t:?}"),
            PE::FactorExpected(t) => write!(f, "factor expected, but got {t:?}"),
            PE::ConstantInitializerExpected(name) => {
                write!(f, "constant expression expected in initializer of \"{name}\"")
            }
            PE::ConstantTypeMismatch(name) => {
                write!(f, "initializer type does not match declaration of \"{name}\"")
            }
            PE::DimensionExpected(t) => {
                write!(f, "array dimension expected, but got {t:?}")
            }
            PE::BadArrayDimension(n) => write!(f, "array dimension must be positive, got {n}"),
            PE::OpenArrayNotAllowed => {
                write!(f, "open arrays are only allowed in parameter types")
            }
            PE::ClosingIdentMismatch(opening, closing) => {
                write!(
                    f,
                    "closing identifier mismatch (\"{opening}\" opened, \"{closing}\" closes)"
                )
            }
            PE::TrailingInput(t) => write!(f, "input continues after module end: {t:?}"),
            PE::UnexpectedEof => write!(f, "reached unexpected EOF"),
        }
    }
}

impl std::error::Error for ParseError {}
