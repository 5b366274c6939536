use std::{error, fmt};

#[derive(Debug, Eq, PartialEq)]
pub enum InnerLexError {
    UnexpectedChar(char),
    BadConstantSuffix(char),
    NumberTooBig(String),
    UnterminatedChar,
    UnterminatedString,
    BadEscape(char),
    SingleAmpersand,
    SinglePipe,
    UnexpectedEof,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LexError {
    inner: InnerLexError,
    ln: u64,
    col: u64,
}

impl LexError {
    pub fn get_ln(&self) -> u64 {
        self.ln
    }

    pub fn get_col(&self) -> u64 {
        self.col
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.ln, self.col, self.inner)
    }
}

impl InnerLexError {
    pub(super) fn at(self, ln: u64, col: u64) -> LexError {
        LexError {
            inner: self,
            ln,
            col,
        }
    }
}

impl error::Error for InnerLexError {}
impl fmt::Display for InnerLexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character: {c}"),
            Self::BadConstantSuffix(c) => write!(f, "bad constant suffix: {c}"),
            Self::NumberTooBig(s) => write!(f, "numeric constant out of range: {s}"),
            Self::UnterminatedChar => write!(f, "unterminated character constant"),
            Self::UnterminatedString => write!(f, "unterminated string constant"),
            Self::BadEscape(c) => write!(f, "unknown escape sequence: \\{c}"),
            Self::SingleAmpersand => write!(f, "expected '&&', but got a single '&'"),
            Self::SinglePipe => write!(f, "expected '||', but got a single '|'"),
            Self::UnexpectedEof => write!(f, "reached unexpected end of file"),
        }
    }
}

impl error::Error for LexError {}
