mod cursor;
mod lexer_error;
#[cfg(test)]
mod lexer_tests;
mod token;

use cursor::Cursor;
pub use lexer_error::{InnerLexError, LexError};
pub use token::{LinedToken, Token};

pub type Tokens = Vec<LinedToken>;

fn lex_mcharoperator(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    let first = cursor.take().expect("Is always Some");
    match first {
        ':' => {
            if cursor.bump_if('=') {
                Ok(Token::Assign)
            } else {
                Ok(Token::Colon)
            }
        }
        '<' => {
            if cursor.bump_if('=') {
                Ok(Token::IsLessThanOrEqual)
            } else {
                Ok(Token::IsLessThan)
            }
        }
        '>' => {
            if cursor.bump_if('=') {
                Ok(Token::IsGreaterThanOrEqual)
            } else {
                Ok(Token::IsGreaterThan)
            }
        }
        '&' => {
            if cursor.bump_if('&') {
                Ok(Token::LogicalAnd)
            } else {
                Err(InnerLexError::SingleAmpersand)
            }
        }
        '|' => {
            if cursor.bump_if('|') {
                Ok(Token::LogicalOr)
            } else {
                Err(InnerLexError::SinglePipe)
            }
        }
        _ => unreachable!("not a multi-char operator start: {first}"),
    }
}

fn lex_constant(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    let start = cursor.as_str();
    let mut count = 0;

    while cursor.skip_if(|c| c.is_ascii_digit()) {
        count += 1;
    }

    let is_long = cursor.bump_if('L') || cursor.bump_if('l');

    let is_bad = |c: &char| c.is_alphabetic() || *c == '_';
    if let Some(bad_suffix) = cursor.peek().filter(is_bad) {
        return Err(InnerLexError::BadConstantSuffix(bad_suffix));
    }

    let const_str = &start[..count];
    let parsed = const_str
        .parse::<i64>()
        .map_err(|_| InnerLexError::NumberTooBig(const_str.to_owned()))?;

    if is_long {
        Ok(Token::LNumber(parsed))
    } else {
        Ok(Token::Number(parsed))
    }
}

fn lex_identifier(cursor: &mut Cursor) -> Token {
    let start = cursor.as_str();
    let mut len = 0;

    let predicate = |c: char| c.is_ascii_alphanumeric() || c == '_';
    while cursor.skip_if(predicate) {
        len += 1;
    }

    Token::from(&start[..len])
}

fn unescape(cursor: &mut Cursor) -> Result<char, InnerLexError> {
    let c = cursor.take().ok_or(InnerLexError::UnexpectedEof)?;
    if c != '\\' {
        return Ok(c);
    }
    let escaped = cursor.take().ok_or(InnerLexError::UnexpectedEof)?;
    match escaped {
        'n' => Ok('\n'),
        't' => Ok('\t'),
        '0' => Ok('\0'),
        '\'' => Ok('\''),
        '"' => Ok('"'),
        '\\' => Ok('\\'),
        other => Err(InnerLexError::BadEscape(other)),
    }
}

fn lex_char(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    cursor.take();
    let c = unescape(cursor)?;
    if !cursor.bump_if('\'') {
        return Err(InnerLexError::UnterminatedChar);
    }
    Ok(Token::CharConst(c))
}

fn lex_string(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    cursor.take();
    let mut value = String::new();
    loop {
        match cursor.peek() {
            None | Some('\n') => return Err(InnerLexError::UnterminatedString),
            Some('"') => {
                cursor.take();
                return Ok(Token::StringConst(value));
            }
            Some(_) => value.push(unescape(cursor)?),
        }
    }
}

pub fn lex(input: &str) -> Result<Tokens, LexError> {
    let mut tokens = Tokens::new();
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespaces_and_comments();

    while let Some(peek) = cursor.peek() {
        let (ln, col) = (cursor.get_ln(), cursor.get_col());
        let set_pos = |t: Token| LinedToken::new(t, ln, col);
        let set_err_pos = |err: InnerLexError| err.at(ln, col);
        let token = match peek {
            ';' | ',' | '.' | '(' | ')' | '[' | ']' | '=' | '#' | '+' | '-' | '*' | '/' | '!' => {
                cursor.take();
                Ok(match peek {
                    ';' => Token::Semicolon,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '(' => Token::OpenParanth,
                    ')' => Token::CloseParanth,
                    '[' => Token::OpenBracket,
                    ']' => Token::CloseBracket,
                    '=' => Token::IsEqual,
                    '#' => Token::IsNotEqual,
                    '+' => Token::Plus,
                    '-' => Token::Hyphen,
                    '*' => Token::Asterisk,
                    '/' => Token::FSlash,
                    _ => Token::LogicalNot,
                })
            }
            ':' | '<' | '>' | '&' | '|' => lex_mcharoperator(&mut cursor),
            '_' | 'a'..='z' | 'A'..='Z' => Ok(lex_identifier(&mut cursor)),
            '0'..='9' => lex_constant(&mut cursor),
            '\'' => lex_char(&mut cursor),
            '"' => lex_string(&mut cursor),
            _ => Err(InnerLexError::UnexpectedChar(peek)),
        }
        .map(set_pos)
        .map_err(set_err_pos)?;
        tokens.push(token);
        cursor.skip_whitespaces_and_comments();
    }

    Ok(tokens)
}
