use std::str::Chars;

#[derive(Clone)]
pub struct Cursor<'a> {
    chars: Chars<'a>,
    ln: u64,
    col: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        let chars = s.chars();
        Self { chars, ln: 1, col: 1 }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    pub fn peek_2nd(&self) -> Option<char> {
        // cheap to clone
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    pub fn take(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.ln += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => (),
        }
        c
    }

    pub fn bump_if(&mut self, expected: char) -> bool {
        let condition = self.peek() == Some(expected);
        if condition {
            self.take();
        }
        condition
    }

    pub fn skip_if(&mut self, p: impl FnOnce(char) -> bool) -> bool {
        let condition = self.peek().is_some_and(p);
        if condition {
            self.take();
        }
        condition
    }

    pub fn skip_whitespaces_and_comments(&mut self) {
        loop {
            while self.peek().filter(|c| c.is_whitespace()).is_some() {
                self.take();
            }
            // line comment
            if self.peek() == Some('/') && self.peek_2nd() == Some('/') {
                while self.peek().filter(|c| *c != '\n').is_some() {
                    self.take();
                }
                continue;
            }
            break;
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.chars.as_str()
    }

    pub fn get_ln(&self) -> u64 {
        self.ln
    }

    pub fn get_col(&self) -> u64 {
        self.col
    }
}
