use std::{
    fmt::{Debug, Formatter},
    str::Chars,
};

#[derive(Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    chars: Chars<'a>,
    line: Line,
}

impl<'a> Debug for Cursor<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Printing source and chars is usually to verbose, so by default
        // we only print the line and the byte offset
        if f.alternate() {
            f.debug_struct("Cursor")
                .field("line", &self.line)
                .field("offset", &self.offset())
                .field("source", &self.source)
                .finish()
        } else {
            f.debug_struct("Cursor")
                .field("line", &self.line)
                .field("offset", &self.offset())
                .finish()
        }
    }
}

impl<'a> PartialEq for Cursor<'a> {
    fn eq(&self, other: &Self) -> bool {
        (self.source, self.chars.as_str()) == (other.source, other.chars.as_str())
    }
}

/// 1-based source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub struct Line(pub usize);

impl Default for Line {
    fn default() -> Self {
        Line(1)
    }
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, chars: source.chars(), line: Line::default() }
    }

    pub fn line(&self) -> Line {
        self.line
    }

    /// Byte offset into the source.
    pub fn offset(&self) -> usize {
        self.source.len() - self.chars.as_str().len()
    }

    pub fn is_at_end(&self) -> bool {
        self.chars.as_str().is_empty()
    }
}

impl<'a> From<&'a str> for Cursor<'a> {
    fn from(source: &'a str) -> Self {
        Self::new(source)
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line.0 += 1;
        }
        c
    }
}

impl<'a> Cursor<'a> {
    pub fn slice_until<'c>(&self, end: &'c Cursor<'a>) -> &'a str {
        assert!(self.source == end.source);
        &self.source[self.offset()..end.offset()]
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    pub fn peek_next(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    /// Advances only if the next character is `expected`.
    pub fn next_if_eq(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Advances while `predicate` holds for the next character.
    pub fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.next();
        }
    }
}
