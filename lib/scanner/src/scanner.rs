use cursor::{Cursor, Line};
use errors::{ErrorSink, LoxError};

pub mod token;
pub use token::{Literal, Token, TokenType};
use TokenType::*;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ScanErrorType {
    #[error("Unexpected character.")]
    UnexpectedCharacter(char),
    #[error("Unterminated string.")]
    UnterminatedString,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("{error}")]
pub struct ScanError {
    pub error: ScanErrorType,
    pub line: Line,
}

impl ScanError {
    fn new(error: ScanErrorType, line: Line) -> Self {
        Self { error, line }
    }
}

impl From<ScanError> for LoxError {
    fn from(e: ScanError) -> Self {
        LoxError::new(e.line, "", e.error)
    }
}

/// Turns source text into tokens in a single left-to-right pass.
///
/// The lexeme under construction is the window between `start` and
/// `current`.
pub struct Scanner<'a> {
    start: Cursor<'a>,
    current: Cursor<'a>,
    tokens: Vec<Token<'a>>,
}

/// Scans all of `source`, reporting lexical errors to `errors`.
pub fn scan<'a>(source: &'a str, errors: &mut impl ErrorSink) -> Vec<Token<'a>> {
    Scanner::new(source).scan_tokens(errors)
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { start: Cursor::new(source), current: Cursor::new(source), tokens: Vec::new() }
    }

    /// Never fails: characters that cannot start a token are reported and
    /// skipped. The result always ends with a single EOF token.
    pub fn scan_tokens(mut self, errors: &mut impl ErrorSink) -> Vec<Token<'a>> {
        loop {
            self.start = self.current.clone();
            let Some(c) = self.current.next() else { break };

            if let Err(error) = self.scan_token(c) {
                log::trace!("Scan error: {:?}", error);
                errors.report(error.into());
            }
        }

        self.tokens.push(Token::eof(self.current.line()));
        self.tokens
    }

    fn scan_token(&mut self, c: char) -> Result<(), ScanError> {
        match c {
            '(' => self.add_token(LeftParen),
            ')' => self.add_token(RightParen),
            '{' => self.add_token(LeftBrace),
            '}' => self.add_token(RightBrace),
            ',' => self.add_token(Comma),
            '.' => self.add_token(Dot),
            '-' => self.add_token(Minus),
            '+' => self.add_token(Plus),
            ';' => self.add_token(Semicolon),
            '*' => self.add_token(Star),

            '!' => self.add_token_if_followed_by('=', BangEqual, Bang),
            '=' => self.add_token_if_followed_by('=', EqualEqual, Equal),
            '<' => self.add_token_if_followed_by('=', LessEqual, Less),
            '>' => self.add_token_if_followed_by('=', GreaterEqual, Greater),

            '/' => {
                if self.current.next_if_eq('/') {
                    // Comment, runs until the end of the line
                    self.current.advance_while(|c| c != '\n');
                } else {
                    self.add_token(Slash)
                }
            }

            '"' => self.string()?,

            d if d.is_ascii_digit() => self.number(),

            c if is_alpha(c) => self.identifier(),

            // Newlines are counted by the cursor.
            ' ' | '\r' | '\t' | '\n' => (),

            c => {
                return Err(ScanError::new(
                    ScanErrorType::UnexpectedCharacter(c),
                    self.current.line(),
                ))
            }
        }
        Ok(())
    }

    fn lexeme(&self) -> &'a str {
        self.start.slice_until(&self.current)
    }

    fn add_token(&mut self, kind: TokenType) {
        self.add_literal_token(kind, None)
    }

    fn add_literal_token(&mut self, kind: TokenType, literal: Option<Literal<'a>>) {
        let token = Token::new(kind, self.lexeme(), literal, self.start.line());
        log::trace!("Scanned {:?}", token);
        self.tokens.push(token);
    }

    fn add_token_if_followed_by(&mut self, expected: char, matched: TokenType, single: TokenType) {
        let kind = if self.current.next_if_eq(expected) { matched } else { single };
        self.add_token(kind)
    }

    fn string(&mut self) -> Result<(), ScanError> {
        self.current.advance_while(|c| c != '"');

        if !self.current.next_if_eq('"') {
            return Err(ScanError::new(ScanErrorType::UnterminatedString, self.current.line()));
        }

        let lexeme = self.lexeme();
        self.add_literal_token(String, Some(Literal::Str(&lexeme[1..lexeme.len() - 1])));
        Ok(())
    }

    fn number(&mut self) {
        self.current.advance_while(|c| c.is_ascii_digit());

        // The '.' belongs to the number only if a digit follows it
        if self.current.peek() == Some('.')
            && self.current.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.current.next();
            self.current.advance_while(|c| c.is_ascii_digit());
        }

        let value = self
            .lexeme()
            .parse()
            .unwrap_or_else(|_| unreachable!("digits with an optional fraction always parse"));
        self.add_literal_token(Number, Some(Literal::Number(value)));
    }

    fn identifier(&mut self) {
        self.current.advance_while(|c| is_alpha(c) || c.is_ascii_digit());
        self.add_token(TokenType::keyword(self.lexeme()).unwrap_or(Identifier));
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
