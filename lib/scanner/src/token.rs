use std::fmt::Display;

use cursor::Line;

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenType,
    /// Exact slice of the source this token was scanned from.
    pub lexeme: &'a str,
    pub literal: Option<Literal<'a>>,
    pub line: Line,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenType, lexeme: &'a str, literal: Option<Literal<'a>>, line: Line) -> Self {
        Self { kind, lexeme, literal, line }
    }

    pub fn eof(line: Line) -> Self {
        Self::new(TokenType::Eof, "", None, line)
    }

    pub fn lexeme(&self) -> &'a str {
        self.lexeme
    }

    pub fn line(&self) -> Line {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenType::Eof
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.lexeme)?;
        if let Some(literal) = &self.literal {
            write!(f, " {}", literal)?;
        }
        Ok(())
    }
}

/// Decoded value of a NUMBER or STRING token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Number(f64),
    /// String contents without the surrounding quotes, no escapes processed.
    Str(&'a str),
}

impl Display for Literal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    String,
    Number,

    // Keywords.
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

impl TokenType {
    pub fn keyword(identifier: &str) -> Option<TokenType> {
        use TokenType::*;
        Some(match identifier {
            "and" => And,
            "class" => Class,
            "else" => Else,
            "false" => False,
            "for" => For,
            "fun" => Fun,
            "if" => If,
            "nil" => Nil,
            "or" => Or,
            "print" => Print,
            "return" => Return,
            "super" => Super,
            "this" => This,
            "true" => True,
            "var" => Var,
            "while" => While,
            _ => return None,
        })
    }

    /// Kinds that begin a declaration or statement, used as recovery points.
    pub fn starts_statement(self) -> bool {
        use TokenType::*;
        matches!(self, Class | Fun | Var | For | If | While | Print | Return)
    }
}
