mod expr;

use errors::{ErrorSink, LoxError};
pub use expr::{Expr, LiteralValue};
use scanner::{Literal, Token, TokenType};

use TokenType::*;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ParseErrorType {
    #[error("Expect expression.")]
    ExpectedExpression,
    #[error("Expect ')' after expression.")]
    ExpectedRightParen,
    #[error("Expression nested too deeply.")]
    TooDeeplyNested,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct ParseError<'a> {
    pub error: ParseErrorType,
    pub token: Token<'a>,
}

impl<'a> ParseError<'a> {
    fn new(error: ParseErrorType, token: Token<'a>) -> Self {
        Self { error, token }
    }
}

impl From<ParseError<'_>> for LoxError {
    fn from(e: ParseError<'_>) -> Self {
        let at = if e.token.is_eof() {
            " at end".to_string()
        } else {
            format!(" at '{}'", e.token.lexeme)
        };
        LoxError::new(e.token.line, at, e.error)
    }
}

pub type Result<'a, T> = std::result::Result<T, ParseError<'a>>;

/// Limit on nested groupings and unary operators, so that deeply nested
/// input is a syntax error instead of a stack overflow.
pub const MAX_NESTING: usize = 128;

/// Parses `tokens` into a single expression, reporting syntax errors to
/// `errors`. Returns `None` if any syntax error was found.
pub fn parse<'a>(tokens: &[Token<'a>], errors: &mut impl ErrorSink) -> Option<Expr<'a>> {
    Parser::new(tokens).parse(errors)
}

/// Scans and parses `source`. Lexical errors are reported but do not stop
/// parsing, so callers should check their sink before using the tree.
pub fn parse_source<'a>(source: &'a str, errors: &mut impl ErrorSink) -> Option<Expr<'a>> {
    let tokens = scanner::scan(source, errors);
    parse(&tokens, errors)
}

/// Recursive descent parser over a scanned token sequence.
///
/// Each precedence level is one method, from `equality` (loosest) down to
/// `primary`.
#[derive(Debug)]
pub struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    current: usize,
    depth: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    /// # Panics
    ///
    /// If `tokens` does not end with an EOF token. Sequences returned by
    /// [`scanner::scan`] always do.
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        assert!(tokens.last().is_some_and(Token::is_eof), "token sequence must end with EOF");
        Self { tokens, current: 0, depth: 0 }
    }

    pub fn parse(&mut self, errors: &mut impl ErrorSink) -> Option<Expr<'a>> {
        match self.expression() {
            Ok(expr) => Some(expr),
            Err(e) => {
                self.recover(e, errors);
                None
            }
        }
    }

    /// Reports `error` and keeps parsing `;`-separated expressions after it,
    /// only to surface further independent errors.
    fn recover(&mut self, error: ParseError<'a>, errors: &mut impl ErrorSink) {
        let mut next: Result<'a, Expr<'a>> = Err(error);
        loop {
            match next {
                Ok(_) => {
                    if self.consume_any(&[Semicolon]).is_none() {
                        return;
                    }
                }
                Err(e) => {
                    log::trace!("Hit error: {:?}, syncing...", e);
                    errors.report(e.into());
                    self.synchronize();
                    // There is no statement grammar to resume with at a keyword
                    if self.previous().map(|t| t.kind) != Some(Semicolon) {
                        return;
                    }
                }
            }

            if self.is_at_end() {
                return;
            }
            log::debug!("Resuming at {:?}", self.peek());
            next = self.expression();
        }
    }

    fn expression(&mut self) -> Result<'a, Expr<'a>> {
        self.equality()
    }

    fn equality(&mut self) -> Result<'a, Expr<'a>> {
        let mut expr = self.comparison()?;

        while let Some(operator) = self.consume_any(&[BangEqual, EqualEqual]) {
            let right = self.comparison()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<'a, Expr<'a>> {
        let mut expr = self.term()?;

        while let Some(operator) = self.consume_any(&[Greater, GreaterEqual, Less, LessEqual]) {
            let right = self.term()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<'a, Expr<'a>> {
        let mut expr = self.factor()?;

        while let Some(operator) = self.consume_any(&[Minus, Plus]) {
            let right = self.factor()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<'a, Expr<'a>> {
        let mut expr = self.unary()?;

        while let Some(operator) = self.consume_any(&[Slash, Star]) {
            let right = self.unary()?;
            expr = Expr::binary(expr, operator, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<'a, Expr<'a>> {
        if let Some(operator) = self.consume_any(&[Bang, Minus]) {
            let right = self.nested(Self::unary)?;
            return Ok(Expr::unary(operator, right));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<'a, Expr<'a>> {
        let value = match self.peek().kind {
            False => LiteralValue::Boolean(false),
            True => LiteralValue::Boolean(true),
            Nil => LiteralValue::Nil,
            Number | String => match self.peek().literal {
                Some(Literal::Number(n)) => LiteralValue::Number(n),
                Some(Literal::Str(s)) => LiteralValue::Str(s),
                None => {
                    return Err(ParseError::new(
                        ParseErrorType::ExpectedExpression,
                        self.peek().clone(),
                    ))
                }
            },
            LeftParen => {
                self.advance();
                let expr = self.nested(Self::expression)?;
                self.consume_or_error(RightParen, ParseErrorType::ExpectedRightParen)?;
                return Ok(Expr::grouping(expr));
            }
            _ => {
                return Err(ParseError::new(ParseErrorType::ExpectedExpression, self.peek().clone()))
            }
        };

        self.advance();
        Ok(Expr::Literal(value))
    }

    fn nested(
        &mut self,
        production: fn(&mut Self) -> Result<'a, Expr<'a>>,
    ) -> Result<'a, Expr<'a>> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(ParseErrorType::TooDeeplyNested, self.peek().clone()));
        }

        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().map(|t| t.kind) == Some(Semicolon) || self.peek().kind.starts_statement()
            {
                return;
            }
            self.advance();
        }
    }
}

// Helpers
impl<'t, 'a> Parser<'t, 'a> {
    fn peek(&self) -> &'t Token<'a> {
        &self.tokens[self.current]
    }

    fn previous(&self) -> Option<&'t Token<'a>> {
        self.current.checked_sub(1).map(|i| &self.tokens[i])
    }

    fn check(&self, kind: TokenType) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    /// Never moves past the EOF token.
    fn advance(&mut self) -> Token<'a> {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn consume_any(&mut self, kinds: &[TokenType]) -> Option<Token<'a>> {
        kinds.iter().any(|&kind| self.check(kind)).then(|| self.advance())
    }

    fn consume_or_error(&mut self, kind: TokenType, error: ParseErrorType) -> Result<'a, Token<'a>> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(error, self.peek().clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use cursor::Line;
    use errors::{ErrorReporter, LoxErrors};
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_ok(source: &str) -> Expr {
        let mut errors = ErrorReporter::new();
        let expr = parse_source(source, &mut errors);
        assert!(!errors.had_error(), "unexpected errors: {}", errors.errors());
        expr.unwrap()
    }

    fn parse_err(source: &str) -> (Option<Expr>, LoxErrors) {
        let mut errors = ErrorReporter::new();
        let expr = parse_source(source, &mut errors);
        (expr, errors.errors().clone())
    }

    fn number(n: f64) -> Expr<'static> {
        Expr::Literal(LiteralValue::Number(n))
    }

    fn op(kind: TokenType, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None, Line(1))
    }

    #[test]
    fn precedence() {
        assert_eq!(
            parse_ok("1 + 2 * 3"),
            Expr::binary(number(1.0), op(Plus, "+"), Expr::binary(number(2.0), op(Star, "*"), number(3.0)))
        );
    }

    #[test]
    fn left_associative() {
        assert_eq!(
            parse_ok("1 - 2 - 3"),
            Expr::binary(Expr::binary(number(1.0), op(Minus, "-"), number(2.0)), op(Minus, "-"), number(3.0))
        );
        assert_eq!(parse_ok("8 / 4 / 2").to_string(), "(/ (/ 8 4) 2)");
        assert_eq!(parse_ok("1 == 2 != 3").to_string(), "(!= (== 1 2) 3)");
    }

    #[test]
    fn unary_is_right_associative() {
        assert_eq!(
            parse_ok("!-1"),
            Expr::unary(op(Bang, "!"), Expr::unary(op(Minus, "-"), number(1.0)))
        );
        assert_eq!(parse_ok("--1 - -2").to_string(), "(- (- (- 1)) (- 2))");
    }

    #[test]
    fn precedence_layers() {
        assert_eq!(
            parse_ok("1 < 2 == 3 >= 4 + 5 * -6").to_string(),
            "(== (< 1 2) (>= 3 (+ 4 (* 5 (- 6)))))"
        );
        assert_eq!(parse_ok("(1 + 2) * 3").to_string(), "(* (group (+ 1 2)) 3)");
        assert_eq!(parse_ok("((nil))").to_string(), "(group (group nil))");
    }

    #[test]
    fn literals() {
        assert_eq!(parse_ok("true"), Expr::Literal(LiteralValue::Boolean(true)));
        assert_eq!(parse_ok("false"), Expr::Literal(LiteralValue::Boolean(false)));
        assert_eq!(parse_ok("nil"), Expr::Literal(LiteralValue::Nil));
        assert_eq!(parse_ok("1.50"), number(1.5));
        assert_eq!(parse_ok("\"a b\""), Expr::Literal(LiteralValue::Str("a b")));
    }

    #[test]
    fn operator_tokens_keep_their_line() {
        let Expr::Binary { operator, .. } = parse_ok("1\n+\n2") else { panic!("expected binary") };
        assert_eq!(operator, Token::new(Plus, "+", None, Line(2)));
    }

    #[test]
    fn trailing_tokens_are_ignored() {
        assert_eq!(parse_ok("1 2").to_string(), "1");
    }

    #[test]
    fn missing_right_paren() {
        let (expr, errors) = parse_err("(1 + 2");
        assert_eq!(expr, None);
        assert_eq!(
            errors.to_string(),
            "[line 1] Error at end: Expect ')' after expression."
        );
    }

    #[test]
    fn unexpected_token_in_group() {
        let (expr, errors) = parse_err("(1 + 2 3)");
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 1] Error at '3': Expect ')' after expression.");
    }

    #[test]
    fn empty_input() {
        let (expr, errors) = parse_err("");
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn error_at_token() {
        let (expr, errors) = parse_err("1 +\n)");
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 2] Error at ')': Expect expression.");

        let (_, errors) = parse_err("print");
        assert_eq!(errors.to_string(), "[line 1] Error at 'print': Expect expression.");
    }

    #[test]
    fn synchronize_after_semicolon() {
        let (expr, errors) = parse_err("1 + ;\n2 * ;\n3");
        assert_eq!(expr, None);
        assert_eq!(
            errors.iter().map(|e| e.to_string()).collect_vec(),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at ';': Expect expression.",
            ]
        );

        let (_, errors) = parse_err("(;\n1 ; (");
        assert_eq!(
            errors.iter().map(|e| e.to_string()).collect_vec(),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at end: Expect expression.",
            ]
        );
    }

    #[test]
    fn keyword_boundary_ends_recovery() {
        let (expr, errors) = parse_err("1 + ) var x ; (");
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 1] Error at ')': Expect expression.");
    }

    #[test]
    fn lexical_errors_do_not_stop_parsing() {
        let mut errors = ErrorReporter::new();
        let expr = parse_source("1 @ + 2", &mut errors);
        assert_eq!(expr.map(|e| e.to_string()), Some("(+ 1 2)".to_string()));
        assert_eq!(errors.errors().to_string(), "[line 1] Error: Unexpected character.");
    }

    #[test]
    fn number_token_without_literal() {
        let tokens = [Token::new(Number, "1", None, Line(1)), Token::eof(Line(1))];
        let mut errors = ErrorReporter::new();
        assert_eq!(parse(&tokens, &mut errors), None);
        assert_eq!(errors.errors().to_string(), "[line 1] Error at '1': Expect expression.");
    }

    #[test]
    fn nesting_up_to_the_limit() {
        let source = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        let expr = parse_ok(&source);
        assert!(expr.to_string().starts_with("(group (group "));

        let source = format!("{}1", "-".repeat(MAX_NESTING));
        parse_ok(&source);
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let source = format!("{}1{}", "(".repeat(20000), ")".repeat(20000));
        let (expr, errors) = parse_err(&source);
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 1] Error at '(': Expression nested too deeply.");

        let source = format!("{}1", "!".repeat(20000));
        let (expr, errors) = parse_err(&source);
        assert_eq!(expr, None);
        assert_eq!(errors.to_string(), "[line 1] Error at '!': Expression nested too deeply.");
    }

    #[test]
    fn nesting_depth_resets_between_expressions() {
        let nested = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        let (_, errors) = parse_err(&format!("1 + ;\n{nested} ; {nested} ; *"));
        assert_eq!(
            errors.iter().map(|e| e.to_string()).collect_vec(),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at '*': Expect expression.",
            ]
        );
    }

    #[test]
    #[should_panic(expected = "token sequence must end with EOF")]
    fn tokens_without_eof() {
        Parser::new(&[]);
    }
}
