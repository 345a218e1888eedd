use std::fmt::{self, Display, Formatter};

use scanner::Token;

/// Expression tree. Every node owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Binary { left: Box<Expr<'a>>, operator: Token<'a>, right: Box<Expr<'a>> },
    Grouping(Box<Expr<'a>>),
    Unary { operator: Token<'a>, right: Box<Expr<'a>> },
    Literal(LiteralValue<'a>),
}

impl<'a> Expr<'a> {
    pub fn binary(left: Expr<'a>, operator: Token<'a>, right: Expr<'a>) -> Self {
        Expr::Binary { left: Box::new(left), operator, right: Box::new(right) }
    }

    pub fn unary(operator: Token<'a>, right: Expr<'a>) -> Self {
        Expr::Unary { operator, right: Box::new(right) }
    }

    pub fn grouping(expression: Expr<'a>) -> Self {
        Expr::Grouping(Box::new(expression))
    }
}

/// Prints the tree in prefix form, e.g. `(* (- 123) (group 45.67))`.
impl Display for Expr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { left, operator, right } => {
                write!(f, "({} {} {})", operator.lexeme, left, right)
            }
            Expr::Grouping(expression) => {
                write!(f, "(group {})", expression)
            }
            Expr::Unary { operator, right } => {
                write!(f, "({} {})", operator.lexeme, right)
            }
            Expr::Literal(value) => {
                write!(f, "{}", value)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue<'a> {
    Number(f64),
    Str(&'a str),
    Boolean(bool),
    Nil,
}

impl<'a> Display for LiteralValue<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::Str(s) => write!(f, "{}", s),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Nil => write!(f, "nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use cursor::Line;
    use pretty_assertions::assert_eq;
    use scanner::TokenType;

    use super::*;

    #[test]
    fn print_tree() {
        let expr = Expr::binary(
            Expr::unary(
                Token::new(TokenType::Minus, "-", None, Line(1)),
                Expr::Literal(LiteralValue::Number(123.0)),
            ),
            Token::new(TokenType::Star, "*", None, Line(1)),
            Expr::grouping(Expr::Literal(LiteralValue::Number(45.67))),
        );
        assert_eq!(expr.to_string(), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn print_literals() {
        assert_eq!(LiteralValue::Str("a b").to_string(), "a b");
        assert_eq!(LiteralValue::Boolean(false).to_string(), "false");
        assert_eq!(LiteralValue::Nil.to_string(), "nil");
        assert_eq!(LiteralValue::Number(1.5).to_string(), "1.5");
    }
}
