use std::{fmt::Display, ops::Deref};

use cursor::Line;
use itertools::Itertools;

/// A single reported error, formatted the way the driver prints it.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("[line {line}] Error{at}: {message}")]
pub struct LoxError {
    pub line: Line,
    /// Either empty, `" at end"` or `" at '<lexeme>'"`.
    pub at: String,
    pub message: String,
}

impl LoxError {
    pub fn new(line: Line, at: impl Into<String>, message: impl ToString) -> Self {
        Self { line, at: at.into(), message: message.to_string() }
    }
}

#[derive(thiserror::Error, Clone, Debug, Default, PartialEq)]
pub struct LoxErrors(pub Vec<LoxError>);

impl From<LoxError> for LoxErrors {
    fn from(e: LoxError) -> Self {
        Self(vec![e])
    }
}

impl Deref for LoxErrors {
    type Target = Vec<LoxError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for LoxErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join("\n"))
    }
}

/// Receiver for errors found while scanning or parsing.
pub trait ErrorSink {
    fn report(&mut self, error: LoxError);
}

/// Caller-owned accumulator for reported errors.
///
/// `had_error` stays set until [`ErrorReporter::reset`] is called, so one
/// reporter can span a whole file, while an interactive session resets it
/// between inputs.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: LoxErrors,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &LoxErrors {
        &self.errors
    }

    pub fn reset(&mut self) {
        self.errors.0.clear();
    }

    /// Hands `value` back if nothing was reported, and all errors otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, LoxErrors> {
        if self.had_error() {
            Err(self.errors)
        } else {
            Ok(value)
        }
    }
}

impl ErrorSink for ErrorReporter {
    fn report(&mut self, error: LoxError) {
        log::debug!("Reported: {}", error);
        self.errors.0.push(error);
    }
}
